//! Validation summary and formatting
//!
//! Turns a `PipelineRun` into a serializable summary (written to
//! `summary.json`) and into console text.

use crate::compare::{ComparisonReport, ResultComparator};
use crate::metrics::{MetricsAggregator, StageMetrics};
use crate::orchestrator::PipelineRun;
use crate::stage::MetricsRecord;
use crate::state::StageState;
use fircheck_common::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

/// Summary format version
pub const SUMMARY_VERSION: &str = "1.0";

/// Complete result of one validation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationSummary {
    /// Session metadata
    pub session: SessionInfo,

    /// Filter length used for the reference
    pub tap_count: usize,

    /// Allowed per-sample deviation from the reference
    pub tolerance_lsb: u64,

    /// Per-stage results in run order
    pub stages: Vec<StageSummary>,

    /// Timings of successful stages only
    pub metrics: StageMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Run timestamp (RFC 3339)
    pub timestamp: String,

    /// Total run duration in milliseconds
    pub duration_ms: u64,

    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSummary {
    pub stage: String,
    pub status: StageState,

    /// `Error::kind()` of the failure, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Absent when the stage failed or its output could not be compared
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<ComparisonReport>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsRecord>,

    /// Succeeded and every compared sample within tolerance
    pub passed: bool,
}

impl ValidationSummary {
    /// Compare each successful stage against the reference and collect timings
    pub fn summarize(run: &PipelineRun, tap_count: usize, tolerance_lsb: u64) -> Self {
        let stages = run
            .outcomes
            .iter()
            .map(|outcome| match &outcome.result {
                Ok(result) => {
                    let comparison = match ResultComparator::compare(&result.output, &run.reference) {
                        Ok(report) => Some(report),
                        Err(e) => {
                            warn!(stage = %outcome.stage.name, error = %e, "Comparison unavailable");
                            None
                        }
                    };
                    let passed = comparison
                        .as_ref()
                        .map(|c| c.within_tolerance(tolerance_lsb))
                        .unwrap_or(false);
                    StageSummary {
                        stage: outcome.stage.name.clone(),
                        status: outcome.state,
                        error_kind: None,
                        error: None,
                        comparison,
                        metrics: Some(result.metrics),
                        passed,
                    }
                }
                Err(e) => StageSummary {
                    stage: outcome.stage.name.clone(),
                    status: outcome.state,
                    error_kind: Some(e.kind().to_string()),
                    error: Some(e.to_string()),
                    comparison: None,
                    metrics: None,
                    passed: false,
                },
            })
            .collect();

        Self {
            session: SessionInfo {
                timestamp: chrono::Utc::now().to_rfc3339(),
                duration_ms: run.elapsed.as_millis() as u64,
                version: SUMMARY_VERSION.to_string(),
            },
            tap_count,
            tolerance_lsb,
            stages,
            metrics: MetricsAggregator::aggregate(run.results()),
        }
    }

    pub fn all_passed(&self) -> bool {
        !self.stages.is_empty() && self.stages.iter().all(|s| s.passed)
    }

    pub fn failed_stages(&self) -> impl Iterator<Item = &StageSummary> {
        self.stages
            .iter()
            .filter(|s| s.status != StageState::Succeeded)
    }

    pub fn export_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::from)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        info!(path = %path.display(), "Wrote validation summary");
        Ok(())
    }

    pub fn import_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let summary = serde_json::from_reader(file).map_err(std::io::Error::from)?;
        Ok(summary)
    }
}

/// Console formatting for validation results
pub struct CliFormatter;

impl CliFormatter {
    /// One line per stage
    ///
    /// Example: `[✓] stage2: succeeded (max error 0 LSB)`
    pub fn format_stage_line(stage: &StageSummary) -> String {
        let symbol = match (stage.status, stage.passed) {
            (StageState::Succeeded, true) => "✓",
            (StageState::Succeeded, false) => "⚠",
            _ => "✗",
        };

        let detail = match (&stage.comparison, &stage.error) {
            (Some(c), _) if c.has_length_mismatch() => format!(
                "max error {} LSB, length {} vs reference {}",
                c.max_abs_error, c.actual_len, c.reference_len
            ),
            (Some(c), _) => format!("max error {} LSB", c.max_abs_error),
            (None, Some(e)) => e.clone(),
            (None, None) => "no comparison".to_string(),
        };

        format!("[{}] {}: {} ({})", symbol, stage.stage, stage.status, detail)
    }

    /// Standalone comparison of an existing stage output
    pub fn format_comparison(stage: &str, report: &ComparisonReport, tolerance_lsb: u64) -> String {
        let verdict = if report.within_tolerance(tolerance_lsb) {
            "OK"
        } else {
            "MISMATCH"
        };
        let mut line = format!(
            "{}: {} ({} samples, max error {} LSB, mean {:.3} LSB)",
            stage, verdict, report.compared_len, report.max_abs_error, report.mean_abs_error
        );
        if let Some(index) = report.worst_sample() {
            line.push_str(&format!(", worst at sample {}", index));
        }
        if report.has_length_mismatch() {
            line.push_str(&format!(
                ", length {} vs reference {}",
                report.actual_len, report.reference_len
            ));
        }
        line
    }

    /// Stage table with comparison and timing columns
    pub fn format_summary(summary: &ValidationSummary) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "\nValidation Summary ({} taps, tolerance {} LSB):\n",
            summary.tap_count, summary.tolerance_lsb
        ));
        output.push_str("┌────────────────┬───────────┬──────────────┬────────────────┬──────┐\n");
        output.push_str("│ Stage          │ Status    │ Max error    │ Filter time us │ Pass │\n");
        output.push_str("├────────────────┼───────────┼──────────────┼────────────────┼──────┤\n");

        for stage in &summary.stages {
            let max_error = stage
                .comparison
                .as_ref()
                .map(|c| format!("{:>12}", c.max_abs_error))
                .unwrap_or_else(|| format!("{:>12}", "-"));
            let filter_time = stage
                .metrics
                .as_ref()
                .map(|m| format!("{:>14.2}", m.filter_time_ns / 1000.0))
                .unwrap_or_else(|| format!("{:>14}", "-"));

            output.push_str(&format!(
                "│ {:<14} │ {:<9} │ {} │ {} │ {:<4} │\n",
                stage.stage,
                stage.status.to_string(),
                max_error,
                filter_time,
                if stage.passed { "yes" } else { "no" }
            ));
        }

        output.push_str("└────────────────┴───────────┴──────────────┴────────────────┴──────┘\n");

        let passed = summary.stages.iter().filter(|s| s.passed).count();
        output.push_str(&format!("{}/{} stages passed\n", passed, summary.stages.len()));

        output
    }

    /// Timing table for stages with metrics, with speedup relative to the first
    pub fn format_performance(metrics: &StageMetrics, tap_count: usize) -> String {
        let mut output = String::new();

        output.push_str(&format!("\nFilter Times ({} taps):\n", tap_count));
        if metrics.is_empty() {
            output.push_str("No timing data available\n");
            return output;
        }

        output.push_str("┌────────────────┬────────────────┬────────────────┬─────────┐\n");
        output.push_str("│ Stage          │ Filter time us │ Per tap ns     │ Speedup │\n");
        output.push_str("├────────────────┼────────────────┼────────────────┼─────────┤\n");

        let baseline = metrics.iter().next().map(|(name, _)| name.to_string());
        for (name, record) in metrics.iter() {
            let speedup = baseline
                .as_deref()
                .and_then(|base| metrics.speedup(base, name))
                .map(|s| format!("{:>6.2}x", s))
                .unwrap_or_else(|| format!("{:>7}", "-"));

            output.push_str(&format!(
                "│ {:<14} │ {:>14.2} │ {:>14.3} │ {} │\n",
                name,
                record.filter_time_ns / 1000.0,
                record.tap_time_ns,
                speedup
            ));
        }

        output.push_str("└────────────────┴────────────────┴────────────────┴─────────┘\n");

        if let Some((name, _)) = metrics.fastest() {
            output.push_str(&format!("Fastest: {}\n", name));
        }

        output
    }
}
