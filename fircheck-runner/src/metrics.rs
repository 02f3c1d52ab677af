//! Per-stage timing aggregation
//!
//! Failed stages contribute no entry at all. Callers must treat an absent
//! entry differently from a zero-valued timing.

use crate::stage::{ArtifactLayout, MetricsRecord, StageResult};
use fircheck_common::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Ordered stage name -> timing mapping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageMetrics {
    entries: Vec<(String, MetricsRecord)>,
}

impl StageMetrics {
    pub fn get(&self, stage: &str) -> Option<&MetricsRecord> {
        self.entries
            .iter()
            .find(|(name, _)| name == stage)
            .map(|(_, record)| record)
    }

    pub fn contains(&self, stage: &str) -> bool {
        self.get(stage).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricsRecord)> {
        self.entries.iter().map(|(name, record)| (name.as_str(), record))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stage with the lowest filter time
    pub fn fastest(&self) -> Option<(&str, &MetricsRecord)> {
        self.iter()
            .min_by(|a, b| a.1.filter_time_ns.total_cmp(&b.1.filter_time_ns))
    }

    /// Filter-time ratio of `stage` relative to `baseline` (baseline / stage)
    pub fn speedup(&self, baseline: &str, stage: &str) -> Option<f64> {
        let base = self.get(baseline)?.filter_time_ns;
        let this = self.get(stage)?.filter_time_ns;
        if this > 0.0 {
            Some(base / this)
        } else {
            None
        }
    }

    fn insert(&mut self, stage: &str, record: MetricsRecord) {
        match self.entries.iter_mut().find(|(name, _)| name == stage) {
            Some(entry) => entry.1 = record,
            None => self.entries.push((stage.to_string(), record)),
        }
    }
}

/// Collects timing records across stages
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsAggregator;

impl MetricsAggregator {
    /// Build the mapping from stage results, preserving stage order
    pub fn aggregate<'a, I>(results: I) -> StageMetrics
    where
        I: IntoIterator<Item = (&'a str, &'a Result<StageResult>)>,
    {
        let mut metrics = StageMetrics::default();
        for (stage, result) in results {
            match result {
                Ok(stage_result) => metrics.insert(stage, stage_result.metrics),
                Err(e) => debug!(stage = %stage, error = %e, "No metrics for failed stage"),
            }
        }
        metrics
    }

    /// Read metrics artifacts left by earlier runs
    ///
    /// Missing or unreadable files leave the stage absent.
    pub fn collect_from_files<S: AsRef<str>>(layout: &ArtifactLayout, stages: &[S]) -> StageMetrics {
        let mut metrics = StageMetrics::default();
        for stage in stages {
            let stage = stage.as_ref();
            let path = layout.metrics_path(stage);
            if !path.exists() {
                debug!(stage = %stage, path = %path.display(), "No metrics file");
                continue;
            }
            match MetricsRecord::read_json(&path) {
                Ok(record) => metrics.insert(stage, record),
                Err(e) => warn!(stage = %stage, error = %e, "Skipping unreadable metrics"),
            }
        }
        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fircheck_common::{Error, Waveform};
    use tempfile::TempDir;

    fn success(filter: f64, tap: f64) -> Result<StageResult> {
        Ok(StageResult {
            output: Waveform::new(16_000, vec![0; 4]),
            metrics: MetricsRecord::new(filter, tap),
        })
    }

    #[test]
    fn test_failed_stages_are_absent() {
        let results = vec![
            ("stage0".to_string(), success(20480.25, 20.0)),
            (
                "stage1".to_string(),
                Err(Error::ExecutorFailure {
                    stage: "stage1".to_string(),
                    message: "exit 1".to_string(),
                }),
            ),
            ("stage2".to_string(), success(0.0, 0.0)),
        ];

        let metrics = MetricsAggregator::aggregate(results.iter().map(|(n, r)| (n.as_str(), r)));

        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics.get("stage0"), Some(&MetricsRecord::new(20480.25, 20.0)));
        assert_eq!(metrics.get("stage1"), None);
        // Zero timing is present, not absent
        assert_eq!(metrics.get("stage2"), Some(&MetricsRecord::new(0.0, 0.0)));

        let order: Vec<&str> = metrics.iter().map(|(name, _)| name).collect();
        assert_eq!(order, vec!["stage0", "stage2"]);
    }

    #[test]
    fn test_fastest_and_speedup() {
        let results = vec![
            ("stage0".to_string(), success(8000.0, 7.8)),
            ("stage1".to_string(), success(2000.0, 1.95)),
            ("stage2".to_string(), success(4000.0, 3.9)),
        ];
        let metrics = MetricsAggregator::aggregate(results.iter().map(|(n, r)| (n.as_str(), r)));

        assert_eq!(metrics.fastest().map(|(name, _)| name), Some("stage1"));
        assert_eq!(metrics.speedup("stage0", "stage1"), Some(4.0));
        assert_eq!(metrics.speedup("stage0", "stage9"), None);
    }

    #[test]
    fn test_collect_from_files_skips_missing() {
        let dir = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(dir.path().join("bin"), dir.path().to_path_buf());
        MetricsRecord::new(100.5, 0.1)
            .write_json(layout.metrics_path("stage0"))
            .unwrap();
        std::fs::write(layout.metrics_path("stage2"), "not json").unwrap();

        let metrics = MetricsAggregator::collect_from_files(&layout, &["stage0", "stage1", "stage2"]);
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics.get("stage0").unwrap().filter_time_ns, 100.5);
        assert!(!metrics.contains("stage1"));
        assert!(!metrics.contains("stage2"));
    }
}
