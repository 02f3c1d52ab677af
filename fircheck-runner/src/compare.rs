//! Sample-by-sample comparison against the golden reference

use fircheck_common::{Error, Result, Waveform};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Non-fatal findings attached to a comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComparisonWarning {
    /// Waveforms differ in length; only the overlapping prefix was compared
    LengthMismatch { actual: usize, reference: usize },
}

/// Per-sample and aggregate error of one stage output versus the reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub sample_rate: u32,
    pub actual_len: usize,
    pub reference_len: usize,

    /// Number of samples compared (overlapping prefix)
    pub compared_len: usize,

    /// `actual - reference` per compared sample
    #[serde(skip)]
    pub difference: Vec<i64>,

    /// `|actual - reference|` per compared sample
    #[serde(skip)]
    pub absolute_difference: Vec<u64>,

    pub max_abs_error: u64,
    pub mean_abs_error: f64,
    pub warnings: Vec<ComparisonWarning>,
}

impl ComparisonReport {
    /// True when every compared sample is within `tolerance_lsb` of the reference
    pub fn within_tolerance(&self, tolerance_lsb: u64) -> bool {
        self.max_abs_error <= tolerance_lsb
    }

    pub fn has_length_mismatch(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, ComparisonWarning::LengthMismatch { .. }))
    }

    /// Index of the first sample with the largest absolute error
    pub fn worst_sample(&self) -> Option<usize> {
        if self.max_abs_error == 0 {
            return None;
        }
        self.absolute_difference
            .iter()
            .position(|&d| d == self.max_abs_error)
    }
}

/// Compares captured stage output with the reference output
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultComparator;

impl ResultComparator {
    pub fn compare(actual: &Waveform, reference: &Waveform) -> Result<ComparisonReport> {
        if actual.sample_rate() != reference.sample_rate() {
            return Err(Error::InvalidParameter(format!(
                "sample rate mismatch: actual {} Hz, reference {} Hz",
                actual.sample_rate(),
                reference.sample_rate()
            )));
        }

        let mut warnings = Vec::new();
        if actual.len() != reference.len() {
            warn!(
                actual = actual.len(),
                reference = reference.len(),
                "Waveform length mismatch, comparing overlapping prefix"
            );
            warnings.push(ComparisonWarning::LengthMismatch {
                actual: actual.len(),
                reference: reference.len(),
            });
        }

        let difference: Vec<i64> = actual
            .samples()
            .iter()
            .zip(reference.samples())
            .map(|(&a, &r)| a as i64 - r as i64)
            .collect();
        let absolute_difference: Vec<u64> = difference.iter().map(|d| d.unsigned_abs()).collect();

        let max_abs_error = absolute_difference.iter().copied().max().unwrap_or(0);
        let mean_abs_error = if absolute_difference.is_empty() {
            0.0
        } else {
            absolute_difference.iter().map(|&d| d as f64).sum::<f64>()
                / absolute_difference.len() as f64
        };

        Ok(ComparisonReport {
            sample_rate: actual.sample_rate(),
            actual_len: actual.len(),
            reference_len: reference.len(),
            compared_len: difference.len(),
            difference,
            absolute_difference,
            max_abs_error,
            mean_abs_error,
            warnings,
        })
    }
}
