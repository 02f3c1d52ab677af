//! Golden reference FIR output
//!
//! The reference is computed in double precision from the Q1.31 input and
//! re-quantized to Q1.31, so stage outputs can be compared sample by sample.

use fircheck_common::fixed_point::{from_q31, to_q31};
use fircheck_common::{Error, Result, Waveform};
use serde::{Deserialize, Serialize};

/// Tap count of the filter implemented by every stage
pub const DEFAULT_TAP_COUNT: usize = 1024;

/// FIR filter definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    coefficients: Vec<f64>,
}

impl FilterSpec {
    pub fn new(coefficients: Vec<f64>) -> Self {
        Self { coefficients }
    }

    /// Uniform moving average: every coefficient is `1 / tap_count`
    pub fn moving_average(tap_count: usize) -> Self {
        let coef = if tap_count == 0 {
            0.0
        } else {
            1.0 / tap_count as f64
        };
        Self::new(vec![coef; tap_count])
    }

    pub fn tap_count(&self) -> usize {
        self.coefficients.len()
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    fn validate(&self, input_len: usize) -> Result<()> {
        if self.coefficients.is_empty() {
            return Err(Error::InvalidParameter(
                "filter has no coefficients".to_string(),
            ));
        }
        if let Some(idx) = self.coefficients.iter().position(|c| !c.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "coefficient {} is not finite",
                idx
            )));
        }
        if self.tap_count() > input_len {
            return Err(Error::InvalidParameter(format!(
                "tap count ({}) exceeds input length ({})",
                self.tap_count(),
                input_len
            )));
        }
        Ok(())
    }
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self::moving_average(DEFAULT_TAP_COUNT)
    }
}

/// Computes the expected stage output
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceFilter;

impl ReferenceFilter {
    /// Causal direct-form FIR: `y[n] = sum_k c[k] * x[n - k]`, with zero history
    /// before the first sample. Output has the same length and sample rate as
    /// the input.
    pub fn compute(input: &Waveform, spec: &FilterSpec) -> Result<Waveform> {
        spec.validate(input.len())?;

        let x: Vec<f64> = input.samples().iter().copied().map(from_q31).collect();
        let coefficients = spec.coefficients();

        let output = (0..x.len())
            .map(|n| {
                let taps = coefficients.len().min(n + 1);
                let acc = coefficients[..taps]
                    .iter()
                    .enumerate()
                    .fold(0.0_f64, |acc, (k, &c)| acc + c * x[n - k]);
                to_q31(acc)
            })
            .collect();

        Ok(Waveform::new(input.sample_rate(), output))
    }
}
