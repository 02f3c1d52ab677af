//! Test signal generation
//!
//! Produces the input waveform shared by every stage: independent uniform
//! noise in [-0.5, 0.5) quantized to Q1.31.

use fircheck_common::fixed_point::to_q31;
use fircheck_common::{Error, Result, Waveform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use tracing::info;

/// Largest waveform a WAV data chunk can hold (32-bit length field, 4 bytes per sample)
pub const MAX_SAMPLE_COUNT: u64 = u32::MAX as u64 / 4;

/// Uniform noise generator for stage input waveforms
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalGenerator;

impl SignalGenerator {
    /// Generate `round(duration_secs * sample_rate)` samples of uniform noise
    ///
    /// With a seed the output is reproducible; without one the generator is
    /// seeded from OS entropy.
    pub fn generate(duration_secs: f64, sample_rate: u32, seed: Option<u64>) -> Result<Waveform> {
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "duration must be positive, got {}",
                duration_secs
            )));
        }
        if sample_rate == 0 {
            return Err(Error::InvalidParameter(
                "sample rate must be positive".to_string(),
            ));
        }

        let exact_count = (duration_secs * sample_rate as f64).round();
        if exact_count > MAX_SAMPLE_COUNT as f64 {
            return Err(Error::InvalidParameter(format!(
                "{}s at {} Hz exceeds the WAV limit of {} samples",
                duration_secs, sample_rate, MAX_SAMPLE_COUNT
            )));
        }
        let sample_count = exact_count as usize;
        if sample_count == 0 {
            return Err(Error::InvalidParameter(format!(
                "{}s at {} Hz yields no samples",
                duration_secs, sample_rate
            )));
        }

        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let samples = (0..sample_count)
            .map(|_| to_q31(rng.gen::<f64>() - 0.5))
            .collect();

        Ok(Waveform::new(sample_rate, samples))
    }

    /// Generate a waveform and persist it as a WAV artifact
    pub fn generate_to<P: AsRef<Path>>(
        path: P,
        duration_secs: f64,
        sample_rate: u32,
        seed: Option<u64>,
    ) -> Result<Waveform> {
        let waveform = Self::generate(duration_secs, sample_rate, seed)?;
        waveform.write_wav(&path)?;

        info!(
            path = %path.as_ref().display(),
            samples = waveform.len(),
            seeded = seed.is_some(),
            "Generated input waveform"
        );
        Ok(waveform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HALF_SCALE: i32 = 1 << 30;

    #[test]
    fn test_sample_count_and_range() {
        for (duration, rate) in [(1.0, 16_000), (0.25, 16_000), (2.0, 8_000), (0.001, 48_000)] {
            let waveform = SignalGenerator::generate(duration, rate, Some(3)).unwrap();
            assert_eq!(waveform.len(), (duration * rate as f64).round() as usize);
            assert_eq!(waveform.sample_rate(), rate);
            // [-0.5, 0.5) in Q1.31, rounding may reach exactly +0.5
            assert!(waveform
                .samples()
                .iter()
                .all(|&s| (-HALF_SCALE..=HALF_SCALE).contains(&s)));
        }
    }

    #[test]
    fn test_oversized_duration_rejected() {
        for duration in [1e300, f64::MAX, (MAX_SAMPLE_COUNT as f64 + 1.0) / 16_000.0 + 1.0] {
            assert!(matches!(
                SignalGenerator::generate(duration, 16_000, Some(1)),
                Err(Error::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn test_seed_is_reproducible() {
        let a = SignalGenerator::generate(0.5, 16_000, Some(42)).unwrap();
        let b = SignalGenerator::generate(0.5, 16_000, Some(42)).unwrap();
        let c = SignalGenerator::generate(0.5, 16_000, Some(43)).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_noise_is_not_constant() {
        let waveform = SignalGenerator::generate(0.1, 16_000, Some(1)).unwrap();
        let first = waveform.samples()[0];
        assert!(waveform.samples().iter().any(|&s| s != first));
        assert!(waveform.samples().iter().any(|&s| s < 0));
        assert!(waveform.samples().iter().any(|&s| s > 0));
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        assert!(matches!(
            SignalGenerator::generate(0.0, 16_000, None),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            SignalGenerator::generate(-1.0, 16_000, None),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            SignalGenerator::generate(f64::NAN, 16_000, None),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            SignalGenerator::generate(1.0, 0, None),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            SignalGenerator::generate(1e-9, 16_000, None),
            Err(Error::InvalidParameter(_))
        ));
    }
}
