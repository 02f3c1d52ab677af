//! Waveform type and WAV artifact I/O
//!
//! Waveforms are mono, 32-bit signed PCM in Q1.31. They are handed between the
//! host tools and the firmware harness as WAV files.

use crate::fixed_point::{from_q31, to_q31};
use crate::{Error, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;

/// Default sample rate of the validation pipeline (Hz)
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;

/// Channel count of every pipeline waveform
pub const CHANNEL_COUNT: u16 = 1;

/// Bit depth of every pipeline waveform
pub const BITS_PER_SAMPLE: u16 = 32;

/// Immutable sequence of Q1.31 samples at a fixed sample rate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Waveform {
    sample_rate: u32,
    samples: Vec<i32>,
}

impl Waveform {
    pub fn new(sample_rate: u32, samples: Vec<i32>) -> Self {
        Self {
            sample_rate,
            samples,
        }
    }

    /// Quantize real-valued samples to Q1.31
    pub fn from_real(sample_rate: u32, values: &[f64]) -> Self {
        Self::new(sample_rate, values.iter().copied().map(to_q31).collect())
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        CHANNEL_COUNT
    }

    pub fn samples(&self) -> &[i32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Samples converted to real values in [-1, 1)
    pub fn to_real(&self) -> Vec<f64> {
        self.samples.iter().copied().map(from_q31).collect()
    }

    /// Read a mono 32-bit integer WAV artifact
    ///
    /// Any other channel count, bit depth or sample format is rejected as
    /// `MalformedArtifact`, since the firmware harness only speaks this format.
    pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = WavReader::open(path)?;
        let spec = reader.spec();

        if spec.channels != CHANNEL_COUNT {
            return Err(Error::MalformedArtifact {
                path: path.to_path_buf(),
                message: format!(
                    "wav channel count ({}) must be {}",
                    spec.channels, CHANNEL_COUNT
                ),
            });
        }
        if spec.bits_per_sample != BITS_PER_SAMPLE || spec.sample_format != SampleFormat::Int {
            return Err(Error::MalformedArtifact {
                path: path.to_path_buf(),
                message: format!(
                    "unsupported wav format ({}-bit {:?}), only 32-bit integer supported",
                    spec.bits_per_sample, spec.sample_format
                ),
            });
        }

        let samples = reader
            .into_samples::<i32>()
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self::new(spec.sample_rate, samples))
    }

    /// Write the waveform as a WAV artifact, replacing any existing file
    pub fn write_wav<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut writer = WavWriter::create(path, Self::wav_spec(self.sample_rate))?;
        for &sample in &self.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;

        tracing::debug!(
            path = %path.display(),
            samples = self.samples.len(),
            sample_rate = self.sample_rate,
            "Wrote waveform"
        );
        Ok(())
    }

    fn wav_spec(sample_rate: u32) -> WavSpec {
        WavSpec {
            channels: CHANNEL_COUNT,
            sample_rate,
            bits_per_sample: BITS_PER_SAMPLE,
            sample_format: SampleFormat::Int,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_wav_round_trip_preserves_extremes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("input.wav");

        let waveform = Waveform::new(
            DEFAULT_SAMPLE_RATE,
            vec![i32::MIN, -1, 0, 1, i32::MAX, 123_456_789],
        );
        waveform.write_wav(&path).unwrap();

        let loaded = Waveform::read_wav(&path).unwrap();
        assert_eq!(loaded, waveform);
        assert_eq!(loaded.channels(), 1);
    }

    #[test]
    fn test_read_rejects_stereo() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stereo.wav");

        let spec = WavSpec {
            channels: 2,
            sample_rate: DEFAULT_SAMPLE_RATE,
            bits_per_sample: 32,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for _ in 0..8 {
            writer.write_sample(0i32).unwrap();
        }
        writer.finalize().unwrap();

        match Waveform::read_wav(&path) {
            Err(Error::MalformedArtifact { message, .. }) => {
                assert!(message.contains("channel count"));
            }
            other => panic!("Expected MalformedArtifact, got {:?}", other),
        }
    }

    #[test]
    fn test_read_rejects_16_bit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pcm16.wav");

        let spec = WavSpec {
            channels: 1,
            sample_rate: DEFAULT_SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        writer.write_sample(0i16).unwrap();
        writer.finalize().unwrap();

        assert!(matches!(
            Waveform::read_wav(&path),
            Err(Error::MalformedArtifact { .. })
        ));
    }

    #[test]
    fn test_from_real_and_duration() {
        let waveform = Waveform::from_real(16_000, &[0.0, 0.25, -0.5]);
        assert_eq!(waveform.samples(), &[0, 536_870_912, -1_073_741_824]);
        assert_eq!(waveform.to_real(), vec![0.0, 0.25, -0.5]);

        let one_second = Waveform::new(16_000, vec![0; 16_000]);
        assert_eq!(one_second.duration_secs(), 1.0);
    }
}
