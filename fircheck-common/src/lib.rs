//! # fircheck Common Library
//!
//! Shared code for the fircheck validation tools:
//! - Error taxonomy shared by every pipeline component
//! - Q1.31 fixed-point conversions
//! - Waveform type and WAV artifact I/O
//! - TOML bootstrap configuration loading

pub mod config;
pub mod error;
pub mod fixed_point;
pub mod waveform;

pub use config::{ExecutionMode, TomlConfig};
pub use error::{Error, MissingFirmware, Result};
pub use waveform::Waveform;
