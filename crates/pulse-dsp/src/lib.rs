//! Pulse Signal Processing
//!
//! Provides the numerical building blocks of the pulse pipeline:
//! - Zero-phase Butterworth bandpass conditioning
//! - Welch power spectral density estimation
//! - Window statistics and linear interpolation

mod filter;
mod interp;
mod spectrum;
mod statistics;

pub use filter::{condition_waveform, BandConfig, BandpassFilter};
pub use interp::{interp, linspace};
pub use spectrum::{PowerSpectrum, SpectrumAnalyzer, DEFAULT_SEGMENT_LEN};
pub use statistics::{mean, std_dev, SignalStats};

use thiserror::Error;

/// DSP configuration errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DspError {
    #[error("Sample rate must be positive and finite, got {0}")]
    InvalidSampleRate(f64),

    #[error("Invalid band [{low_hz}, {high_hz}] Hz for Nyquist frequency {nyquist_hz} Hz")]
    InvalidBand {
        low_hz: f64,
        high_hz: f64,
        nyquist_hz: f64,
    },

    #[error("Filter order must be in 1..={max}, got {order}")]
    InvalidOrder { order: usize, max: usize },

    #[error("Filter design is numerically singular")]
    SingularDesign,
}

/// Reject sampling rates that are non-finite or not positive
pub fn check_sample_rate(sample_rate: f64) -> Result<f64, DspError> {
    if sample_rate.is_finite() && sample_rate > 0.0 {
        Ok(sample_rate)
    } else {
        Err(DspError::InvalidSampleRate(sample_rate))
    }
}
