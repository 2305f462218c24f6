//! Physiological Metrics
//!
//! Turns a conditioned pulse waveform into beat positions, beat-to-beat
//! (RR) intervals and heart-rate variability statistics:
//! - Beat detection with a refractory spacing
//! - Heart rate, RMSSD and SDNN (time domain)
//! - LF/HF power ratio (frequency domain, Welch)

pub mod beats;
pub mod hrv;

pub use beats::{detect_beats, rr_intervals, BeatDetector, MIN_SPACING_SECONDS};
pub use hrv::{
    heart_rate, lf_hf_ratio, rmssd, sdnn, HrvBands, HrvEstimator, HrvMetrics,
    DEFAULT_RESAMPLE_HZ,
};

use pulse_dsp::DspError;
use thiserror::Error;

/// Physiological metric configuration errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysioError {
    #[error("Sample rate must be positive and finite, got {0}")]
    InvalidSampleRate(f64),

    #[error("Beat spacing must be non-negative and finite, got {0} s")]
    InvalidSpacing(f64),

    #[error("Spectrum error: {0}")]
    Dsp(#[from] DspError),
}

pub(crate) fn check_sample_rate(sample_rate: f64) -> Result<f64, PhysioError> {
    pulse_dsp::check_sample_rate(sample_rate)
        .map_err(|_| PhysioError::InvalidSampleRate(sample_rate))
}
