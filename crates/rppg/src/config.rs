//! Pulse extractor configuration

use serde::{Deserialize, Serialize};

use crate::extractor::{PulseAlgorithm, MAX_WINDOW_LEN};
use crate::sample::DEFAULT_MIN_PIXELS;
use crate::RppgError;

/// Pulse extractor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Extraction algorithm
    pub algorithm: PulseAlgorithm,

    /// Camera frame rate (Hz)
    pub sample_rate_hz: f64,

    /// Sliding window length (seconds)
    pub window_seconds: f64,

    /// Minimum skin pixels per frame
    pub min_roi_pixels: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            algorithm: PulseAlgorithm::Chrom,
            sample_rate_hz: 30.0,
            window_seconds: 1.6,
            min_roi_pixels: DEFAULT_MIN_PIXELS,
        }
    }
}

impl ExtractorConfig {
    /// Green-channel extraction with default window
    pub fn green() -> Self {
        Self {
            algorithm: PulseAlgorithm::Green,
            ..Default::default()
        }
    }

    /// Longer (3 s) window for steadier, slower-reacting output
    pub fn long_window() -> Self {
        Self {
            window_seconds: 3.0,
            ..Default::default()
        }
    }

    /// Window length in samples
    pub fn window_len(&self) -> usize {
        (self.window_seconds * self.sample_rate_hz).round() as usize
    }

    pub fn validate(&self) -> Result<(), RppgError> {
        if !self.sample_rate_hz.is_finite() || self.sample_rate_hz <= 0.0 {
            return Err(RppgError::Config(format!(
                "sample rate must be positive, got {}",
                self.sample_rate_hz
            )));
        }
        let window_len = self.window_len();
        if !self.window_seconds.is_finite() || !(2..=MAX_WINDOW_LEN).contains(&window_len) {
            return Err(RppgError::Config(format!(
                "window of {} s at {} Hz must hold 2..={} samples",
                self.window_seconds, self.sample_rate_hz, MAX_WINDOW_LEN
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_window() {
        let config = ExtractorConfig::default();
        assert_eq!(config.window_len(), 48);
        assert!(config.validate().is_ok());
        assert_eq!(ExtractorConfig::long_window().window_len(), 90);
    }

    #[test]
    fn test_invalid_rates() {
        let config = ExtractorConfig {
            sample_rate_hz: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ExtractorConfig {
            window_seconds: 0.01,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_window_upper_bound() {
        let config = ExtractorConfig {
            window_seconds: 1e18,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(RppgError::Config(_))));

        // 2200 s at 30 fps is 66000 samples
        let config = ExtractorConfig {
            window_seconds: 2200.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ExtractorConfig {
            window_seconds: MAX_WINDOW_LEN as f64 / 30.0,
            ..Default::default()
        };
        assert_eq!(config.window_len(), MAX_WINDOW_LEN);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ExtractorConfig =
            serde_json::from_str(r#"{"algorithm":"green","window_seconds":2.0}"#).unwrap();
        assert_eq!(config.algorithm, PulseAlgorithm::Green);
        assert_eq!(config.window_len(), 60);
        assert_eq!(config.min_roi_pixels, DEFAULT_MIN_PIXELS);
    }
}
