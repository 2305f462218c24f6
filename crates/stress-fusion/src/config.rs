//! Stress fusion configuration

use serde::{Deserialize, Serialize};

use crate::policy::StressPolicy;
use crate::StressError;

/// Normalisation range; values outside saturate at 0 or 1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub low: f64,
    pub high: f64,
}

impl Anchor {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    fn validate(&self, name: &'static str) -> Result<(), StressError> {
        if !(self.low.is_finite() && self.high.is_finite() && self.low < self.high) {
            return Err(StressError::InvalidAnchor {
                name,
                low: self.low,
                high: self.high,
            });
        }
        Ok(())
    }
}

/// Anchors for direct LF/HF fusion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectConfig {
    /// Heart rate (BPM)
    pub heart_rate: Anchor,
    /// RMSSD (ms)
    pub rmssd: Anchor,
    /// LF/HF ratio
    pub lf_hf: Anchor,
}

impl Default for DirectConfig {
    fn default() -> Self {
        Self {
            heart_rate: Anchor::new(50.0, 120.0),
            rmssd: Anchor::new(10.0, 80.0),
            lf_hf: Anchor::new(0.5, 4.0),
        }
    }
}

/// Parameters for trend-relative fusion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// History entries needed before the baseline delta is used
    pub min_history: usize,

    /// HR term used before the baseline is established
    pub neutral_hr_term: f64,

    /// Heart rate delta from baseline (BPM)
    pub hr_delta: Anchor,

    /// RMSSD (ms)
    pub rmssd: Anchor,

    /// Entries used for the short-term slope
    pub slope_window: usize,

    /// Mean HR change per sample (BPM)
    pub slope: Anchor,

    /// RMSSD_n above which the score is damped
    pub suppression_threshold: f64,

    /// Multiplier applied when damped
    pub suppression_factor: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            min_history: 10,
            neutral_hr_term: 0.4,
            hr_delta: Anchor::new(-12.0, 18.0),
            rmssd: Anchor::new(15.0, 80.0),
            slope_window: 5,
            slope: Anchor::new(-3.0, 6.0),
            suppression_threshold: 0.65,
            suppression_factor: 0.6,
        }
    }
}

/// Stress fusion configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StressConfig {
    pub policy: StressPolicy,
    pub direct: DirectConfig,
    pub trend: TrendConfig,
}

impl StressConfig {
    /// Trend-relative fusion with default parameters
    pub fn trend_relative() -> Self {
        Self {
            policy: StressPolicy::TrendRelative,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), StressError> {
        self.direct.heart_rate.validate("direct.heart_rate")?;
        self.direct.rmssd.validate("direct.rmssd")?;
        self.direct.lf_hf.validate("direct.lf_hf")?;
        self.trend.hr_delta.validate("trend.hr_delta")?;
        self.trend.rmssd.validate("trend.rmssd")?;
        self.trend.slope.validate("trend.slope")?;

        if self.trend.min_history < 2 {
            return Err(StressError::Config(format!(
                "trend baseline needs at least 2 history entries, got {}",
                self.trend.min_history
            )));
        }
        if self.trend.slope_window < 2 {
            return Err(StressError::Config(format!(
                "slope window must be at least 2, got {}",
                self.trend.slope_window
            )));
        }
        if !(0.0..=1.0).contains(&self.trend.suppression_factor) {
            return Err(StressError::Config(format!(
                "suppression factor must be in [0, 1], got {}",
                self.trend.suppression_factor
            )));
        }
        Ok(())
    }
}
