//! Stress fusion policies

use physio::HrvMetrics;
use pulse_dsp::mean;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::{Anchor, StressConfig};
use crate::StressError;

/// How the score is assembled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressPolicy {
    /// Fixed anchors on HR, RMSSD and LF/HF
    #[default]
    Direct,
    /// HR relative to the subject's own recent baseline, damped by strong vagal tone
    TrendRelative,
}

/// Clamp `(x - anchor.low) / (anchor.high - anchor.low)` into [0, 1].
///
/// NaN maps to 0.
pub fn normalize(x: f64, anchor: Anchor) -> f64 {
    let n = (x - anchor.low) / (anchor.high - anchor.low);
    if n.is_nan() {
        return 0.0;
    }
    n.clamp(0.0, 1.0)
}

/// Terms behind one stress score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StressBreakdown {
    pub policy: StressPolicy,
    /// Normalised HR (or HR delta) term
    pub hr_term: f64,
    /// `1 - RMSSD_n`
    pub parasympathetic_term: f64,
    /// Normalised LF/HF (direct policy)
    pub lf_hf_term: Option<f64>,
    /// Normalised HR slope (trend policy)
    pub slope_term: Option<f64>,
    /// Weighted score on the 0-100 scale before clamping
    pub pre_clamp: f64,
    /// Whether the vagal-tone damping fired
    pub suppressed: bool,
    /// Final score in [0, 100]
    pub score: f64,
}

/// Stress fuser
#[derive(Debug, Clone, Default)]
pub struct StressFuser {
    config: StressConfig,
}

impl StressFuser {
    pub fn new(config: StressConfig) -> Result<Self, StressError> {
        config.validate()?;
        debug!("Stress fuser: {:?} policy", config.policy);
        Ok(Self { config })
    }

    pub fn policy(&self) -> StressPolicy {
        self.config.policy
    }

    pub fn config(&self) -> &StressConfig {
        &self.config
    }

    /// Fuse one cycle's metrics; `hr_history` is oldest first.
    ///
    /// The direct policy defers (`None`) while LF/HF is absent.
    pub fn fuse(&self, metrics: &HrvMetrics, hr_history: &[f64]) -> Option<StressBreakdown> {
        match self.config.policy {
            StressPolicy::Direct => self.fuse_direct(metrics),
            StressPolicy::TrendRelative => Some(self.fuse_trend(metrics, hr_history)),
        }
    }

    /// Final score only
    pub fn score(&self, metrics: &HrvMetrics, hr_history: &[f64]) -> Option<f64> {
        self.fuse(metrics, hr_history).map(|b| b.score)
    }

    fn fuse_direct(&self, metrics: &HrvMetrics) -> Option<StressBreakdown> {
        let Some(lf_hf) = metrics.lf_hf_ratio else {
            trace!("Direct stress deferred: no LF/HF");
            return None;
        };
        let anchors = &self.config.direct;

        let hr_term = normalize(metrics.heart_rate_bpm, anchors.heart_rate);
        let lf_hf_term = normalize(lf_hf, anchors.lf_hf);
        let parasympathetic_term = 1.0 - normalize(metrics.rmssd_ms, anchors.rmssd);

        let pre_clamp = 100.0 * (0.35 * hr_term + 0.35 * lf_hf_term + 0.30 * parasympathetic_term);

        Some(StressBreakdown {
            policy: StressPolicy::Direct,
            hr_term,
            parasympathetic_term,
            lf_hf_term: Some(lf_hf_term),
            slope_term: None,
            pre_clamp,
            suppressed: false,
            score: clamp_score(pre_clamp),
        })
    }

    fn fuse_trend(&self, metrics: &HrvMetrics, hr_history: &[f64]) -> StressBreakdown {
        let trend = &self.config.trend;

        let hr_term = match hr_history.split_last() {
            Some((latest, prior)) if hr_history.len() >= trend.min_history => {
                let baseline = mean(prior).unwrap_or(*latest);
                normalize(latest - baseline, trend.hr_delta)
            }
            _ => trend.neutral_hr_term,
        };

        let slope_term = if hr_history.len() >= trend.slope_window {
            let tail = &hr_history[hr_history.len() - trend.slope_window..];
            let diffs: Vec<f64> = tail.windows(2).map(|w| w[1] - w[0]).collect();
            normalize(mean(&diffs).unwrap_or(0.0), trend.slope)
        } else {
            0.0
        };

        let rmssd_n = normalize(metrics.rmssd_ms, trend.rmssd);
        let parasympathetic_term = 1.0 - rmssd_n;

        let mut pre_clamp =
            100.0 * (0.25 * hr_term + 0.35 * parasympathetic_term + 0.15 * slope_term);
        let suppressed = rmssd_n > trend.suppression_threshold;
        if suppressed {
            pre_clamp *= trend.suppression_factor;
        }

        StressBreakdown {
            policy: StressPolicy::TrendRelative,
            hr_term,
            parasympathetic_term,
            lf_hf_term: None,
            slope_term: Some(slope_term),
            pre_clamp,
            suppressed,
            score: clamp_score(pre_clamp),
        }
    }
}

fn clamp_score(raw: f64) -> f64 {
    if raw.is_finite() {
        raw.clamp(0.0, 100.0)
    } else {
        0.0
    }
}
