//! Heart-rate variability metrics
//!
//! All functions take RR intervals in seconds. RMSSD and SDNN are returned in
//! seconds by the free functions and converted to milliseconds in
//! [`HrvMetrics`].

use pulse_dsp::{interp, linspace, mean, std_dev, SpectrumAnalyzer};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{check_sample_rate, PhysioError};

/// Sampling rate of the uniformly resampled RR series (Hz)
pub const DEFAULT_RESAMPLE_HZ: f64 = 4.0;

/// Resampled points per RR interval
const RESAMPLE_FACTOR: usize = 4;

/// Minimum intervals for a frequency-domain estimate
const MIN_SPECTRAL_INTERVALS: usize = 4;

/// Frequency bands for the LF/HF ratio (Hz, half-open `[lo, hi)`)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HrvBands {
    pub lf: (f64, f64),
    pub hf: (f64, f64),
}

impl Default for HrvBands {
    fn default() -> Self {
        Self {
            lf: (0.04, 0.15),
            hf: (0.15, 0.4),
        }
    }
}

/// HRV metrics for one update cycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HrvMetrics {
    /// Mean heart rate (BPM)
    pub heart_rate_bpm: f64,
    /// Root mean square of successive differences (ms)
    pub rmssd_ms: f64,
    /// Standard deviation of intervals (ms)
    pub sdnn_ms: f64,
    /// LF/HF power ratio, absent with too few intervals or no HF power
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lf_hf_ratio: Option<f64>,
}

/// `60 / mean(rr)` in beats per minute
pub fn heart_rate(rr: &[f64]) -> Option<f64> {
    let mean_rr = mean(rr)?;
    if mean_rr <= 0.0 || !mean_rr.is_finite() {
        return None;
    }
    Some(60.0 / mean_rr)
}

/// Root mean square of successive differences; needs at least 2 intervals
pub fn rmssd(rr: &[f64]) -> Option<f64> {
    if rr.len() < 2 {
        return None;
    }
    let sum_sq: f64 = rr.windows(2).map(|w| (w[1] - w[0]) * (w[1] - w[0])).sum();
    Some((sum_sq / (rr.len() - 1) as f64).sqrt())
}

/// Population standard deviation of the intervals
pub fn sdnn(rr: &[f64]) -> Option<f64> {
    std_dev(rr)
}

/// LF/HF power ratio of the RR series resampled at `resample_hz`
pub fn lf_hf_ratio(rr: &[f64], resample_hz: f64) -> Result<Option<f64>, PhysioError> {
    Ok(HrvEstimator::new(resample_hz)?.lf_hf_ratio(rr))
}

/// Reusable HRV estimator (keeps its FFT plans between calls)
pub struct HrvEstimator {
    analyzer: SpectrumAnalyzer,
    bands: HrvBands,
}

impl HrvEstimator {
    pub fn new(resample_hz: f64) -> Result<Self, PhysioError> {
        Self::with_bands(resample_hz, HrvBands::default())
    }

    pub fn with_bands(resample_hz: f64, bands: HrvBands) -> Result<Self, PhysioError> {
        let resample_hz = check_sample_rate(resample_hz)?;
        Ok(Self {
            analyzer: SpectrumAnalyzer::new(resample_hz)?,
            bands,
        })
    }

    /// LF/HF power ratio.
    ///
    /// The series is linearly interpolated over the beat index onto
    /// `4 × len` evenly spaced points, and its Welch PSD is summed over the
    /// LF and HF bands.
    pub fn lf_hf_ratio(&mut self, rr: &[f64]) -> Option<f64> {
        let n = rr.len();
        if n < MIN_SPECTRAL_INTERVALS {
            trace!("LF/HF deferred: {} intervals", n);
            return None;
        }

        let knots: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let grid = linspace(0.0, (n - 1) as f64, n * RESAMPLE_FACTOR);
        let resampled = interp(&grid, &knots, rr);

        let psd = self.analyzer.welch(&resampled);
        let lf = psd.band_power(self.bands.lf.0, self.bands.lf.1);
        let hf = psd.band_power(self.bands.hf.0, self.bands.hf.1);

        if hf == 0.0 {
            trace!("LF/HF absent: no HF power");
            return None;
        }
        let ratio = lf / hf;
        ratio.is_finite().then_some(ratio)
    }

    /// Full metric set; needs at least 2 intervals
    pub fn compute(&mut self, rr: &[f64]) -> Option<HrvMetrics> {
        if rr.len() < 2 {
            return None;
        }
        Some(HrvMetrics {
            heart_rate_bpm: heart_rate(rr)?,
            rmssd_ms: rmssd(rr)? * 1000.0,
            sdnn_ms: sdnn(rr)? * 1000.0,
            lf_hf_ratio: self.lf_hf_ratio(rr),
        })
    }
}
