//! Beat detection
//!
//! Heartbeats are taken as local maxima of the conditioned pulse waveform.
//! Peaks closer than the refractory spacing (0.4 s) to a taller peak are
//! discarded, which caps detectable heart rate at about 150 BPM.

use tracing::trace;

use crate::{check_sample_rate, PhysioError};

/// Minimum beat-to-beat spacing in seconds
pub const MIN_SPACING_SECONDS: f64 = 0.4;

/// Peak-based beat detector for one sampling rate
#[derive(Debug, Clone)]
pub struct BeatDetector {
    sample_rate: f64,
    /// Minimum spacing between kept peaks (samples)
    min_spacing: usize,
}

impl BeatDetector {
    pub fn new(sample_rate: f64) -> Result<Self, PhysioError> {
        Self::with_min_spacing(sample_rate, MIN_SPACING_SECONDS)
    }

    /// Detector with a custom refractory spacing (seconds)
    pub fn with_min_spacing(sample_rate: f64, spacing_seconds: f64) -> Result<Self, PhysioError> {
        let sample_rate = check_sample_rate(sample_rate)?;
        if !spacing_seconds.is_finite() || spacing_seconds < 0.0 {
            return Err(PhysioError::InvalidSpacing(spacing_seconds));
        }
        let min_spacing = ((spacing_seconds * sample_rate) as usize).max(1);
        Ok(Self {
            sample_rate,
            min_spacing,
        })
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn min_spacing(&self) -> usize {
        self.min_spacing
    }

    /// Beat offsets within `waveform`, ascending.
    ///
    /// Returns `None` for windows shorter than one second or when fewer
    /// than two beats survive the spacing constraint.
    pub fn detect(&self, waveform: &[f64]) -> Option<Vec<usize>> {
        if (waveform.len() as f64) < self.sample_rate {
            trace!("Beat detection deferred: {} samples < 1 s", waveform.len());
            return None;
        }

        let candidates = local_maxima(waveform);
        let peaks = self.enforce_spacing(waveform, candidates);

        if peaks.len() < 2 {
            trace!("Beat detection deferred: {} peak(s)", peaks.len());
            return None;
        }
        Some(peaks)
    }

    /// Intervals in seconds between ascending beat offsets
    pub fn rr_intervals(&self, beats: &[usize]) -> Vec<f64> {
        beats
            .windows(2)
            .map(|w| w[1].saturating_sub(w[0]) as f64 / self.sample_rate)
            .collect()
    }

    /// Drop peaks within `min_spacing` of a taller kept peak
    fn enforce_spacing(&self, waveform: &[f64], peaks: Vec<usize>) -> Vec<usize> {
        let count = peaks.len();
        let mut order: Vec<usize> = (0..count).collect();
        order.sort_by(|&i, &j| waveform[peaks[i]].total_cmp(&waveform[peaks[j]]));

        let mut keep = vec![true; count];
        for &j in order.iter().rev() {
            if !keep[j] {
                continue;
            }

            let mut k = j;
            while k > 0 && peaks[j] - peaks[k - 1] < self.min_spacing {
                k -= 1;
                keep[k] = false;
            }

            k = j + 1;
            while k < count && peaks[k] - peaks[j] < self.min_spacing {
                keep[k] = false;
                k += 1;
            }
        }

        peaks
            .into_iter()
            .zip(keep)
            .filter_map(|(p, kept)| kept.then_some(p))
            .collect()
    }
}

/// Detect beats in `waveform` sampled at `sample_rate` Hz.
///
/// `Ok(None)` means too little signal; an unusable rate is an error.
pub fn detect_beats(waveform: &[f64], sample_rate: f64) -> Result<Option<Vec<usize>>, PhysioError> {
    Ok(BeatDetector::new(sample_rate)?.detect(waveform))
}

/// Beat-to-beat intervals in seconds
pub fn rr_intervals(beats: &[usize], sample_rate: f64) -> Result<Vec<f64>, PhysioError> {
    Ok(BeatDetector::new(sample_rate)?.rr_intervals(beats))
}

/// Strict local maxima; a flat top resolves to its middle sample
fn local_maxima(x: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if x.len() < 3 {
        return peaks;
    }

    let i_max = x.len() - 1;
    let mut i = 1;
    while i < i_max {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead < i_max && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    peaks
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_periodic_pulse() {
        // 72 BPM at 30 fps
        let signal: Vec<f64> = (0..200)
            .map(|i| (2.0 * PI * 1.2 * i as f64 / 30.0).sin())
            .collect();

        let beats = detect_beats(&signal, 30.0).unwrap().unwrap();
        assert!(beats.len() >= 7);
        for w in beats.windows(2) {
            assert!(w[1] > w[0]);
            assert!(w[1] - w[0] >= 12);
        }

        let rr = rr_intervals(&beats, 30.0).unwrap();
        assert_eq!(rr.len(), beats.len() - 1);
        for v in rr {
            assert!((v - 1.0 / 1.2).abs() < 0.05);
        }
    }

    #[test]
    fn test_short_window_deferred() {
        let signal: Vec<f64> = (0..29).map(|i| (i as f64).sin()).collect();
        assert!(detect_beats(&signal, 30.0).unwrap().is_none());
    }

    #[test]
    fn test_single_peak_deferred() {
        let signal: Vec<f64> = (0..60)
            .map(|i| -((i as f64 - 30.0) / 10.0).powi(2))
            .collect();
        assert!(detect_beats(&signal, 30.0).unwrap().is_none());
        assert!(detect_beats(&[1.0; 90], 30.0).unwrap().is_none());
    }

    #[test]
    fn test_refractory_keeps_taller_peak() {
        let mut signal = vec![0.0; 40];
        signal[10] = 1.0;
        signal[14] = 2.0; // within 12 samples of index 10, taller
        signal[30] = 1.5;

        let detector = BeatDetector::new(30.0).unwrap();
        assert_eq!(detector.min_spacing(), 12);
        assert_eq!(detector.detect(&signal), Some(vec![14, 30]));
    }

    #[test]
    fn test_plateau_resolves_to_midpoint() {
        let mut signal = vec![0.0; 40];
        signal[5] = 1.0;
        signal[6] = 1.0;
        signal[7] = 1.0;
        signal[25] = 1.0;
        assert_eq!(detect_beats(&signal, 30.0), Ok(Some(vec![6, 25])));
    }

    #[test]
    fn test_invalid_sample_rate_rejected() {
        let signal: Vec<f64> = (0..200)
            .map(|i| (2.0 * PI * 1.2 * i as f64 / 30.0).sin())
            .collect();

        for rate in [-30.0, 0.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                detect_beats(&signal, rate),
                Err(PhysioError::InvalidSampleRate(_))
            ));
            assert!(matches!(
                rr_intervals(&[0, 25, 50], rate),
                Err(PhysioError::InvalidSampleRate(_))
            ));
        }
        assert!(matches!(
            BeatDetector::with_min_spacing(30.0, -0.4),
            Err(PhysioError::InvalidSpacing(_))
        ));
    }

    #[test]
    fn test_rr_intervals_positive() {
        let rr = rr_intervals(&[0, 25, 50], 30.0).unwrap();
        assert_eq!(rr.len(), 2);
        assert!(rr.iter().all(|&v| v > 0.0 && v.is_finite()));
    }
}
