//! Accuracy evaluation against a reference pulse signal

use physio::BeatDetector;
use pulse_dsp::mean;
use serde::{Deserialize, Serialize};

use crate::PipelineError;

/// Beat spacing used for evaluation peaks (seconds)
const EVAL_MIN_SPACING_SECONDS: f64 = 0.5;

/// Heart-rate agreement between a reference and an estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HrComparison {
    /// Beat-by-beat values compared
    pub beats: usize,
    /// Mean absolute error (BPM)
    pub mae_bpm: f64,
    /// Pearson correlation, absent when either series is constant
    pub correlation: Option<f64>,
}

/// Beat-to-beat heart rate (BPM) of a conditioned waveform
pub fn instantaneous_heart_rate(
    waveform: &[f64],
    sample_rate: f64,
) -> Result<Vec<f64>, PipelineError> {
    let detector = BeatDetector::with_min_spacing(sample_rate, EVAL_MIN_SPACING_SECONDS)?;
    Ok(match detector.detect(waveform) {
        Some(beats) => detector
            .rr_intervals(&beats)
            .into_iter()
            .map(|rr| 60.0 / rr)
            .collect(),
        None => Vec::new(),
    })
}

/// Mean absolute error over the common prefix of `a` and `b`
pub fn mean_absolute_error(a: &[f64], b: &[f64]) -> Option<f64> {
    let errors: Vec<f64> = a.iter().zip(b).map(|(x, y)| (x - y).abs()).collect();
    mean(&errors)
}

/// Pearson correlation over the common prefix of `a` and `b`
pub fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    let n = a.len().min(b.len());
    if n < 2 {
        return None;
    }
    let (a, b) = (&a[..n], &b[..n]);
    let mean_a = mean(a)?;
    let mean_b = mean(b)?;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    if var_a == 0.0 || var_b == 0.0 {
        return None;
    }
    Some(cov / (var_a * var_b).sqrt())
}

/// Compare beat-by-beat heart rate of two conditioned waveforms.
///
/// `Ok(None)` when either waveform yields no beats.
pub fn compare_heart_rate(
    reference: &[f64],
    reference_rate: f64,
    estimate: &[f64],
    estimate_rate: f64,
) -> Result<Option<HrComparison>, PipelineError> {
    let hr_ref = instantaneous_heart_rate(reference, reference_rate)?;
    let hr_est = instantaneous_heart_rate(estimate, estimate_rate)?;
    let beats = hr_ref.len().min(hr_est.len());

    Ok(mean_absolute_error(&hr_ref, &hr_est).map(|mae_bpm| HrComparison {
        beats,
        mae_bpm,
        correlation: pearson(&hr_ref, &hr_est),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine(freq: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f64 / fs).sin())
            .collect()
    }

    #[test]
    fn test_instantaneous_hr() {
        // Peaks fall exactly on samples at 32 Hz
        let hr = instantaneous_heart_rate(&sine(1.0, 32.0, 320), 32.0).unwrap();
        assert!(hr.len() >= 8);
        for v in hr {
            assert!((v - 60.0).abs() < 1e-9);
        }
        assert!(instantaneous_heart_rate(&[0.0; 10], 30.0).unwrap().is_empty());
        assert!(matches!(
            instantaneous_heart_rate(&sine(1.0, 32.0, 320), -32.0),
            Err(PipelineError::Physio(_))
        ));
    }

    #[test]
    fn test_mae() {
        assert_eq!(mean_absolute_error(&[60.0, 70.0], &[62.0, 66.0, 99.0]), Some(3.0));
        assert_eq!(mean_absolute_error(&[], &[1.0]), None);
    }

    #[test]
    fn test_pearson() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let r = pearson(&a, &[2.0, 4.0, 6.0, 8.0]).unwrap();
        assert!((r - 1.0).abs() < 1e-12);
        let r = pearson(&a, &[8.0, 6.0, 4.0, 2.0]).unwrap();
        assert!((r + 1.0).abs() < 1e-12);
        assert!(pearson(&a, &[5.0; 4]).is_none());
        assert!(pearson(&[1.0], &[1.0]).is_none());
    }

    #[test]
    fn test_compare_across_rates() {
        // 64 Hz reference and 32 fps estimate of the same 1 Hz pulse
        let report = compare_heart_rate(
            &sine(1.0, 64.0, 640),
            64.0,
            &sine(1.0, 32.0, 320),
            32.0,
        )
        .unwrap()
        .unwrap();
        assert!(report.beats >= 8);
        assert!(report.mae_bpm < 1.0);
    }
}
