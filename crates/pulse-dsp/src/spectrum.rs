//! Welch Power Spectral Density

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::collections::HashMap;
use std::sync::Arc;

use crate::statistics::mean;
use crate::{check_sample_rate, DspError};

/// Default maximum segment length (samples per Welch segment)
pub const DEFAULT_SEGMENT_LEN: usize = 256;

/// One-sided power spectral density
#[derive(Debug, Clone, Default)]
pub struct PowerSpectrum {
    /// Bin centre frequencies (Hz), ascending from 0
    pub frequencies: Vec<f64>,
    /// Power density per bin (units² / Hz)
    pub density: Vec<f64>,
}

impl PowerSpectrum {
    /// Sum of the density over bins with `low <= f < high`
    pub fn band_power(&self, low_hz: f64, high_hz: f64) -> f64 {
        self.frequencies
            .iter()
            .zip(&self.density)
            .filter(|(&f, _)| f >= low_hz && f < high_hz)
            .map(|(_, &p)| p)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.density.is_empty()
    }
}

/// Welch spectrum estimator
///
/// Splits the signal into half-overlapping Hann-windowed segments of at most
/// `max_segment_len` samples, removes each segment's mean, and averages the
/// one-sided periodograms with density scaling.
pub struct SpectrumAnalyzer {
    /// Forward FFT plans by segment length
    plans: HashMap<usize, Arc<dyn Fft<f64>>>,
    /// Sampling frequency (Hz)
    sample_rate: f64,
    /// Upper bound on samples per segment
    max_segment_len: usize,
}

impl SpectrumAnalyzer {
    /// Create a new analyzer
    pub fn new(sample_rate: f64) -> Result<Self, DspError> {
        Self::with_segment_len(sample_rate, DEFAULT_SEGMENT_LEN)
    }

    pub fn with_segment_len(sample_rate: f64, max_segment_len: usize) -> Result<Self, DspError> {
        Ok(Self {
            plans: HashMap::new(),
            sample_rate: check_sample_rate(sample_rate)?,
            max_segment_len: max_segment_len.max(1),
        })
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Periodic Hann window
    fn hann_window(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / n as f64).cos())
            .collect()
    }

    /// Estimate the PSD of `signal`
    pub fn welch(&mut self, signal: &[f64]) -> PowerSpectrum {
        let n = signal.len();
        if n == 0 {
            return PowerSpectrum::default();
        }

        let nperseg = self.max_segment_len.min(n);
        let noverlap = nperseg / 2;
        let step = nperseg - noverlap;
        let segments = (n - noverlap) / step;

        let window = Self::hann_window(nperseg);
        let window_power: f64 = window.iter().map(|w| w * w).sum();
        let bins = nperseg / 2 + 1;

        let frequencies: Vec<f64> = (0..bins)
            .map(|k| k as f64 * self.sample_rate / nperseg as f64)
            .collect();

        if window_power == 0.0 || segments == 0 {
            return PowerSpectrum {
                frequencies,
                density: vec![0.0; bins],
            };
        }

        let scale = 1.0 / (self.sample_rate * window_power);
        let fft = Arc::clone(
            self.plans
                .entry(nperseg)
                .or_insert_with(|| FftPlanner::new().plan_fft_forward(nperseg)),
        );
        let mut density = vec![0.0; bins];

        for s in 0..segments {
            let segment = &signal[s * step..s * step + nperseg];
            // Flat segments detrend to exact zeros.
            let offset = if segment.iter().all(|&v| v == segment[0]) {
                segment[0]
            } else {
                mean(segment).unwrap_or(0.0)
            };

            let mut buffer: Vec<Complex<f64>> = segment
                .iter()
                .zip(&window)
                .map(|(&v, &w)| Complex::new((v - offset) * w, 0.0))
                .collect();
            fft.process(&mut buffer);

            for (k, acc) in density.iter_mut().enumerate() {
                let mut p = buffer[k].norm_sqr() * scale;
                // Fold negative frequencies; DC and an even-length Nyquist bin are unique.
                let is_nyquist = nperseg % 2 == 0 && k == bins - 1;
                if k != 0 && !is_nyquist {
                    p *= 2.0;
                }
                *acc += p;
            }
        }

        for p in &mut density {
            *p /= segments as f64;
        }

        PowerSpectrum {
            frequencies,
            density,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_welch_sine_peak() {
        let mut analyzer = SpectrumAnalyzer::new(4.0).unwrap();

        // 0.25 Hz sine sampled at 4 Hz
        let signal: Vec<f64> = (0..128)
            .map(|i| (2.0 * PI * 0.25 * i as f64 / 4.0).sin())
            .collect();

        let psd = analyzer.welch(&signal);
        assert_eq!(psd.frequencies.len(), 65);

        let (peak_idx, _) = psd
            .density
            .iter()
            .enumerate()
            .fold((0, f64::MIN), |best, (i, &p)| if p > best.1 { (i, p) } else { best });
        assert!((psd.frequencies[peak_idx] - 0.25).abs() < 0.05);
        assert!(psd.band_power(0.15, 0.4) > 10.0 * psd.band_power(0.04, 0.15));
    }

    #[test]
    fn test_parseval_density_scaling() {
        // Integrated one-sided density approximates the variance of white-ish data.
        let mut analyzer = SpectrumAnalyzer::with_segment_len(10.0, 64).unwrap();
        let signal: Vec<f64> = (0..1024)
            .map(|i| ((i * 7919 % 101) as f64 / 101.0) - 0.5)
            .collect();
        let psd = analyzer.welch(&signal);
        let df = 10.0 / 64.0;
        let integrated: f64 = psd.density.iter().sum::<f64>() * df;
        let variance = crate::statistics::std_dev(&signal).unwrap().powi(2);
        assert!((integrated / variance - 1.0).abs() < 0.25);
    }

    #[test]
    fn test_constant_signal_has_no_power() {
        let mut analyzer = SpectrumAnalyzer::new(4.0).unwrap();
        let psd = analyzer.welch(&[0.8; 32]);
        assert!(psd.density.iter().all(|&p| p == 0.0));
    }

    #[test]
    fn test_invalid_sample_rate_rejected() {
        for rate in [0.0, -4.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                SpectrumAnalyzer::new(rate),
                Err(DspError::InvalidSampleRate(_))
            ));
        }
    }

    #[test]
    fn test_empty_signal() {
        let mut analyzer = SpectrumAnalyzer::new(4.0).unwrap();
        assert!(analyzer.welch(&[]).is_empty());
    }
}
