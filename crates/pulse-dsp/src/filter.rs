//! Zero-phase Butterworth bandpass filter
//!
//! Coefficients come from the analog Butterworth prototype, shifted to the
//! requested band with a lowpass-to-bandpass transform and mapped to the
//! z-plane with a pre-warped bilinear transform. Filtering runs the IIR
//! forward and backward over an odd-extended copy of the input so the
//! output has no phase lag.

use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;

use crate::{check_sample_rate, DspError};

/// Highest supported order (the transfer-function form loses precision above this)
pub const MAX_ORDER: usize = 8;

/// Bandpass configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandConfig {
    /// Sampling frequency (Hz)
    pub sample_rate_hz: f64,
    /// Lower cutoff (Hz)
    pub low_hz: f64,
    /// Upper cutoff (Hz)
    pub high_hz: f64,
    /// Prototype order (the bandpass has twice as many poles)
    pub order: usize,
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 30.0,
            low_hz: 0.7,  // 42 BPM
            high_hz: 3.0, // 180 BPM
            order: 3,
        }
    }
}

impl BandConfig {
    /// Default heart-rate band at the given frame rate
    pub fn heart_rate(sample_rate_hz: f64) -> Self {
        Self {
            sample_rate_hz,
            ..Default::default()
        }
    }

    pub fn nyquist_hz(&self) -> f64 {
        0.5 * self.sample_rate_hz
    }

    /// Check the band against the sampling rate
    pub fn validate(&self) -> Result<(), DspError> {
        check_sample_rate(self.sample_rate_hz)?;
        if self.order == 0 || self.order > MAX_ORDER {
            return Err(DspError::InvalidOrder {
                order: self.order,
                max: MAX_ORDER,
            });
        }
        let nyquist_hz = self.nyquist_hz();
        let band_ok = self.low_hz.is_finite()
            && self.high_hz.is_finite()
            && self.low_hz > 0.0
            && self.low_hz < self.high_hz
            && self.high_hz < nyquist_hz;
        if !band_ok {
            return Err(DspError::InvalidBand {
                low_hz: self.low_hz,
                high_hz: self.high_hz,
                nyquist_hz,
            });
        }
        Ok(())
    }
}

/// Butterworth bandpass applied forward-backward
#[derive(Debug, Clone)]
pub struct BandpassFilter {
    config: BandConfig,
    /// Numerator coefficients
    b: Vec<f64>,
    /// Denominator coefficients (`a[0] == 1`)
    a: Vec<f64>,
    /// Step-response steady state for unit input
    zi: Vec<f64>,
}

impl BandpassFilter {
    /// Design the filter; fails on an invalid band or sample rate
    pub fn new(config: BandConfig) -> Result<Self, DspError> {
        config.validate()?;

        let (b, a) = design_butter_bandpass(&config);
        let zi = steady_state(&b, &a).ok_or(DspError::SingularDesign)?;

        debug!(
            "Designed order-{} Butterworth bandpass {:.2}-{:.2} Hz @ {:.1} Hz",
            config.order, config.low_hz, config.high_hz, config.sample_rate_hz
        );

        Ok(Self { config, b, a, zi })
    }

    pub fn config(&self) -> &BandConfig {
        &self.config
    }

    /// Transfer function coefficients `(b, a)`
    pub fn coefficients(&self) -> (&[f64], &[f64]) {
        (&self.b, &self.a)
    }

    /// Minimum input length that gets filtered (two seconds of samples)
    pub fn min_len(&self) -> usize {
        (2.0 * self.config.sample_rate_hz).ceil() as usize
    }

    /// Zero-phase filter `signal`.
    ///
    /// Inputs shorter than two seconds are returned unchanged. The output
    /// always has the input's length.
    pub fn filter(&self, signal: &[f64]) -> Vec<f64> {
        let n = signal.len();
        if (n as f64) < 2.0 * self.config.sample_rate_hz || n < 2 {
            return signal.to_vec();
        }

        let edge = (3 * self.b.len().max(self.a.len())).min(n - 1);
        let extended = odd_extend(signal, edge);

        let x0 = extended[0];
        let zi: Vec<f64> = self.zi.iter().map(|z| z * x0).collect();
        let mut forward = lfilter(&self.b, &self.a, &extended, zi);

        forward.reverse();
        let y0 = forward[0];
        let zi: Vec<f64> = self.zi.iter().map(|z| z * y0).collect();
        let mut backward = lfilter(&self.b, &self.a, &forward, zi);
        backward.reverse();

        backward[edge..edge + n].to_vec()
    }

    /// Magnitude response at `freq_hz`
    pub fn magnitude_at(&self, freq_hz: f64) -> f64 {
        let w = 2.0 * PI * freq_hz / self.config.sample_rate_hz;
        let z_inv = Complex64::from_polar(1.0, -w);
        let eval = |coeffs: &[f64]| {
            coeffs
                .iter()
                .rev()
                .fold(Complex64::new(0.0, 0.0), |acc, &c| acc * z_inv + c)
        };
        (eval(&self.b) / eval(&self.a)).norm()
    }
}

/// Band-limit a waveform with a freshly designed filter
pub fn condition_waveform(
    samples: &[f64],
    sample_rate_hz: f64,
    low_hz: f64,
    high_hz: f64,
    order: usize,
) -> Result<Vec<f64>, DspError> {
    let filter = BandpassFilter::new(BandConfig {
        sample_rate_hz,
        low_hz,
        high_hz,
        order,
    })?;
    Ok(filter.filter(samples))
}

fn design_butter_bandpass(config: &BandConfig) -> (Vec<f64>, Vec<f64>) {
    let order = config.order;
    let fs = config.sample_rate_hz;
    let fs2 = 2.0 * fs;

    // Pre-warp the edges so the digital cutoffs land where requested.
    let w_low = fs2 * (PI * config.low_hz / fs).tan();
    let w_high = fs2 * (PI * config.high_hz / fs).tan();
    let bandwidth = w_high - w_low;
    let w0_sq = w_low * w_high;

    let mut analog_poles = Vec::with_capacity(2 * order);
    for k in 0..order {
        let theta = PI * (2 * k + order + 1) as f64 / (2 * order) as f64;
        let p = Complex64::from_polar(1.0, theta) * (bandwidth / 2.0);
        let root = (p * p - w0_sq).sqrt();
        analog_poles.push(p + root);
        analog_poles.push(p - root);
    }

    // Bilinear transform: `order` analog zeros at s = 0 map to z = 1,
    // the zeros at infinity map to z = -1.
    let digital_poles: Vec<Complex64> = analog_poles
        .iter()
        .map(|&p| (fs2 + p) / (fs2 - p))
        .collect();
    let mut digital_zeros = vec![Complex64::new(1.0, 0.0); order];
    digital_zeros.extend(std::iter::repeat(Complex64::new(-1.0, 0.0)).take(order));

    let denom = analog_poles
        .iter()
        .fold(Complex64::new(1.0, 0.0), |acc, &p| acc * (fs2 - p));
    let gain = (bandwidth.powi(order as i32) * Complex64::new(fs2.powi(order as i32), 0.0) / denom).re;

    let b: Vec<f64> = poly(&digital_zeros).iter().map(|c| c.re * gain).collect();
    let a: Vec<f64> = poly(&digital_poles).iter().map(|c| c.re).collect();
    (b, a)
}

/// Monic polynomial coefficients (highest power first) from its roots
fn poly(roots: &[Complex64]) -> Vec<Complex64> {
    let mut coeffs = vec![Complex64::new(1.0, 0.0)];
    for &r in roots {
        let mut next = coeffs.clone();
        next.push(Complex64::new(0.0, 0.0));
        for i in 1..next.len() {
            next[i] -= r * coeffs[i - 1];
        }
        coeffs = next;
    }
    coeffs
}

/// Initial state of the transposed direct form II filter for a unit step,
/// found by solving `(I - Aᵀ) zi = b[1..] - a[1..]·b[0]` where `A` is the
/// companion matrix of `a`.
fn steady_state(b: &[f64], a: &[f64]) -> Option<Vec<f64>> {
    let m = b.len().max(a.len()) - 1;
    if m == 0 {
        return Some(Vec::new());
    }
    let coef = |v: &[f64], i: usize| v.get(i).copied().unwrap_or(0.0);

    let mut matrix = vec![vec![0.0; m]; m];
    let mut rhs = vec![0.0; m];
    for i in 0..m {
        matrix[i][i] = 1.0;
        matrix[i][0] += coef(a, i + 1);
        if i + 1 < m {
            matrix[i][i + 1] -= 1.0;
        }
        rhs[i] = coef(b, i + 1) - coef(a, i + 1) * b[0];
    }

    solve(matrix, rhs)
}

/// Gaussian elimination with partial pivoting
fn solve(mut matrix: Vec<Vec<f64>>, mut rhs: Vec<f64>) -> Option<Vec<f64>> {
    let n = rhs.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| matrix[i][col].abs().total_cmp(&matrix[j][col].abs()))?;
        if matrix[pivot][col].abs() < f64::EPSILON {
            return None;
        }
        matrix.swap(col, pivot);
        rhs.swap(col, pivot);

        for row in col + 1..n {
            let factor = matrix[row][col] / matrix[col][col];
            for k in col..n {
                matrix[row][k] -= factor * matrix[col][k];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| matrix[row][k] * x[k]).sum();
        x[row] = (rhs[row] - tail) / matrix[row][row];
    }
    Some(x)
}

/// Transposed direct form II IIR filter with initial state `z`
fn lfilter(b: &[f64], a: &[f64], x: &[f64], mut z: Vec<f64>) -> Vec<f64> {
    let m = z.len();
    let coef = |v: &[f64], i: usize| v.get(i).copied().unwrap_or(0.0);
    let mut out = Vec::with_capacity(x.len());

    for &xi in x {
        let yi = b[0] * xi + z.first().copied().unwrap_or(0.0);
        for i in 0..m {
            let carry = if i + 1 < m { z[i + 1] } else { 0.0 };
            z[i] = coef(b, i + 1) * xi + carry - coef(a, i + 1) * yi;
        }
        out.push(yi);
    }
    out
}

/// Odd (point-symmetric) extension by `edge` samples on both ends
fn odd_extend(x: &[f64], edge: usize) -> Vec<f64> {
    let n = x.len();
    let first = x[0];
    let last = x[n - 1];

    let mut out = Vec::with_capacity(n + 2 * edge);
    out.extend((1..=edge).rev().map(|i| 2.0 * first - x[i]));
    out.extend_from_slice(x);
    out.extend((1..=edge).map(|j| 2.0 * last - x[n - 1 - j]));
    out
}
