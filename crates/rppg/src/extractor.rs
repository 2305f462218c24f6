//! Pulse extraction over a sliding colour window
//!
//! Each frame's [`ColorSample`] enters a fixed-length window. Once the
//! window is full, every new sample yields one pulse value computed from
//! the whole window with the configured algorithm.

use pulse_dsp::{mean, std_dev};
use ring_buffer::RingBuffer;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::ExtractorConfig;
use crate::sample::{ColorSample, Rgb, SampleAggregator};
use crate::RppgError;

/// Added to the window deviation before normalising
const STD_EPSILON: f64 = 1e-6;

/// Pulse extraction algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PulseAlgorithm {
    /// Green channel, standardised over the window
    Green,
    /// Chrominance projection (De Haan & Jeanne, 2013)
    #[default]
    Chrom,
}

/// Longest accepted window (samples)
pub const MAX_WINDOW_LEN: usize = ring_buffer::MAX_CAPACITY;

/// Sliding-window pulse extractor
#[derive(Debug, Clone)]
pub struct PulseExtractor {
    algorithm: PulseAlgorithm,
    window: RingBuffer<ColorSample>,
    aggregator: SampleAggregator,
}

impl PulseExtractor {
    /// Create an extractor with an explicit window length (samples)
    pub fn new(algorithm: PulseAlgorithm, window_len: usize) -> Result<Self, RppgError> {
        if !(2..=MAX_WINDOW_LEN).contains(&window_len) {
            return Err(RppgError::Config(format!(
                "pulse window must hold 2..={} samples, got {}",
                MAX_WINDOW_LEN, window_len
            )));
        }
        let window = RingBuffer::new(window_len).map_err(|e| RppgError::Config(e.to_string()))?;
        debug!("Pulse extractor: {:?}, window {} samples", algorithm, window_len);
        Ok(Self {
            algorithm,
            window,
            aggregator: SampleAggregator::default(),
        })
    }

    pub fn from_config(config: &ExtractorConfig) -> Result<Self, RppgError> {
        config.validate()?;
        let mut extractor = Self::new(config.algorithm, config.window_len())?;
        extractor.aggregator = SampleAggregator::new(config.min_roi_pixels);
        Ok(extractor)
    }

    pub fn algorithm(&self) -> PulseAlgorithm {
        self.algorithm
    }

    /// Configured window length `W`
    pub fn window_len(&self) -> usize {
        self.window.capacity()
    }

    /// Samples currently buffered (never exceeds `W`)
    pub fn buffered_len(&self) -> usize {
        self.window.len()
    }

    pub fn is_ready(&self) -> bool {
        self.window.is_full()
    }

    /// Add a frame sample; returns the current pulse value once the window is full
    pub fn push(&mut self, sample: ColorSample) -> Option<f64> {
        self.window.push(sample);
        if !self.window.is_full() {
            trace!("Pulse window filling: {}/{}", self.window.len(), self.window.capacity());
            return None;
        }
        self.window_signal().and_then(|signal| signal.last().copied())
    }

    /// Aggregate a frame's ROI pixels and push the result.
    ///
    /// Frames with too few pixels are skipped without touching the window.
    pub fn push_pixels(&mut self, pixels: &[Rgb]) -> Option<f64> {
        let sample = self.aggregator.aggregate(pixels)?;
        self.push(sample)
    }

    /// Pulse signal over the whole window, `None` until the window is full
    pub fn window_signal(&self) -> Option<Vec<f64>> {
        if !self.window.is_full() {
            return None;
        }
        let signal = match self.algorithm {
            PulseAlgorithm::Green => self.green_signal(),
            PulseAlgorithm::Chrom => self.chrom_signal(),
        };
        Some(signal)
    }

    /// Drop all buffered samples
    pub fn reset(&mut self) {
        self.window.clear();
    }

    fn green_signal(&self) -> Vec<f64> {
        let green: Vec<f64> = self.window.iter().map(|s| s.green).collect();
        let mu = mean(&green).unwrap_or(0.0);
        let sigma = std_dev(&green).unwrap_or(0.0) + STD_EPSILON;
        green.iter().map(|g| (g - mu) / sigma).collect()
    }

    fn chrom_signal(&self) -> Vec<f64> {
        let red: Vec<f64> = self.window.iter().map(|s| s.red).collect();
        let green: Vec<f64> = self.window.iter().map(|s| s.green).collect();
        let blue: Vec<f64> = self.window.iter().map(|s| s.blue).collect();

        let r = normalize_by_mean(&red);
        let g = normalize_by_mean(&green);
        let b = normalize_by_mean(&blue);

        // X = 3R - 2G, Y = 1.5R + G - 1.5B
        let x: Vec<f64> = r.iter().zip(&g).map(|(r, g)| 3.0 * r - 2.0 * g).collect();
        let y: Vec<f64> = r
            .iter()
            .zip(&g)
            .zip(&b)
            .map(|((r, g), b)| 1.5 * r + g - 1.5 * b)
            .collect();

        let std_x = std_dev(&x).unwrap_or(0.0);
        let std_y = std_dev(&y).unwrap_or(0.0);
        let alpha = if std_y == 0.0 { 1.0 } else { std_x / std_y };

        x.iter().zip(&y).map(|(x, y)| x - alpha * y).collect()
    }
}

/// Element-wise ratio to the series mean; a zero mean maps to 1.0
fn normalize_by_mean(values: &[f64]) -> Vec<f64> {
    let mu = mean(values).unwrap_or(0.0);
    if mu == 0.0 {
        return vec![1.0; values.len()];
    }
    values.iter().map(|v| v / mu).collect()
}
