//! Window Statistics

use serde::{Deserialize, Serialize};

/// Summary statistics for a signal window
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalStats {
    /// Mean value
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
    /// Minimum value
    pub min: f64,
    /// Maximum value
    pub max: f64,
}

impl SignalStats {
    /// Compute statistics from a slice of values
    pub fn compute(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;

        let min = values.iter().cloned().fold(f64::MAX, f64::min);
        let max = values.iter().cloned().fold(f64::MIN, f64::max);

        let variance = values.iter().map(|&v| (v - mean) * (v - mean)).sum::<f64>() / n;

        Self {
            mean,
            std_dev: variance.sqrt(),
            min,
            max,
        }
    }
}

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (ddof = 0), `None` for an empty slice
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    let variance = values.iter().map(|&v| (v - mean) * (v - mean)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}
