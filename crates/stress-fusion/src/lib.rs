//! Stress Fusion
//!
//! Combines heart rate, RMSSD and either LF/HF or the recent heart-rate
//! trend into one stress score in [0, 100].

pub mod config;
pub mod policy;

pub use config::{Anchor, DirectConfig, StressConfig, TrendConfig};
pub use policy::{normalize, StressBreakdown, StressFuser, StressPolicy};

use thiserror::Error;

/// Stress fusion error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StressError {
    #[error("Invalid anchor '{name}': low {low} must be below high {high}")]
    InvalidAnchor { name: &'static str, low: f64, high: f64 },

    #[error("Configuration error: {0}")]
    Config(String),
}
