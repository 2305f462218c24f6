//! Remote Photoplethysmography (rPPG)
//!
//! Front half of the pulse pipeline:
//! - Skin ROI selection from face landmarks
//! - Per-frame colour sampling (channel means over the ROI)
//! - Pulse extraction over a sliding window (Green or CHROM)

pub mod config;
pub mod extractor;
pub mod frame;
pub mod roi;
pub mod sample;

pub use config::ExtractorConfig;
pub use extractor::{PulseAlgorithm, PulseExtractor, MAX_WINDOW_LEN};
pub use frame::VideoFrame;
pub use roi::{FaceLandmarks, RelRect, RoiConfig, RoiExtractor, RoiRect, LANDMARK_COUNT};
pub use sample::{ColorSample, Rgb, SampleAggregator, DEFAULT_MIN_PIXELS};

use thiserror::Error;

/// rPPG error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RppgError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Expected {expected} face landmarks, got {actual}")]
    LandmarkCount { expected: usize, actual: usize },

    #[error("Face landmark {index} has a non-finite coordinate")]
    LandmarkCoordinate { index: usize },

    #[error("Frame buffer holds {actual} bytes, expected {expected} for its dimensions")]
    FrameGeometry { expected: usize, actual: usize },
}
