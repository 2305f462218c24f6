//! Per-frame colour sampling

use serde::{Deserialize, Serialize};
use tracing::trace;

/// One RGB pixel
pub type Rgb = [u8; 3];

/// Minimum skin pixels for a usable frame sample
pub const DEFAULT_MIN_PIXELS: usize = 50;

/// Mean colour of one frame's ROI
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ColorSample {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl ColorSample {
    pub fn new(red: f64, green: f64, blue: f64) -> Self {
        Self { red, green, blue }
    }
}

/// Reduces a frame's skin pixels to one [`ColorSample`]
#[derive(Debug, Clone)]
pub struct SampleAggregator {
    min_pixels: usize,
}

impl SampleAggregator {
    pub fn new(min_pixels: usize) -> Self {
        Self { min_pixels }
    }

    pub fn min_pixels(&self) -> usize {
        self.min_pixels
    }

    /// Channel means over `pixels`; `None` below the minimum pixel count
    pub fn aggregate(&self, pixels: &[Rgb]) -> Option<ColorSample> {
        if pixels.is_empty() || pixels.len() < self.min_pixels {
            trace!("ROI too small: {} pixels", pixels.len());
            return None;
        }

        let mut sums = [0u64; 3];
        for px in pixels {
            sums[0] += px[0] as u64;
            sums[1] += px[1] as u64;
            sums[2] += px[2] as u64;
        }

        let n = pixels.len() as f64;
        Some(ColorSample {
            red: sums[0] as f64 / n,
            green: sums[1] as f64 / n,
            blue: sums[2] as f64 / n,
        })
    }
}

impl Default for SampleAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_PIXELS)
    }
}
