//! Pipeline configuration
//!
//! Loaded from defaults, an optional file, then `RPPG__*` environment
//! variables (`RPPG__SAMPLE_RATE_HZ=25`, `RPPG__STRESS__POLICY=trend_relative`).

use ::config::{Config, Environment, File};
use pulse_dsp::BandConfig;
use ring_buffer::MAX_CAPACITY;
use rppg::{ExtractorConfig, RoiConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use stress_fusion::StressConfig;
use tracing::info;

use crate::PipelineError;

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Camera frame rate (Hz); overrides the extractor's own rate
    pub sample_rate_hz: f64,

    /// Lower edge of the heart-rate band (Hz)
    pub low_hz: f64,

    /// Upper edge of the heart-rate band (Hz)
    pub high_hz: f64,

    /// Butterworth prototype order
    pub filter_order: usize,

    pub extractor: ExtractorConfig,

    pub roi: RoiConfig,

    pub stress: StressConfig,

    /// Raw pulse samples retained for conditioning
    pub waveform_capacity: usize,

    /// Trailing conditioned samples searched for beats
    pub beat_window: usize,

    /// Heart-rate history length for the trend term
    pub hr_history: usize,

    /// Stress scores averaged into the smoothed score
    pub stress_history: usize,

    /// Worker input queue depth (frames)
    pub channel_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 30.0,
            low_hz: 0.7,
            high_hz: 3.0,
            filter_order: 3,
            extractor: ExtractorConfig::default(),
            roi: RoiConfig::default(),
            stress: StressConfig::default(),
            waveform_capacity: 240,
            beat_window: 200,
            hr_history: ring_buffer::DEFAULT_CAPACITY,
            stress_history: 20,
            channel_capacity: 64,
        }
    }
}

impl PipelineConfig {
    /// Green-channel extraction, trend-relative stress
    pub fn baseline_relative() -> Self {
        Self {
            extractor: ExtractorConfig::green(),
            stress: StressConfig::trend_relative(),
            ..Default::default()
        }
    }

    /// Layer defaults, an optional file and `RPPG__` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);
        if let Some(path) = path {
            info!("Loading pipeline config from {}", path.display());
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(
            Environment::with_prefix("RPPG")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn band_config(&self) -> BandConfig {
        BandConfig {
            sample_rate_hz: self.sample_rate_hz,
            low_hz: self.low_hz,
            high_hz: self.high_hz,
            order: self.filter_order,
        }
    }

    /// Extractor settings at the pipeline frame rate
    pub fn extractor_config(&self) -> ExtractorConfig {
        ExtractorConfig {
            sample_rate_hz: self.sample_rate_hz,
            ..self.extractor.clone()
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        self.band_config().validate()?;
        self.extractor_config().validate()?;
        self.roi.validate()?;
        self.stress.validate()?;

        if self.beat_window == 0 || self.beat_window > self.waveform_capacity {
            return Err(PipelineError::Config(format!(
                "beat window {} must be in 1..={}",
                self.beat_window, self.waveform_capacity
            )));
        }
        for (name, value) in [
            ("waveform_capacity", self.waveform_capacity),
            ("hr_history", self.hr_history),
            ("stress_history", self.stress_history),
            ("channel_capacity", self.channel_capacity),
        ] {
            if value == 0 || value > MAX_CAPACITY {
                return Err(PipelineError::Config(format!(
                    "{} must be in 1..={}, got {}",
                    name, MAX_CAPACITY, value
                )));
            }
        }
        Ok(())
    }
}
