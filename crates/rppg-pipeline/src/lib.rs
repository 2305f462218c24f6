//! rPPG Stress Pipeline
//!
//! Wires the stages together for one subject stream:
//! ROI pixels → pulse sample → conditioned waveform → beats → HRV → stress.
//!
//! Each cycle publishes an immutable [`PipelineSnapshot`] that any number of
//! readers can observe without blocking the pipeline.

pub mod config;
pub mod eval;
pub mod pipeline;
pub mod snapshot;
pub mod worker;

pub use config::PipelineConfig;
pub use pipeline::Pipeline;
pub use snapshot::{PipelineSnapshot, SnapshotPublisher, SnapshotReader};
pub use worker::{PipelineWorker, WorkerInput};

pub use physio::{detect_beats, rr_intervals, HrvMetrics};
pub use pulse_dsp::condition_waveform;
pub use rppg::{FaceLandmarks, PulseAlgorithm, Rgb, VideoFrame};
pub use stress_fusion::{StressBreakdown, StressPolicy};

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Pipeline error types
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("DSP error: {0}")]
    Dsp(#[from] pulse_dsp::DspError),

    #[error("Physiological metrics error: {0}")]
    Physio(#[from] physio::PhysioError),

    #[error("rPPG error: {0}")]
    Rppg(#[from] rppg::RppgError),

    #[error("Stress fusion error: {0}")]
    Stress(#[from] stress_fusion::StressError),

    #[error("Buffer error: {0}")]
    Buffer(#[from] ring_buffer::RingBufferError),

    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Pipeline worker stopped")]
    WorkerClosed,
}

/// Install a plain-text global subscriber
pub fn init_logging(level: Level) -> Result<(), PipelineError> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| PipelineError::Logging(e.to_string()))
}

/// Install a JSON-lines global subscriber
pub fn init_json_logging(level: Level) -> Result<(), PipelineError> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| PipelineError::Logging(e.to_string()))
}
