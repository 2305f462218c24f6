//! Per-frame pipeline

use metrics::{counter, gauge};
use physio::{BeatDetector, HrvEstimator, HrvMetrics, DEFAULT_RESAMPLE_HZ};
use pulse_dsp::{BandpassFilter, SignalStats};
use ring_buffer::RingBuffer;
use rppg::{FaceLandmarks, PulseExtractor, Rgb, RoiExtractor, VideoFrame};
use std::sync::Arc;
use stress_fusion::{StressBreakdown, StressFuser};
use tracing::{debug, info, trace};

use crate::config::PipelineConfig;
use crate::snapshot::{PipelineSnapshot, SnapshotPublisher, SnapshotReader};
use crate::PipelineError;

/// Physiological signal pipeline for one subject stream.
///
/// Stages run synchronously in capture order; every call to
/// [`Pipeline::process_roi`] completes one cycle and publishes a snapshot.
pub struct Pipeline {
    config: PipelineConfig,
    roi: RoiExtractor,
    extractor: PulseExtractor,
    filter: BandpassFilter,
    detector: BeatDetector,
    hrv: HrvEstimator,
    fuser: StressFuser,
    /// Raw pulse samples, oldest first
    waveform: RingBuffer<f64>,
    hr_history: RingBuffer<f64>,
    stress_history: RingBuffer<f64>,
    frames_processed: u64,
    last_hrv: Option<HrvMetrics>,
    last_stress: Option<StressBreakdown>,
    last_beat_count: usize,
    last_conditioned: Vec<f64>,
    publisher: SnapshotPublisher,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;

        let extractor = PulseExtractor::from_config(&config.extractor_config())?;
        let filter = BandpassFilter::new(config.band_config())?;
        let fuser = StressFuser::new(config.stress.clone())?;
        let detector = BeatDetector::new(config.sample_rate_hz)?;
        let hrv = HrvEstimator::new(DEFAULT_RESAMPLE_HZ)?;

        info!(
            "Pipeline ready: {:?} at {} Hz, window {} samples, {:?} stress",
            extractor.algorithm(),
            config.sample_rate_hz,
            extractor.window_len(),
            fuser.policy()
        );

        Ok(Self {
            roi: RoiExtractor::new(config.roi.clone())?,
            extractor,
            filter,
            detector,
            hrv,
            fuser,
            waveform: RingBuffer::new(config.waveform_capacity)?,
            hr_history: RingBuffer::new(config.hr_history)?,
            stress_history: RingBuffer::new(config.stress_history)?,
            frames_processed: 0,
            last_hrv: None,
            last_stress: None,
            last_beat_count: 0,
            last_conditioned: Vec::new(),
            publisher: SnapshotPublisher::new(),
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Raw pulse samples currently retained
    pub fn waveform_len(&self) -> usize {
        self.waveform.len()
    }

    /// Heart-rate history, oldest first
    pub fn hr_history(&self) -> Vec<f64> {
        self.hr_history.to_vec()
    }

    /// New reader of the published snapshots
    pub fn subscribe(&self) -> SnapshotReader {
        self.publisher.subscribe()
    }

    pub fn latest(&self) -> Arc<PipelineSnapshot> {
        self.publisher.latest()
    }

    /// Feed one frame's ROI pixels to the pulse extractor.
    ///
    /// Returns the new pulse sample, or `None` while the window fills or when
    /// the pixel set is too small.
    pub fn submit_roi_pixels(&mut self, pixels: &[Rgb]) -> Option<f64> {
        let sample = self.extractor.push_pixels(pixels)?;
        self.waveform.push(sample);
        Some(sample)
    }

    /// Band-limit `samples` with the pipeline's filter
    pub fn condition_waveform(&self, samples: &[f64]) -> Vec<f64> {
        self.filter.filter(samples)
    }

    pub fn detect_beats(&self, waveform: &[f64]) -> Option<Vec<usize>> {
        self.detector.detect(waveform)
    }

    /// HRV metrics for RR intervals in seconds
    pub fn compute_hrv(&mut self, rr: &[f64]) -> Option<HrvMetrics> {
        self.hrv.compute(rr)
    }

    /// Stress score for `metrics` given an oldest-first HR history
    pub fn compute_stress(&self, metrics: &HrvMetrics, hr_history: &[f64]) -> Option<f64> {
        self.fuser.score(metrics, hr_history)
    }

    /// Run one full cycle on a frame's ROI pixels and publish the result
    pub fn process_roi(&mut self, pixels: &[Rgb]) -> Arc<PipelineSnapshot> {
        self.frames_processed += 1;
        counter!("rppg_frames_total").increment(1);

        let pulse_sample = self.submit_roi_pixels(pixels);
        match pulse_sample {
            Some(_) => self.update_metrics(),
            None => {
                counter!("rppg_frames_deferred_total").increment(1);
                trace!("Frame {} deferred", self.frames_processed);
            }
        }

        self.publisher.publish(PipelineSnapshot {
            frames_processed: self.frames_processed,
            pulse_sample,
            waveform: self.last_conditioned.clone(),
            waveform_stats: SignalStats::compute(&self.last_conditioned),
            beat_count: self.last_beat_count,
            hrv: self.last_hrv,
            stress: self.last_stress,
            smoothed_stress: self.stress_history.mean(),
        })
    }

    /// Select skin pixels from a decoded frame and run one cycle.
    ///
    /// A frame without a face counts as an empty ROI.
    pub fn process_frame(
        &mut self,
        frame: &VideoFrame,
        landmarks: Option<&FaceLandmarks>,
    ) -> Result<Arc<PipelineSnapshot>, PipelineError> {
        frame.check_geometry()?;
        let pixels = match landmarks {
            Some(landmarks) => self.roi.extract(frame, landmarks)?,
            None => {
                trace!("No face in frame {}", frame.sequence);
                Vec::new()
            }
        };
        Ok(self.process_roi(&pixels))
    }

    /// Drop all buffered signal and history
    pub fn reset(&mut self) {
        self.extractor.reset();
        self.waveform.clear();
        self.hr_history.clear();
        self.stress_history.clear();
        self.frames_processed = 0;
        self.last_hrv = None;
        self.last_stress = None;
        self.last_beat_count = 0;
        self.last_conditioned.clear();
        self.publisher.publish(PipelineSnapshot::default());
        debug!("Pipeline reset");
    }

    fn update_metrics(&mut self) {
        let conditioned = self.condition_waveform(&self.waveform.to_vec());
        let start = conditioned.len().saturating_sub(self.config.beat_window);
        self.last_conditioned = conditioned[start..].to_vec();

        let Some(beats) = self.detect_beats(&self.last_conditioned) else {
            return;
        };
        self.last_beat_count = beats.len();

        let rr = self.detector.rr_intervals(&beats);
        let Some(metrics) = self.compute_hrv(&rr) else {
            return;
        };
        self.last_hrv = Some(metrics);
        self.hr_history.push(metrics.heart_rate_bpm);
        gauge!("rppg_heart_rate_bpm").set(metrics.heart_rate_bpm);

        let history = self.hr_history.to_vec();
        if let Some(stress) = self.fuser.fuse(&metrics, &history) {
            self.stress_history.push(stress.score);
            gauge!("rppg_stress_score").set(stress.score);
            debug!(
                "HR {:.1} BPM, RMSSD {:.1} ms, stress {:.1}",
                metrics.heart_rate_bpm, metrics.rmssd_ms, stress.score
            );
            self.last_stress = Some(stress);
        }
    }
}
