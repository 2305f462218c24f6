//! Published pipeline state
//!
//! The pipeline is the single writer. Each cycle swaps in a fresh
//! `Arc<PipelineSnapshot>`; readers clone the `Arc` and never see a
//! half-updated record.

use physio::HrvMetrics;
use pulse_dsp::SignalStats;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use stress_fusion::StressBreakdown;
use tokio::sync::watch;

use crate::PipelineError;

/// Pipeline state after one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineSnapshot {
    /// Frames admitted since start (or last reset)
    pub frames_processed: u64,

    /// Pulse sample produced this frame, if any
    pub pulse_sample: Option<f64>,

    /// Conditioned waveform over the beat window, oldest first
    pub waveform: Vec<f64>,

    /// Summary of `waveform`
    pub waveform_stats: SignalStats,

    /// Beats found in `waveform` on the last detection
    pub beat_count: usize,

    /// Most recent HRV metrics
    pub hrv: Option<HrvMetrics>,

    /// Most recent stress fusion result
    pub stress: Option<StressBreakdown>,

    /// Mean of the trailing stress scores
    pub smoothed_stress: Option<f64>,
}

impl PipelineSnapshot {
    pub fn heart_rate_bpm(&self) -> Option<f64> {
        self.hrv.map(|m| m.heart_rate_bpm)
    }

    pub fn stress_score(&self) -> Option<f64> {
        self.stress.map(|s| s.score)
    }
}

/// Write side of the snapshot channel
#[derive(Debug)]
pub struct SnapshotPublisher {
    tx: watch::Sender<Arc<PipelineSnapshot>>,
}

impl SnapshotPublisher {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(PipelineSnapshot::default()));
        Self { tx }
    }

    /// Replace the current snapshot; succeeds with or without readers
    pub fn publish(&self, snapshot: PipelineSnapshot) -> Arc<PipelineSnapshot> {
        let snapshot = Arc::new(snapshot);
        self.tx.send_replace(Arc::clone(&snapshot));
        snapshot
    }

    pub fn latest(&self) -> Arc<PipelineSnapshot> {
        Arc::clone(&self.tx.borrow())
    }

    pub fn subscribe(&self) -> SnapshotReader {
        SnapshotReader {
            rx: self.tx.subscribe(),
        }
    }

    pub fn reader_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for SnapshotPublisher {
    fn default() -> Self {
        Self::new()
    }
}

/// Read side of the snapshot channel
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    rx: watch::Receiver<Arc<PipelineSnapshot>>,
}

impl SnapshotReader {
    /// Current snapshot without waiting
    pub fn latest(&self) -> Arc<PipelineSnapshot> {
        Arc::clone(&self.rx.borrow())
    }

    /// Wait for the next published snapshot
    pub async fn changed(&mut self) -> Result<Arc<PipelineSnapshot>, PipelineError> {
        self.rx
            .changed()
            .await
            .map_err(|_| PipelineError::WorkerClosed)?;
        Ok(Arc::clone(&self.rx.borrow_and_update()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readers_see_latest() {
        let publisher = SnapshotPublisher::new();
        let reader = publisher.subscribe();
        assert_eq!(reader.latest().frames_processed, 0);

        publisher.publish(PipelineSnapshot {
            frames_processed: 7,
            ..Default::default()
        });
        assert_eq!(reader.latest().frames_processed, 7);
        assert_eq!(publisher.latest().frames_processed, 7);
    }

    #[test]
    fn test_held_snapshot_is_immutable() {
        let publisher = SnapshotPublisher::new();
        let reader = publisher.subscribe();

        publisher.publish(PipelineSnapshot {
            frames_processed: 1,
            ..Default::default()
        });
        let held = reader.latest();
        publisher.publish(PipelineSnapshot {
            frames_processed: 2,
            ..Default::default()
        });

        assert_eq!(held.frames_processed, 1);
        assert_eq!(reader.latest().frames_processed, 2);
    }

    #[tokio::test]
    async fn test_changed_wakes_reader() {
        let publisher = SnapshotPublisher::new();
        let mut reader = publisher.subscribe();

        let waiter = tokio::spawn(async move { reader.changed().await });
        tokio::task::yield_now().await;
        publisher.publish(PipelineSnapshot {
            frames_processed: 3,
            ..Default::default()
        });

        let snapshot = waiter.await.unwrap().unwrap();
        assert_eq!(snapshot.frames_processed, 3);
    }

    #[tokio::test]
    async fn test_changed_errors_when_publisher_dropped() {
        let publisher = SnapshotPublisher::new();
        let mut reader = publisher.subscribe();
        drop(publisher);
        assert!(matches!(
            reader.changed().await,
            Err(PipelineError::WorkerClosed)
        ));
    }

    #[test]
    fn test_snapshot_serializes() {
        let json = serde_json::to_string(&PipelineSnapshot::default()).unwrap();
        assert!(json.contains("\"frames_processed\":0"));
    }
}
