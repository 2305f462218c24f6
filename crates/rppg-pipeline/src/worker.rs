//! Pipeline worker task
//!
//! Runs a [`Pipeline`] on its own tokio task. Frames arrive over a bounded
//! channel in capture order; results are observed through a
//! [`SnapshotReader`]. Dropping every sender (or calling
//! [`PipelineWorker::shutdown`]) stops the task and hands the pipeline back.

use rppg::{FaceLandmarks, Rgb, VideoFrame};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::pipeline::Pipeline;
use crate::snapshot::SnapshotReader;
use crate::PipelineError;

/// Unit of work for the worker
#[derive(Debug, Clone)]
pub enum WorkerInput {
    /// Pre-selected skin pixels for one frame
    Roi(Vec<Rgb>),
    /// Decoded frame plus landmarks (`None` when no face was found)
    Frame {
        frame: VideoFrame,
        landmarks: Option<FaceLandmarks>,
    },
}

/// Handle to a running pipeline task
pub struct PipelineWorker {
    sender: mpsc::Sender<WorkerInput>,
    reader: SnapshotReader,
    handle: JoinHandle<Pipeline>,
}

impl PipelineWorker {
    /// Move `pipeline` onto a new task; must be called inside a tokio runtime
    pub fn spawn(pipeline: Pipeline) -> Self {
        let capacity = pipeline.config().channel_capacity;
        let (sender, receiver) = mpsc::channel(capacity);
        let reader = pipeline.subscribe();
        let handle = tokio::spawn(run(pipeline, receiver));
        info!("Pipeline worker started (queue depth {})", capacity);

        Self {
            sender,
            reader,
            handle,
        }
    }

    /// Queue one frame's ROI pixels, waiting if the queue is full
    pub async fn submit_roi(&self, pixels: Vec<Rgb>) -> Result<(), PipelineError> {
        self.submit(WorkerInput::Roi(pixels)).await
    }

    /// Queue a decoded frame, waiting if the queue is full
    pub async fn submit_frame(
        &self,
        frame: VideoFrame,
        landmarks: Option<FaceLandmarks>,
    ) -> Result<(), PipelineError> {
        self.submit(WorkerInput::Frame { frame, landmarks }).await
    }

    pub async fn submit(&self, input: WorkerInput) -> Result<(), PipelineError> {
        self.sender
            .send(input)
            .await
            .map_err(|_| PipelineError::WorkerClosed)
    }

    /// Extra sender for a capture task
    pub fn sender(&self) -> mpsc::Sender<WorkerInput> {
        self.sender.clone()
    }

    pub fn subscribe(&self) -> SnapshotReader {
        self.reader.clone()
    }

    /// Close the queue, drain it and return the pipeline.
    ///
    /// Senders obtained from [`PipelineWorker::sender`] keep the task alive
    /// until they are dropped as well.
    pub async fn shutdown(self) -> Result<Pipeline, PipelineError> {
        drop(self.sender);
        self.handle.await.map_err(|e| {
            warn!("Pipeline worker failed: {}", e);
            PipelineError::WorkerClosed
        })
    }
}

async fn run(mut pipeline: Pipeline, mut receiver: mpsc::Receiver<WorkerInput>) -> Pipeline {
    while let Some(input) = receiver.recv().await {
        match input {
            WorkerInput::Roi(pixels) => {
                pipeline.process_roi(&pixels);
            }
            WorkerInput::Frame { frame, landmarks } => {
                if let Err(e) = pipeline.process_frame(&frame, landmarks.as_ref()) {
                    warn!("Dropping frame {}: {}", frame.sequence, e);
                }
            }
        }
    }

    debug!("Worker channel closed");
    info!(
        "Pipeline worker stopped after {} frames",
        pipeline.frames_processed()
    );
    pipeline
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;

    #[tokio::test]
    async fn test_worker_processes_in_order() {
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let worker = PipelineWorker::spawn(pipeline);
        let reader = worker.subscribe();

        for _ in 0..50 {
            worker.submit_roi(vec![[150, 110, 90]; 60]).await.unwrap();
        }

        let pipeline = worker.shutdown().await.unwrap();
        assert_eq!(pipeline.frames_processed(), 50);
        assert_eq!(reader.latest().frames_processed, 50);
        assert!(reader.latest().pulse_sample.is_some());
    }

    #[tokio::test]
    async fn test_bad_frame_does_not_stop_worker() {
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let worker = PipelineWorker::spawn(pipeline);

        let bad = VideoFrame {
            data: vec![0; 3],
            width: 4,
            height: 4,
            timestamp_ns: 0,
            sequence: 9,
        };
        worker.submit_frame(bad, None).await.unwrap();
        worker
            .submit_frame(VideoFrame::filled(4, 4, [200, 150, 120]), None)
            .await
            .unwrap();

        let pipeline = worker.shutdown().await.unwrap();
        assert_eq!(pipeline.frames_processed(), 1);
    }
}
