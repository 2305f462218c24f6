//! End-to-end scenarios across the workspace crates

use anyhow::Result;
use rppg::{ColorSample, FaceLandmarks, PulseAlgorithm, PulseExtractor, VideoFrame, LANDMARK_COUNT};
use rppg_pipeline::{
    condition_waveform, detect_beats, rr_intervals, Pipeline, PipelineConfig, PipelineWorker,
};
use std::f64::consts::PI;

const FPS: f64 = 30.0;

/// Deterministic jitter in [-0.5, 0.5)
fn jitter(i: usize, salt: usize) -> f64 {
    ((i * 7919 + salt * 104_729) % 1000) as f64 / 1000.0 - 0.5
}

/// 72 BPM component
fn pulse(i: usize) -> f64 {
    (2.0 * PI * 1.2 * i as f64 / FPS).sin()
}

fn noisy_sample(i: usize, pulse_gain: f64) -> ColorSample {
    let s = pulse_gain * pulse(i);
    ColorSample::new(
        120.0 + jitter(i, 1) + 1.0 * s,
        100.0 + jitter(i, 2) + 2.0 * s,
        90.0 + jitter(i, 3) + 0.5 * s,
    )
}

fn face_landmarks(size: f32) -> Result<FaceLandmarks> {
    let mut points = vec![(size / 2.0, size / 2.0); LANDMARK_COUNT];
    points[0] = (0.0, 0.0);
    points[1] = (size, size);
    Ok(FaceLandmarks::new(points)?)
}

fn skin_frame(i: usize) -> VideoFrame {
    let s = pulse(i);
    let color = [
        (200.0 + 3.0 * s).round() as u8,
        (150.0 + 5.0 * s).round() as u8,
        (120.0 + 2.0 * s).round() as u8,
    ];
    let mut frame = VideoFrame::filled(64, 64, color);
    frame.sequence = i as u32;
    frame.timestamp_ns = (i as f64 * 1e9 / FPS) as u64;
    frame
}

#[test]
fn chrom_emits_once_window_is_full() -> Result<()> {
    let mut extractor = PulseExtractor::new(PulseAlgorithm::Chrom, 48)?;

    let outputs: Vec<Option<f64>> = (0..90)
        .map(|i| extractor.push(noisy_sample(i, 0.0)))
        .collect();

    assert!(outputs[..47].iter().all(Option::is_none));
    assert!(outputs[47..].iter().all(Option::is_some));
    assert_eq!(extractor.buffered_len(), 48);
    Ok(())
}

#[test]
fn chrom_pulse_yields_beats() -> Result<()> {
    let mut extractor = PulseExtractor::new(PulseAlgorithm::Chrom, 48)?;
    let raw: Vec<f64> = (0..150)
        .filter_map(|i| extractor.push(noisy_sample(i, 1.0)))
        .collect();
    assert_eq!(raw.len(), 103);

    let conditioned = condition_waveform(&raw, FPS, 0.7, 3.0, 3)?;
    assert_eq!(conditioned.len(), raw.len());

    let beats = detect_beats(&conditioned, FPS)?.expect("periodic pulse should produce beats");
    assert!(beats.len() >= 2);

    let rr = rr_intervals(&beats, FPS)?;
    let mean_rr = rr.iter().sum::<f64>() / rr.len() as f64;
    assert!((60.0 / mean_rr - 72.0).abs() < 8.0, "mean rr {}", mean_rr);
    Ok(())
}

#[test]
fn frames_with_landmarks_track_heart_rate() -> Result<()> {
    let mut pipeline = Pipeline::new(PipelineConfig::default())?;
    let landmarks = face_landmarks(63.0)?;

    let mut snapshot = pipeline.latest();
    for i in 0..400 {
        snapshot = pipeline.process_frame(&skin_frame(i), Some(&landmarks))?;
    }

    assert_eq!(snapshot.frames_processed, 400);
    let hr = snapshot.heart_rate_bpm().expect("heart rate after 400 frames");
    assert!((hr - 72.0).abs() < 6.0, "hr {}", hr);
    Ok(())
}

#[test]
fn trend_policy_produces_bounded_stress() -> Result<()> {
    let mut pipeline = Pipeline::new(PipelineConfig::baseline_relative())?;
    let landmarks = face_landmarks(63.0)?;

    for i in 0..400 {
        pipeline.process_frame(&skin_frame(i), Some(&landmarks))?;
    }

    let snapshot = pipeline.latest();
    let score = snapshot.stress_score().expect("trend policy always scores");
    assert!((0.0..=100.0).contains(&score));

    let smoothed = snapshot.smoothed_stress.expect("smoothed score");
    assert!((0.0..=100.0).contains(&smoothed));
    Ok(())
}

#[test]
fn missing_face_defers_without_error() -> Result<()> {
    let mut pipeline = Pipeline::new(PipelineConfig::default())?;
    for i in 0..100 {
        let snapshot = pipeline.process_frame(&skin_frame(i), None)?;
        assert!(snapshot.pulse_sample.is_none());
        assert!(snapshot.hrv.is_none());
    }
    Ok(())
}

#[tokio::test]
async fn worker_publishes_snapshots() -> Result<()> {
    let pipeline = Pipeline::new(PipelineConfig::default())?;
    let worker = PipelineWorker::spawn(pipeline);
    let reader = worker.subscribe();
    let landmarks = face_landmarks(63.0)?;

    for i in 0..300 {
        worker
            .submit_frame(skin_frame(i), Some(landmarks.clone()))
            .await?;
    }

    let pipeline = worker.shutdown().await?;
    assert_eq!(pipeline.frames_processed(), 300);

    let snapshot = reader.latest();
    assert_eq!(snapshot.frames_processed, 300);
    assert!(snapshot.heart_rate_bpm().is_some());
    Ok(())
}
