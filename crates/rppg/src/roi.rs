//! Skin ROI selection
//!
//! The ROI is the union of three rectangles placed relative to the face
//! landmark bounding box (forehead and both cheeks), minus any excluded
//! landmark polygons, intersected with a YCrCb skin-colour gate.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::frame::VideoFrame;
use crate::sample::Rgb;
use crate::RppgError;

/// Points per face from the landmark provider
pub const LANDMARK_COUNT: usize = 468;

/// Landmark coordinates are clamped to this many pixels from the origin
const MAX_COORDINATE: f32 = 16_777_216.0;

/// Face-mesh contours around the eyes and the outer lips
const LEFT_EYE: [usize; 16] = [
    33, 7, 163, 144, 145, 153, 154, 155, 133, 173, 157, 158, 159, 160, 161, 246,
];
const RIGHT_EYE: [usize; 16] = [
    263, 249, 390, 373, 374, 380, 381, 382, 362, 398, 384, 385, 386, 387, 388, 466,
];
const OUTER_LIPS: [usize; 20] = [
    61, 146, 91, 181, 84, 17, 314, 405, 321, 375, 291, 409, 270, 269, 267, 0, 37, 39, 40, 185,
];

/// Fixed-size set of 2-D face landmarks (pixel coordinates)
#[derive(Debug, Clone, PartialEq)]
pub struct FaceLandmarks {
    points: Vec<(f32, f32)>,
}

impl FaceLandmarks {
    pub fn new(points: Vec<(f32, f32)>) -> Result<Self, RppgError> {
        if points.len() != LANDMARK_COUNT {
            return Err(RppgError::LandmarkCount {
                expected: LANDMARK_COUNT,
                actual: points.len(),
            });
        }
        if let Some(index) = points
            .iter()
            .position(|(x, y)| !x.is_finite() || !y.is_finite())
        {
            return Err(RppgError::LandmarkCoordinate { index });
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[(f32, f32)] {
        &self.points
    }

    /// Bounding box as `(x_min, y_min, x_max, y_max)`, truncated to pixels.
    ///
    /// Coordinates beyond 2^24 pixels are clamped.
    pub fn bounds(&self) -> (i64, i64, i64, i64) {
        let clamp = |v: f32| v.clamp(-MAX_COORDINATE, MAX_COORDINATE) as i64;
        let mut bounds = (i64::MAX, i64::MAX, i64::MIN, i64::MIN);
        for &(x, y) in &self.points {
            let (x, y) = (clamp(x), clamp(y));
            bounds.0 = bounds.0.min(x);
            bounds.1 = bounds.1.min(y);
            bounds.2 = bounds.2.max(x);
            bounds.3 = bounds.3.max(y);
        }
        bounds
    }
}

/// Rectangle as fractions of the face bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelRect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl RelRect {
    pub const fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    fn is_finite(&self) -> bool {
        [self.left, self.top, self.right, self.bottom]
            .iter()
            .all(|v| v.is_finite())
    }

    /// Resolve against a face box; edges are inclusive
    fn resolve(&self, bounds: (i64, i64, i64, i64)) -> RoiRect {
        let (x_min, y_min, x_max, y_max) = bounds;
        let w = x_max.saturating_sub(x_min) as f64;
        let h = y_max.saturating_sub(y_min) as f64;
        RoiRect {
            left: x_min.saturating_add((self.left * w) as i64),
            top: y_min.saturating_add((self.top * h) as i64),
            right: x_min.saturating_add((self.right * w) as i64),
            bottom: y_min.saturating_add((self.bottom * h) as i64),
        }
    }
}

/// Rectangle in frame pixel coordinates (inclusive edges, may lie off-frame)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoiRect {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

impl RoiRect {
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= self.left && x <= self.right && y >= self.top && y <= self.bottom
    }
}

/// ROI geometry and skin gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoiConfig {
    pub regions: Vec<RelRect>,
    /// Inclusive Cr range accepted as skin
    pub cr_range: (f64, f64),
    /// Inclusive Cb range accepted as skin
    pub cb_range: (f64, f64),
    /// Landmark-index polygons removed from the regions
    pub exclusions: Vec<Vec<usize>>,
}

impl Default for RoiConfig {
    fn default() -> Self {
        Self {
            regions: vec![
                // forehead
                RelRect::new(0.25, 0.05, 0.75, 0.30),
                // left cheek
                RelRect::new(0.10, 0.45, 0.35, 0.75),
                // right cheek
                RelRect::new(0.65, 0.45, 0.90, 0.75),
            ],
            cr_range: (133.0, 173.0),
            cb_range: (77.0, 127.0),
            exclusions: Vec::new(),
        }
    }
}

impl RoiConfig {
    /// Forehead only (steadier under talking or chewing)
    pub fn forehead_only() -> Self {
        let mut config = Self::default();
        config.regions.truncate(1);
        config
    }

    /// Default regions with the eyes and lips masked out
    pub fn mask_eyes_and_mouth() -> Self {
        Self {
            exclusions: vec![LEFT_EYE.to_vec(), RIGHT_EYE.to_vec(), OUTER_LIPS.to_vec()],
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), RppgError> {
        if self.regions.is_empty() {
            return Err(RppgError::Config("at least one ROI region is required".into()));
        }
        if !self.regions.iter().all(RelRect::is_finite) {
            return Err(RppgError::Config("ROI region edges must be finite".into()));
        }
        if let Some(index) = self.exclusions.iter().flatten().find(|&&i| i >= LANDMARK_COUNT) {
            return Err(RppgError::Config(format!(
                "exclusion landmark {} out of range (max {})",
                index,
                LANDMARK_COUNT - 1
            )));
        }
        Ok(())
    }
}

/// Selects skin pixels from a frame given its landmarks
#[derive(Debug, Clone, Default)]
pub struct RoiExtractor {
    config: RoiConfig,
}

impl RoiExtractor {
    pub fn new(config: RoiConfig) -> Result<Self, RppgError> {
        config.validate()?;
        debug!(
            "ROI extractor: {} region(s), {} exclusion(s)",
            config.regions.len(),
            config.exclusions.len()
        );
        Ok(Self { config })
    }

    pub fn config(&self) -> &RoiConfig {
        &self.config
    }

    /// ROI rectangles for a face
    pub fn regions(&self, landmarks: &FaceLandmarks) -> Vec<RoiRect> {
        let bounds = landmarks.bounds();
        self.config.regions.iter().map(|r| r.resolve(bounds)).collect()
    }

    /// Excluded polygons in frame coordinates
    fn exclusion_polygons(&self, landmarks: &FaceLandmarks) -> Vec<Vec<(f64, f64)>> {
        let points = landmarks.points();
        self.config
            .exclusions
            .iter()
            .map(|ids| {
                ids.iter()
                    .filter_map(|&i| points.get(i))
                    .map(|&(x, y)| (x as f64, y as f64))
                    .collect()
            })
            .collect()
    }

    /// YCrCb skin test (ITU-R BT.601, offset 128)
    pub fn is_skin(&self, px: Rgb) -> bool {
        let (r, g, b) = (px[0] as f64, px[1] as f64, px[2] as f64);
        let y = 0.299 * r + 0.587 * g + 0.114 * b;
        let cr = (r - y) * 0.713 + 128.0;
        let cb = (b - y) * 0.564 + 128.0;

        let (cr_lo, cr_hi) = self.config.cr_range;
        let (cb_lo, cb_hi) = self.config.cb_range;
        cr >= cr_lo && cr <= cr_hi && cb >= cb_lo && cb <= cb_hi
    }

    /// Skin pixels inside the union of the ROI rectangles
    pub fn extract(
        &self,
        frame: &VideoFrame,
        landmarks: &FaceLandmarks,
    ) -> Result<Vec<Rgb>, RppgError> {
        frame.check_geometry()?;
        if frame.width == 0 || frame.height == 0 {
            return Ok(Vec::new());
        }

        let regions = self.regions(landmarks);
        let (x_lo, y_lo, x_hi, y_hi) = match union_bounds(&regions, frame) {
            Some(b) => b,
            None => {
                warn!("Face ROI lies outside the {}x{} frame", frame.width, frame.height);
                return Ok(Vec::new());
            }
        };

        let exclusions = self.exclusion_polygons(landmarks);

        let mut pixels = Vec::new();
        for y in y_lo..=y_hi {
            for x in x_lo..=x_hi {
                if !regions.iter().any(|r| r.contains(x, y)) {
                    continue;
                }
                let point = (x as f64, y as f64);
                if exclusions.iter().any(|poly| polygon_contains(poly, point)) {
                    continue;
                }
                if let Some(px) = frame.get_pixel(x as u32, y as u32) {
                    if self.is_skin(px) {
                        pixels.push(px);
                    }
                }
            }
        }
        Ok(pixels)
    }
}

/// Union bounding box of `regions` clipped to the frame
fn union_bounds(regions: &[RoiRect], frame: &VideoFrame) -> Option<(i64, i64, i64, i64)> {
    let x_lo = regions.iter().map(|r| r.left).min()?.max(0);
    let y_lo = regions.iter().map(|r| r.top).min()?.max(0);
    let x_hi = regions.iter().map(|r| r.right).max()?.min(frame.width as i64 - 1);
    let y_hi = regions.iter().map(|r| r.bottom).max()?.min(frame.height as i64 - 1);
    (x_lo <= x_hi && y_lo <= y_hi).then_some((x_lo, y_lo, x_hi, y_hi))
}

/// Even-odd point-in-polygon test; fewer than three vertices contain nothing
fn polygon_contains(polygon: &[(f64, f64)], (px, py): (f64, f64)) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for (i, &(xi, yi)) in polygon.iter().enumerate() {
        let (xj, yj) = polygon[j];
        if (yi > py) != (yj > py) && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    const SKIN: Rgb = [200, 150, 120];
    const NOT_SKIN: Rgb = [30, 60, 200];

    /// Landmarks spanning the box (x0, y0)..(x1, y1)
    fn face_box(x0: f32, y0: f32, x1: f32, y1: f32) -> FaceLandmarks {
        let mut points = vec![((x0 + x1) / 2.0, (y0 + y1) / 2.0); LANDMARK_COUNT];
        points[0] = (x0, y0);
        points[1] = (x1, y1);
        FaceLandmarks::new(points).unwrap()
    }

    #[test]
    fn test_landmark_count() {
        let err = FaceLandmarks::new(vec![(0.0, 0.0); 68]).unwrap_err();
        assert_eq!(
            err,
            RppgError::LandmarkCount {
                expected: LANDMARK_COUNT,
                actual: 68
            }
        );
    }

    #[test]
    fn test_skin_gate() {
        let extractor = RoiExtractor::default();
        assert!(extractor.is_skin(SKIN));
        assert!(!extractor.is_skin(NOT_SKIN));
        assert!(!extractor.is_skin([0, 0, 0]));
    }

    #[test]
    fn test_default_regions() {
        let extractor = RoiExtractor::default();
        let regions = extractor.regions(&face_box(0.0, 0.0, 100.0, 100.0));
        assert_eq!(
            regions[0],
            RoiRect {
                left: 25,
                top: 5,
                right: 75,
                bottom: 30
            }
        );
        assert_eq!(regions[1].left, 10);
        assert_eq!(regions[2].right, 90);
    }

    #[test]
    fn test_extract_counts_skin_inside_regions() {
        let mut frame = VideoFrame::filled(101, 101, SKIN);
        // Paint the forehead rectangle's top row non-skin
        for x in 25..=75 {
            frame.set_pixel(x, 5, NOT_SKIN);
        }

        let extractor = RoiExtractor::default();
        let pixels = extractor
            .extract(&frame, &face_box(0.0, 0.0, 100.0, 100.0))
            .unwrap();

        // forehead 51x26, cheeks 26x31 each, minus the painted row
        let expected = 51 * 26 + 2 * 26 * 31 - 51;
        assert_eq!(pixels.len(), expected);
        assert!(pixels.iter().all(|&px| px == SKIN));
    }

    #[test]
    fn test_extract_off_frame_face() {
        let frame = VideoFrame::filled(50, 50, SKIN);
        let pixels = RoiExtractor::default()
            .extract(&frame, &face_box(500.0, 500.0, 600.0, 600.0))
            .unwrap();
        assert!(pixels.is_empty());
    }

    #[test]
    fn test_forehead_only_preset() {
        let frame = VideoFrame::filled(101, 101, SKIN);
        let extractor = RoiExtractor::new(RoiConfig::forehead_only()).unwrap();
        let pixels = extractor
            .extract(&frame, &face_box(0.0, 0.0, 100.0, 100.0))
            .unwrap();
        assert_eq!(pixels.len(), 51 * 26);
    }

    #[test]
    fn test_non_finite_landmark_rejected() {
        let mut points = vec![(10.0, 10.0); LANDMARK_COUNT];
        points[7] = (f32::INFINITY, 10.0);
        assert_eq!(
            FaceLandmarks::new(points).unwrap_err(),
            RppgError::LandmarkCoordinate { index: 7 }
        );

        let mut points = vec![(10.0, 10.0); LANDMARK_COUNT];
        points[3] = (10.0, f32::NAN);
        assert!(FaceLandmarks::new(points).is_err());
    }

    #[test]
    fn test_extreme_landmarks_do_not_overflow() {
        let face = face_box(-f32::MAX, -f32::MAX, f32::MAX, f32::MAX);
        let (x_min, y_min, x_max, y_max) = face.bounds();
        assert!(x_min < 0 && y_min < 0 && x_max > 0 && y_max > 0);

        let frame = VideoFrame::filled(20, 20, SKIN);
        let extractor = RoiExtractor::default();
        assert_eq!(extractor.regions(&face).len(), 3);
        assert!(extractor.extract(&frame, &face).is_ok());
    }

    #[test]
    fn test_exclusion_polygon_removes_pixels() {
        let frame = VideoFrame::filled(101, 101, SKIN);
        let mut face = vec![(50.0, 50.0); LANDMARK_COUNT];
        face[0] = (0.0, 0.0);
        face[1] = (100.0, 100.0);
        // Square covering x 30..=40, y 10..=20 inside the forehead
        face[10] = (29.5, 9.5);
        face[11] = (40.5, 9.5);
        face[12] = (40.5, 20.5);
        face[13] = (29.5, 20.5);
        let face = FaceLandmarks::new(face).unwrap();

        let config = RoiConfig {
            exclusions: vec![vec![10, 11, 12, 13]],
            ..RoiConfig::forehead_only()
        };
        let pixels = RoiExtractor::new(config).unwrap().extract(&frame, &face).unwrap();
        assert_eq!(pixels.len(), 51 * 26 - 11 * 11);
    }

    #[test]
    fn test_mask_preset_and_validation() {
        let config = RoiConfig::mask_eyes_and_mouth();
        assert_eq!(config.exclusions.len(), 3);
        assert!(RoiExtractor::new(config).is_ok());

        let config = RoiConfig {
            exclusions: vec![vec![0, 1, LANDMARK_COUNT]],
            ..Default::default()
        };
        assert!(matches!(RoiExtractor::new(config), Err(RppgError::Config(_))));

        let config = RoiConfig {
            regions: vec![RelRect::new(0.0, f64::NAN, 1.0, 1.0)],
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(RoiConfig {
            regions: Vec::new(),
            ..Default::default()
        }
        .validate()
        .is_err());
    }
}
