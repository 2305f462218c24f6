//! Decoded video frames

use crate::sample::Rgb;
use crate::RppgError;

/// Decoded RGB video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Capture timestamp (nanoseconds)
    pub timestamp_ns: u64,
    /// Frame sequence number
    pub sequence: u32,
}

impl VideoFrame {
    /// Wrap raw RGB data, checking the buffer matches the dimensions
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        timestamp_ns: u64,
        sequence: u32,
    ) -> Result<Self, RppgError> {
        let frame = Self {
            data,
            width,
            height,
            timestamp_ns,
            sequence,
        };
        frame.check_geometry()?;
        Ok(frame)
    }

    /// Frame filled with a single colour
    pub fn filled(width: u32, height: u32, color: Rgb) -> Self {
        let data = color
            .iter()
            .copied()
            .cycle()
            .take(Self::expected_len(width, height))
            .collect();
        Self {
            data,
            width,
            height,
            timestamp_ns: 0,
            sequence: 0,
        }
    }

    fn expected_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 3
    }

    /// Verify `data` holds exactly `width * height` RGB pixels
    pub fn check_geometry(&self) -> Result<(), RppgError> {
        let expected = Self::expected_len(self.width, self.height);
        if self.data.len() != expected {
            return Err(RppgError::FrameGeometry {
                expected,
                actual: self.data.len(),
            });
        }
        Ok(())
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        let px = self.data.get(idx..idx + 3)?;
        Some([px[0], px[1], px[2]])
    }

    /// Set pixel at (x, y); out-of-bounds writes are ignored
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgb) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        if let Some(px) = self.data.get_mut(idx..idx + 3) {
            px.copy_from_slice(&color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_check() {
        assert!(VideoFrame::new(vec![0; 12], 2, 2, 0, 0).is_ok());
        assert_eq!(
            VideoFrame::new(vec![0; 11], 2, 2, 0, 0).unwrap_err(),
            RppgError::FrameGeometry {
                expected: 12,
                actual: 11
            }
        );
    }

    #[test]
    fn test_pixel_access() {
        let mut frame = VideoFrame::filled(4, 3, [10, 20, 30]);
        assert_eq!(frame.get_pixel(3, 2), Some([10, 20, 30]));
        assert_eq!(frame.get_pixel(4, 0), None);

        frame.set_pixel(1, 1, [1, 2, 3]);
        assert_eq!(frame.get_pixel(1, 1), Some([1, 2, 3]));
        assert_eq!(frame.get_pixel(0, 1), Some([10, 20, 30]));
    }
}
