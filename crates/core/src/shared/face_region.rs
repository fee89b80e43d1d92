use serde::{Deserialize, Serialize};

/// A rectangular face location within a [`NormalizedImage`], in pixels.
///
/// Geometry comes straight from the detector and may extend past the image
/// edges; use [`FaceRegion::clamp_to`] before reading pixels.
///
/// [`NormalizedImage`]: crate::shared::normalized_image::NormalizedImage
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceRegion {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub confidence: f64,
}

impl FaceRegion {
    pub fn new(x: i32, y: i32, width: i32, height: i32, confidence: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            confidence,
        }
    }

    /// Intersects the region with a `frame_w × frame_h` image.
    ///
    /// Returns `None` when nothing of the region lies inside the image.
    pub fn clamp_to(&self, frame_w: u32, frame_h: u32) -> Option<FaceRegion> {
        let x1 = self.x.max(0);
        let y1 = self.y.max(0);
        let x2 = self.x.saturating_add(self.width).min(frame_w as i32);
        let y2 = self.y.saturating_add(self.height).min(frame_h as i32);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(FaceRegion {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
            confidence: self.confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(x: i32, y: i32, w: i32, h: i32) -> FaceRegion {
        FaceRegion::new(x, y, w, h, 0.9)
    }

    #[test]
    fn test_clamp_inside_is_unchanged() {
        let r = region(10, 10, 20, 20);
        assert_eq!(r.clamp_to(100, 100), Some(r));
    }

    #[test]
    fn test_clamp_past_left_and_bottom_edges() {
        let clamped = region(-10, 90, 30, 30).clamp_to(100, 100).unwrap();
        assert_eq!((clamped.x, clamped.y), (0, 90));
        assert_eq!((clamped.width, clamped.height), (20, 10));
    }

    #[test]
    fn test_clamp_fully_outside_is_none() {
        assert!(region(200, 200, 10, 10).clamp_to(100, 100).is_none());
        assert!(region(0, 0, 0, 10).clamp_to(100, 100).is_none());
    }
}
