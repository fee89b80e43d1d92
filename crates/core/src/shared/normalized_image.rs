use ndarray::ArrayView3;

use crate::shared::face_region::FaceRegion;

/// Number of color channels every normalized image carries (RGB).
pub const CHANNELS: usize = 3;

/// A decoded, orientation-corrected image: contiguous RGB bytes in
/// row-major order.
///
/// Format conversion happens in the normalizer only; everything downstream
/// treats pixel data as a fixed `height × width × 3` array.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedImage {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl NormalizedImage {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * CHANNELS,
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// `(height, width, channels)` view over the pixel buffer.
    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("NormalizedImage data length must match dimensions")
    }

    /// Copies the pixels under `region`, clamped to the image bounds.
    ///
    /// Returns `None` when the clamped region has no area.
    pub fn crop(&self, region: &FaceRegion) -> Option<NormalizedImage> {
        let clamped = region.clamp_to(self.width, self.height)?;
        let x0 = clamped.x as usize;
        let y0 = clamped.y as usize;
        let w = clamped.width as usize;
        let h = clamped.height as usize;
        let stride = self.width as usize * CHANNELS;

        let mut pixels = Vec::with_capacity(w * h * CHANNELS);
        for row in y0..y0 + h {
            let start = row * stride + x0 * CHANNELS;
            pixels.extend_from_slice(&self.data[start..start + w * CHANNELS]);
        }
        Some(NormalizedImage::new(pixels, w as u32, h as u32))
    }

    fn shape(&self) -> (usize, usize, usize) {
        (self.height as usize, self.width as usize, CHANNELS)
    }
}
