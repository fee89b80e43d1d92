use std::io::Cursor;

use image::DynamicImage;

use crate::imaging::domain::image_normalizer::{DecodeError, ImageNormalizer};
use crate::shared::normalized_image::NormalizedImage;

/// Decodes any format the `image` crate understands, applies the EXIF
/// orientation tag, and converts to 8-bit RGB.
///
/// Grayscale, palette, alpha and 16-bit inputs all come out as 3-channel
/// `u8` pixels; alpha is dropped rather than composited.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExifImageNormalizer;

impl ExifImageNormalizer {
    pub fn new() -> Self {
        Self
    }
}

impl ImageNormalizer for ExifImageNormalizer {
    fn normalize(&self, bytes: &[u8]) -> Result<NormalizedImage, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }

        let decoded =
            image::load_from_memory(bytes).map_err(|e| DecodeError::Format(e.to_string()))?;
        let oriented = apply_orientation(decoded, read_exif_orientation(bytes));
        let rgb = oriented.into_rgb8();

        let (width, height) = rgb.dimensions();
        if width == 0 || height == 0 {
            return Err(DecodeError::ZeroSized);
        }
        Ok(NormalizedImage::new(rgb.into_raw(), width, height))
    }
}

/// EXIF tag 0x0112 from the container, or 1 (upright) when absent/unreadable.
fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let Ok(metadata) = exif::Reader::new().read_from_container(&mut cursor) else {
        return 1;
    };
    metadata
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .unwrap_or(1)
}

/// Maps an EXIF orientation value to the transform that makes the image upright.
///
/// 1 = normal, 2 = mirrored, 3 = 180°, 4 = flipped vertically,
/// 5 = mirrored + 90° CW, 6 = 90° CW, 7 = mirrored + 270° CW, 8 = 270° CW.
fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}
