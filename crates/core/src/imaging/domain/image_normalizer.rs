use thiserror::Error;

use crate::shared::normalized_image::NormalizedImage;

/// Raised when a payload cannot be turned into a usable [`NormalizedImage`].
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("image payload is empty")]
    Empty,
    #[error("image has zero width or height")]
    ZeroSized,
    #[error("undecodable image: {0}")]
    Format(String),
    #[error("face model could not read image: {0}")]
    Detection(String),
}

/// Domain interface for turning raw encoded bytes into canonical pixels.
///
/// Implementations must be pure: identical bytes yield identical images.
pub trait ImageNormalizer: Send + Sync {
    fn normalize(&self, bytes: &[u8]) -> Result<NormalizedImage, DecodeError>;
}
