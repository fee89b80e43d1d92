use thiserror::Error;

use crate::detection::domain::face_signature::FaceSignature;
use crate::shared::constants::MATCH_DISTANCE_THRESHOLD;
use crate::shared::face_region::FaceRegion;
use crate::shared::normalized_image::NormalizedImage;

/// Raised when a detected face cannot be turned into a [`FaceSignature`].
#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("degenerate face region {width}x{height} at ({x}, {y})")]
    DegenerateRegion {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },
    #[error("face encoder failed: {0}")]
    Model(String),
}

/// The face-recognition capability: detection, embedding, and comparison.
///
/// Implementations are shared across gallery worker threads, hence `&self`
/// and `Sync`. Errors are opaque here; [`FaceModelAdapter`] is the only
/// caller and turns them into typed errors.
///
/// [`FaceModelAdapter`]: crate::detection::domain::face_model_adapter::FaceModelAdapter
pub trait FaceModel: Send + Sync {
    /// Face locations in `image`, most confident first. Empty means no face.
    fn detect(&self, image: &NormalizedImage)
        -> Result<Vec<FaceRegion>, Box<dyn std::error::Error>>;

    /// Identity embedding of the face inside `region`.
    fn encode(
        &self,
        image: &NormalizedImage,
        region: &FaceRegion,
    ) -> Result<FaceSignature, Box<dyn std::error::Error>>;

    /// Same-person judgment at a fixed distance threshold.
    fn matches(&self, a: &FaceSignature, b: &FaceSignature) -> bool {
        a.distance(b) <= MATCH_DISTANCE_THRESHOLD
    }
}
