use std::sync::Arc;

use crate::detection::domain::face_model::{EncodingError, FaceModel};
use crate::detection::domain::face_signature::FaceSignature;
use crate::imaging::domain::image_normalizer::DecodeError;
use crate::shared::face_region::FaceRegion;
use crate::shared::isolation::run_isolated;
use crate::shared::normalized_image::NormalizedImage;

/// Failure boundary around a [`FaceModel`].
///
/// Every model call goes through here. Model errors and panics come out as
/// [`DecodeError`] (detection) or [`EncodingError`] (encoding) so the
/// classifier can apply one recovery policy per error kind.
#[derive(Clone)]
pub struct FaceModelAdapter {
    model: Arc<dyn FaceModel>,
}

impl FaceModelAdapter {
    pub fn new(model: Arc<dyn FaceModel>) -> Self {
        Self { model }
    }

    /// Faces in `image`, in the model's order. Empty is "no face", not an error.
    pub fn detect_faces(&self, image: &NormalizedImage) -> Result<Vec<FaceRegion>, DecodeError> {
        if image.is_empty() {
            return Err(DecodeError::ZeroSized);
        }
        match run_isolated(|| self.model.detect(image)) {
            Ok(Ok(regions)) => Ok(regions),
            Ok(Err(e)) => Err(DecodeError::Detection(e.to_string())),
            Err(panic) => Err(DecodeError::Detection(panic)),
        }
    }

    pub fn encode(
        &self,
        image: &NormalizedImage,
        region: &FaceRegion,
    ) -> Result<FaceSignature, EncodingError> {
        if region.clamp_to(image.width(), image.height()).is_none() {
            return Err(EncodingError::DegenerateRegion {
                x: region.x,
                y: region.y,
                width: region.width,
                height: region.height,
            });
        }
        let signature = match run_isolated(|| self.model.encode(image, region)) {
            Ok(Ok(signature)) => signature,
            Ok(Err(e)) => return Err(EncodingError::Model(e.to_string())),
            Err(panic) => return Err(EncodingError::Model(panic)),
        };
        if signature.is_empty() {
            return Err(EncodingError::Model("encoder returned an empty embedding".into()));
        }
        Ok(signature)
    }

    /// Same-person test. A match needs the model to agree in both argument
    /// orders, so the result is symmetric even for a model that is not. A
    /// comparison that panics is a non-match.
    pub fn matches(&self, a: &FaceSignature, b: &FaceSignature) -> bool {
        run_isolated(|| self.model.matches(a, b) && self.model.matches(b, a)).unwrap_or(false)
    }
}
