use std::sync::Arc;

use crate::detection::domain::face_model::FaceModel;
use crate::detection::domain::face_model_adapter::FaceModelAdapter;
use crate::imaging::domain::image_normalizer::{DecodeError, ImageNormalizer};

/// Answers "are there people in this image?" without matching anyone.
pub struct CountFacesUseCase {
    normalizer: Arc<dyn ImageNormalizer>,
    model: FaceModelAdapter,
}

impl CountFacesUseCase {
    pub fn new(normalizer: Arc<dyn ImageNormalizer>, model: Arc<dyn FaceModel>) -> Self {
        Self {
            normalizer,
            model: FaceModelAdapter::new(model),
        }
    }

    pub fn execute(&self, bytes: &[u8]) -> Result<usize, DecodeError> {
        let image = self.normalizer.normalize(bytes)?;
        let regions = self.model.detect_faces(&image)?;
        Ok(regions.len())
    }
}
