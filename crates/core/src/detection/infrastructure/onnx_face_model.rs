use std::path::Path;

use crate::detection::domain::face_model::FaceModel;
use crate::detection::domain::face_signature::FaceSignature;
use crate::shared::face_region::FaceRegion;
use crate::shared::model_resolver::{ModelResolver, ProgressFn, DETECTION_MODEL, EMBEDDING_MODEL};
use crate::shared::normalized_image::NormalizedImage;

use super::arcface_encoder::ArcFaceEncoder;
use super::onnx_yolo_detector::OnnxYoloDetector;

/// [`FaceModel`] backed by a YOLO face detector and an ArcFace encoder.
///
/// Matching uses the trait's default cosine-distance threshold.
pub struct OnnxFaceModel {
    detector: OnnxYoloDetector,
    encoder: ArcFaceEncoder,
}

impl OnnxFaceModel {
    pub fn new(
        detection_model: &Path,
        embedding_model: &Path,
        confidence: f64,
        intra_threads: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            detector: OnnxYoloDetector::new(detection_model, confidence, intra_threads)?,
            encoder: ArcFaceEncoder::new(embedding_model, intra_threads)?,
        })
    }

    /// Resolves both model files (downloading if needed) and loads them.
    pub fn load(
        resolver: &ModelResolver,
        confidence: f64,
        intra_threads: usize,
        progress: Option<fn(u64, u64)>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let callback = || progress.map(|f| Box::new(f) as ProgressFn);
        let detection_path = resolver.resolve(&DETECTION_MODEL, callback())?;
        let embedding_path = resolver.resolve(&EMBEDDING_MODEL, callback())?;
        log::info!(
            "Loading face models: {} + {}",
            detection_path.display(),
            embedding_path.display()
        );
        Self::new(&detection_path, &embedding_path, confidence, intra_threads)
    }
}

impl FaceModel for OnnxFaceModel {
    fn detect(
        &self,
        image: &NormalizedImage,
    ) -> Result<Vec<FaceRegion>, Box<dyn std::error::Error>> {
        self.detector.detect(image)
    }

    fn encode(
        &self,
        image: &NormalizedImage,
        region: &FaceRegion,
    ) -> Result<FaceSignature, Box<dyn std::error::Error>> {
        let crop = image
            .crop(region)
            .ok_or("Face region lies outside the image")?;
        let embedding = self.encoder.embed(&crop)?;
        Ok(FaceSignature::from_embedding(embedding))
    }
}
