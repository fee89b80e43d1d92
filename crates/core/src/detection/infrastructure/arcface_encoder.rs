/// ArcFace identity encoder using ONNX Runtime.
///
/// Produces a 512-d embedding per face crop; the caller L2-normalizes it
/// into a `FaceSignature`.
use std::path::Path;
use std::sync::Mutex;

use crate::shared::normalized_image::NormalizedImage;

use super::session_builder::{build_session, lock_session};

const INPUT_SIZE: usize = 112;
const NORM_MEAN: f32 = 127.5;
const NORM_STD: f32 = 127.5;

pub struct ArcFaceEncoder {
    session: Mutex<ort::session::Session>,
}

impl ArcFaceEncoder {
    pub fn new(model_path: &Path, intra_threads: usize) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            session: Mutex::new(build_session(model_path, intra_threads)?),
        })
    }

    /// Raw embedding of an already-cropped face.
    pub fn embed(&self, crop: &NormalizedImage) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
        if crop.is_empty() {
            return Err("Cannot embed an empty crop".into());
        }
        let tensor = preprocess(crop);
        let input_value = ort::value::Tensor::from_array(tensor)?;
        let mut session = lock_session(&self.session);
        let outputs = session.run(ort::inputs![input_value])?;
        let embedding_array = outputs[0].try_extract_array::<f32>()?;
        let embedding = embedding_array
            .as_slice()
            .ok_or("Cannot get embedding slice")?
            .to_vec();
        if embedding.iter().any(|v| !v.is_finite()) {
            return Err("Embedding contains non-finite values".into());
        }
        Ok(embedding)
    }
}

/// Resize crop to 112x112 (nearest neighbour), normalize, NCHW layout.
fn preprocess(crop: &NormalizedImage) -> ndarray::Array4<f32> {
    let src_w = crop.width() as usize;
    let src_h = crop.height() as usize;
    let src = crop.as_ndarray();

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, INPUT_SIZE, INPUT_SIZE));
    for y in 0..INPUT_SIZE {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / INPUT_SIZE as f64) as usize).min(src_h - 1);
        for x in 0..INPUT_SIZE {
            let src_x =
                (((x as f64 + 0.5) * src_w as f64 / INPUT_SIZE as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, y, x]] = (src[[src_y, src_x, c]] as f32 - NORM_MEAN) / NORM_STD;
            }
        }
    }
    tensor
}
