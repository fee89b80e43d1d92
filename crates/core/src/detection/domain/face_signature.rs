use serde::{Deserialize, Serialize};

/// Identity embedding of one detected face.
///
/// Stored L2-normalized so that cosine similarity is a plain dot product.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceSignature {
    values: Vec<f32>,
}

impl FaceSignature {
    /// Builds a signature from a raw embedding, normalizing it to unit length.
    pub fn from_embedding(mut values: Vec<f32>) -> Self {
        l2_normalize(&mut values);
        Self { values }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Cosine distance in `[0, 2]`; symmetric in its arguments.
    ///
    /// Signatures of different lengths or zero vectors are maximally distant.
    pub fn distance(&self, other: &FaceSignature) -> f64 {
        if self.values.len() != other.values.len() || self.is_zero() || other.is_zero() {
            return 2.0;
        }
        1.0 - cosine_similarity(&self.values, &other.values)
    }

    fn is_zero(&self) -> bool {
        self.values.iter().all(|v| *v == 0.0)
    }
}

pub fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Dot product of L2-normalized vectors equals cosine similarity.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_l2_normalize_unit_vector() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert_relative_eq!(v[0], 0.6, epsilon = 1e-6);
        assert_relative_eq!(v[1], 0.8, epsilon = 1e-6);
    }

    #[test]
    fn test_l2_normalize_zero_vector() {
        let mut v = vec![0.0, 0.0, 0.0];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_from_embedding_normalizes() {
        let sig = FaceSignature::from_embedding(vec![0.0, 10.0]);
        assert_eq!(sig.values(), &[0.0, 1.0]);
        assert_eq!(sig.len(), 2);
    }

    #[test]
    fn test_distance_identical_is_zero() {
        let a = FaceSignature::from_embedding(vec![0.3, 0.4, 0.5]);
        assert_relative_eq!(a.distance(&a), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_distance_orthogonal_is_one() {
        let a = FaceSignature::from_embedding(vec![1.0, 0.0]);
        let b = FaceSignature::from_embedding(vec![0.0, 1.0]);
        assert_relative_eq!(a.distance(&b), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_distance_opposite_is_two() {
        let a = FaceSignature::from_embedding(vec![1.0, 0.0]);
        let b = FaceSignature::from_embedding(vec![-1.0, 0.0]);
        assert_relative_eq!(a.distance(&b), 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = FaceSignature::from_embedding(vec![0.9, 0.1, 0.3]);
        let b = FaceSignature::from_embedding(vec![0.2, 0.7, 0.1]);
        assert_relative_eq!(a.distance(&b), b.distance(&a));
    }

    #[test]
    fn test_distance_length_mismatch_is_maximal() {
        let a = FaceSignature::from_embedding(vec![1.0, 0.0]);
        let b = FaceSignature::from_embedding(vec![1.0, 0.0, 0.0]);
        assert_relative_eq!(a.distance(&b), 2.0);
    }

    #[test]
    fn test_distance_zero_vector_is_maximal() {
        let a = FaceSignature::from_embedding(vec![0.0, 0.0]);
        assert_relative_eq!(a.distance(&a), 2.0);
    }
}
