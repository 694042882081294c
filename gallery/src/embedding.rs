use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{GalleryError, Result};

/// A fixed-length face embedding. Immutable once constructed.
///
/// Construction rejects empty, non-finite, and zero-magnitude vectors, so
/// every distance computed between two embeddings of equal dimension is
/// well defined. Clones share the underlying buffer.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct EmbeddingVector {
    values: Arc<[f32]>,
    norm: f64,
}

impl EmbeddingVector {
    pub fn new(values: Vec<f32>) -> Result<Self> {
        if values.is_empty() {
            return Err(GalleryError::invalid("embedding is empty"));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(GalleryError::invalid("embedding contains non-finite values"));
        }
        let norm = squared_norm(&values).sqrt();
        if norm == 0.0 {
            return Err(GalleryError::invalid("embedding has zero magnitude"));
        }
        Ok(Self {
            values: values.into(),
            norm,
        })
    }

    /// Number of components.
    pub fn dim(&self) -> usize {
        self.values.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// Euclidean length, computed in f64.
    pub fn norm(&self) -> f64 {
        self.norm
    }

    /// Cosine distance to `other`: `1 - cos(self, other)`, in `[0, 2]`.
    ///
    /// Symmetric bit-for-bit, and exactly zero for equal vectors.
    pub fn distance(&self, other: &EmbeddingVector) -> Result<f32> {
        if self.dim() != other.dim() {
            return Err(GalleryError::DimensionMismatch {
                expected: self.dim(),
                got: other.dim(),
            });
        }
        if self.values == other.values {
            return Ok(0.0);
        }
        Ok(finish(dot(&self.values, &other.values), self.norm, other.norm))
    }
}

/// Cosine distance between two raw vectors.
///
/// Zero-magnitude vectors and dimension mismatches are errors.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(GalleryError::DimensionMismatch {
            expected: a.len(),
            got: b.len(),
        });
    }
    if a == b && !a.is_empty() && squared_norm(a) > 0.0 {
        return Ok(0.0);
    }
    let norm_a = squared_norm(a).sqrt();
    let norm_b = squared_norm(b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 || !norm_a.is_finite() || !norm_b.is_finite() {
        return Err(GalleryError::invalid("cannot compare zero-magnitude vectors"));
    }
    Ok(finish(dot(a, b), norm_a, norm_b))
}

fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| (x as f64) * (y as f64))
        .sum()
}

fn squared_norm(v: &[f32]) -> f64 {
    v.iter().map(|&x| (x as f64) * (x as f64)).sum()
}

fn finish(dot: f64, norm_a: f64, norm_b: f64) -> f32 {
    // Clamp to [-1, 1] to absorb rounding.
    let similarity = (dot / (norm_a * norm_b)).clamp(-1.0, 1.0);
    (1.0 - similarity) as f32
}

impl PartialEq for EmbeddingVector {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl AsRef<[f32]> for EmbeddingVector {
    fn as_ref(&self) -> &[f32] {
        &self.values
    }
}

impl TryFrom<Vec<f32>> for EmbeddingVector {
    type Error = GalleryError;

    fn try_from(values: Vec<f32>) -> Result<Self> {
        EmbeddingVector::new(values)
    }
}

impl From<EmbeddingVector> for Vec<f32> {
    fn from(v: EmbeddingVector) -> Self {
        v.values.to_vec()
    }
}

impl fmt::Debug for EmbeddingVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingVector")
            .field("dim", &self.dim())
            .field("norm", &self.norm)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(values: &[f32]) -> EmbeddingVector {
        EmbeddingVector::new(values.to_vec()).unwrap()
    }

    #[test]
    fn rejects_degenerate_vectors() {
        assert!(EmbeddingVector::new(vec![]).unwrap_err().is_invalid_input());
        assert!(EmbeddingVector::new(vec![0.0, 0.0]).unwrap_err().is_invalid_input());
        assert!(EmbeddingVector::new(vec![1.0, f32::NAN]).unwrap_err().is_invalid_input());
        assert!(EmbeddingVector::new(vec![f32::INFINITY, 0.0]).is_err());
    }

    #[test]
    fn identical_distance_is_zero() {
        let a = v(&[0.3, -1.7, 2.2, 0.01]);
        assert_eq!(a.distance(&a).unwrap(), 0.0);
        assert_eq!(a.distance(&a.clone()).unwrap(), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let pairs = [
            (v(&[1.0, 0.1, 0.0]), v(&[1.0, 0.0, 0.0])),
            (v(&[0.3, -0.2, 0.9]), v(&[-0.5, 0.4, 0.1])),
            (v(&[1e-3, 7.0, -2.5]), v(&[4.0, 4.0, 4.0])),
        ];
        for (a, b) in &pairs {
            assert_eq!(a.distance(b).unwrap(), b.distance(a).unwrap());
        }
    }

    #[test]
    fn known_distances() {
        let x = v(&[1.0, 0.0, 0.0]);
        let y = v(&[0.0, 1.0, 0.0]);
        let neg = v(&[-1.0, 0.0, 0.0]);
        assert!((x.distance(&y).unwrap() - 1.0).abs() < 1e-6);
        assert!((x.distance(&neg).unwrap() - 2.0).abs() < 1e-6);
        // Scale does not matter.
        assert!(x.distance(&v(&[5.0, 0.0, 0.0])).unwrap().abs() < 1e-6);
    }

    #[test]
    fn dimension_mismatch() {
        let err = v(&[1.0, 0.0]).distance(&v(&[1.0, 0.0, 0.0])).unwrap_err();
        assert!(matches!(err, GalleryError::DimensionMismatch { expected: 2, got: 3 }));
    }

    #[test]
    fn raw_cosine_distance() {
        assert!(cosine_distance(&[1.0, 0.0], &[0.0, 1.0]).unwrap() > 0.99);
        assert_eq!(cosine_distance(&[0.5, 0.5], &[0.5, 0.5]).unwrap(), 0.0);
        assert!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]).unwrap_err().is_invalid_input());
        assert!(cosine_distance(&[1.0], &[1.0, 0.0]).is_err());
    }

    #[test]
    fn serde_round_trip_validates() {
        let json = serde_json::to_string(&v(&[1.0, 2.0])).unwrap();
        assert_eq!(json, "[1.0,2.0]");
        let back: EmbeddingVector = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v(&[1.0, 2.0]));
        assert!(serde_json::from_str::<EmbeddingVector>("[0.0,0.0]").is_err());
    }
}
