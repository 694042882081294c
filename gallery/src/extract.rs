use std::sync::Arc;

use crate::embedding::EmbeddingVector;
use crate::error::{ExtractError, GalleryError, Result};

/// Computes face embeddings from raw image bytes.
///
/// This is the seam to the external model: the gallery never decodes
/// images itself. Implementations must be safe for concurrent use; calls
/// are blocking and may run in parallel across requests.
pub trait Extractor: Send + Sync {
    /// Returns the embedding of the single face in `image`.
    ///
    /// Fails with [`ExtractError::NoFaceDetected`] when no face can be
    /// located or aligned, and [`ExtractError::Unavailable`] for
    /// infrastructure faults.
    fn extract(&self, image: &[u8]) -> std::result::Result<Vec<f32>, ExtractError>;

    /// Returns the dimensionality of the embedding vectors (e.g., 512).
    fn dimension(&self) -> usize;
}

/// Input to verification or enrollment: image bytes, or a precomputed vector.
#[derive(Debug, Clone)]
pub enum Payload {
    Image(Vec<u8>),
    Vector(EmbeddingVector),
}

/// A probe to verify.
pub type Probe = Payload;

/// One enrollment input with its provenance.
#[derive(Debug, Clone)]
pub struct Source {
    pub source_ref: String,
    pub payload: Payload,
}

impl Source {
    pub fn image(source_ref: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            source_ref: source_ref.into(),
            payload: Payload::Image(bytes),
        }
    }

    pub fn vector(source_ref: impl Into<String>, vector: EmbeddingVector) -> Self {
        Self {
            source_ref: source_ref.into(),
            payload: Payload::Vector(vector),
        }
    }
}

/// Turns payloads into validated embeddings via an [`Extractor`].
pub struct Gateway {
    extractor: Arc<dyn Extractor>,
    dim: usize,
}

impl Gateway {
    /// Fails if the extractor's dimension differs from `dim`.
    pub fn new(extractor: Arc<dyn Extractor>, dim: usize) -> Result<Self> {
        if extractor.dimension() != dim {
            return Err(GalleryError::DimensionMismatch {
                expected: dim,
                got: extractor.dimension(),
            });
        }
        Ok(Self { extractor, dim })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Runs the extractor and validates its output.
    ///
    /// A vector of the wrong length or with zero magnitude is a fault of
    /// the extractor and is reported as unavailable.
    pub fn extract(&self, image: &[u8]) -> std::result::Result<EmbeddingVector, ExtractError> {
        let values = self.extractor.extract(image)?;
        if values.len() != self.dim {
            return Err(ExtractError::Unavailable(format!(
                "extractor returned {} values, expected {}",
                values.len(),
                self.dim
            )));
        }
        EmbeddingVector::new(values).map_err(|e| ExtractError::Unavailable(e.to_string()))
    }

    /// Resolves a payload to an embedding, checking vector dimensions.
    pub fn embed(&self, payload: &Payload) -> Result<EmbeddingVector> {
        match payload {
            Payload::Vector(v) => {
                self.check_dim(v)?;
                Ok(v.clone())
            }
            Payload::Image(bytes) if bytes.is_empty() => {
                Err(GalleryError::invalid("image is empty"))
            }
            Payload::Image(bytes) => Ok(self.extract(bytes)?),
        }
    }

    pub(crate) fn check_dim(&self, v: &EmbeddingVector) -> Result<()> {
        if v.dim() != self.dim {
            return Err(GalleryError::DimensionMismatch {
                expected: self.dim,
                got: v.dim(),
            });
        }
        Ok(())
    }
}
