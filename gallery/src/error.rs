use thiserror::Error;

/// Errors surfaced by the external embedding extractor.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExtractError {
    /// The extractor could not locate or align a face in the image.
    #[error("no face detected")]
    NoFaceDetected,

    /// Infrastructure fault: model load failure, timeout, transport error,
    /// or a malformed response.
    #[error("extractor unavailable: {0}")]
    Unavailable(String),
}

/// Errors returned by gallery operations.
#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("gallery: invalid input: {0}")]
    InvalidInput(String),

    #[error("gallery: dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("gallery: identity not found: {0}")]
    NotFound(String),

    #[error("gallery: extraction failed for {source_ref:?}: {reason}")]
    ExtractionFailed {
        source_ref: String,
        #[source]
        reason: ExtractError,
    },

    #[error("gallery: no face detected")]
    NoFaceDetected,

    #[error("gallery: extractor unavailable: {0}")]
    ExtractorUnavailable(String),

    #[error("gallery: storage error: {0}")]
    Storage(String),
}

/// Result type for gallery operations.
pub type Result<T> = std::result::Result<T, GalleryError>;

impl GalleryError {
    /// Reports whether the caller can fix this by correcting the request.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::DimensionMismatch { .. })
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

impl From<ExtractError> for GalleryError {
    fn from(e: ExtractError) -> Self {
        match e {
            ExtractError::NoFaceDetected => GalleryError::NoFaceDetected,
            ExtractError::Unavailable(msg) => GalleryError::ExtractorUnavailable(msg),
        }
    }
}

impl From<faceid_kv::KVError> for GalleryError {
    fn from(e: faceid_kv::KVError) -> Self {
        GalleryError::Storage(e.to_string())
    }
}
