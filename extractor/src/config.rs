use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Facenet512 output size.
pub const DEFAULT_DIMENSION: usize = 512;

/// Builder-style configuration for [`crate::HttpExtractor`].
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub dimension: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            dimension: DEFAULT_DIMENSION,
        }
    }
}

impl ExtractorConfig {
    /// Sets the service root. Trailing slashes are dropped; an empty
    /// value keeps the current one.
    pub fn with_base_url(mut self, url: &str) -> Self {
        let url = url.trim_end_matches('/');
        if !url.is_empty() {
            self.base_url = url.to_string();
        }
        self
    }

    /// Zero keeps the current timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.timeout = timeout;
        }
        self
    }

    /// Zero keeps the current dimension.
    pub fn with_dimension(mut self, dim: usize) -> Self {
        if dim != 0 {
            self.dimension = dim;
        }
        self
    }

    pub fn embed_url(&self) -> String {
        format!("{}/embed", self.base_url)
    }
}
