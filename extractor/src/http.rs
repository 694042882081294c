use faceid_gallery::{ExtractError, Extractor};
use serde::Deserialize;
use tracing::{debug, warn};
use ureq::Agent;

use crate::config::ExtractorConfig;

const NO_FACE: &str = "no_face";
const STATUS_UNPROCESSABLE: u16 = 422;

#[derive(Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embedding: Option<Vec<f32>>,
    #[serde(default)]
    error: Option<String>,
}

/// [`Extractor`] that posts image bytes to an embedding service.
///
/// Calls block the current thread until the service answers or the
/// configured timeout elapses.
pub struct HttpExtractor {
    agent: Agent,
    url: String,
    dim: usize,
}

impl HttpExtractor {
    pub fn new(cfg: ExtractorConfig) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(cfg.timeout))
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            agent,
            url: cfg.embed_url(),
            dim: cfg.dimension,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Extractor for HttpExtractor {
    fn extract(&self, image: &[u8]) -> Result<Vec<f32>, ExtractError> {
        let mut resp = self
            .agent
            .post(&self.url)
            .header("Content-Type", "application/octet-stream")
            .send(image)
            .map_err(|e| {
                warn!(url = %self.url, error = %e, "embedding request failed");
                ExtractError::Unavailable(e.to_string())
            })?;

        let status = resp.status().as_u16();
        let body = resp
            .body_mut()
            .read_to_string()
            .map_err(|e| ExtractError::Unavailable(format!("read response: {e}")))?;
        debug!(status, bytes = image.len(), "embedding response");
        decode_response(status, &body, self.dim)
    }

    fn dimension(&self) -> usize {
        self.dim
    }
}

/// Maps a status code and body onto an embedding or an [`ExtractError`].
pub(crate) fn decode_response(
    status: u16,
    body: &str,
    dim: usize,
) -> Result<Vec<f32>, ExtractError> {
    if status == STATUS_UNPROCESSABLE {
        return Err(ExtractError::NoFaceDetected);
    }

    let parsed: Option<EmbedResponse> = serde_json::from_str(body).ok();
    if let Some(EmbedResponse { error: Some(err), .. }) = &parsed {
        if err == NO_FACE {
            return Err(ExtractError::NoFaceDetected);
        }
    }

    if !(200..300).contains(&status) {
        return Err(ExtractError::Unavailable(format!("HTTP {status}: {body}")));
    }

    let resp = parsed.ok_or_else(|| ExtractError::Unavailable("malformed response body".into()))?;
    if let Some(err) = resp.error {
        return Err(ExtractError::Unavailable(format!("service error: {err}")));
    }
    let embedding = resp
        .embedding
        .ok_or_else(|| ExtractError::Unavailable("response has no embedding".into()))?;
    if embedding.len() != dim {
        return Err(ExtractError::Unavailable(format!(
            "service returned {} values, expected {dim}",
            embedding.len()
        )));
    }
    Ok(embedding)
}
