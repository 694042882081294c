//! Blocking HTTP adapter for an external face embedding service.
//!
//! The service receives raw image bytes and answers with a JSON
//! embedding:
//!
//! ```text
//! POST {base_url}/embed
//! Content-Type: application/octet-stream
//!
//! 200 {"embedding": [0.01, -0.2, ...]}
//! 422 {"error": "no_face"}
//! ```

pub mod config;
pub mod http;

pub use config::ExtractorConfig;
pub use http::HttpExtractor;
