//! Embedding-based identity gallery for face verification.
//!
//! Enrolled identities are stored as sets of face embeddings; a probe
//! embedding is matched against one identity or the whole gallery by
//! cosine distance. Embedding extraction is delegated to an [`Extractor`].
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use faceid_gallery::{Config, FaceService, MemoryBackend, Payload, Source};
//!
//! let svc = FaceService::new(Config::new(512), Box::new(MemoryBackend), extractor)?;
//!
//! svc.enroll("timothy", vec![Source::image("1.jpg", jpeg_bytes)])?;
//! let res = svc.verify(&Payload::Image(probe_bytes), None)?;
//! if res.matched {
//!     println!("{} at {}", res.identity.unwrap(), res.distance.unwrap());
//! }
//! ```
//!
//! # Design
//!
//! [`IdentityStore`] holds each identity's records as an immutable snapshot
//! that is swapped whole. An enrollment computes every embedding before it
//! writes, so a failed batch never changes the store. Durable storage is
//! pluggable through [`StoreBackend`]: [`MemoryBackend`], [`KvBackend`]
//! (msgpack documents in a key-value store such as redb), or
//! [`DirBackend`] (one directory per identity).

mod backend;
mod config;
mod dir_backend;
mod embedding;
mod enroll;
mod error;
mod extract;
mod kv_backend;
mod locks;
mod matcher;
pub mod naming;
mod record;
mod service;
mod store;

pub use backend::{MemoryBackend, StoreBackend};
pub use config::{Config, DEFAULT_THRESHOLD, UNKNOWN_IDENTITY};
pub use dir_backend::DirBackend;
pub use embedding::{cosine_distance, EmbeddingVector};
pub use enroll::{EnrollReceipt, Enroller};
pub use error::{ExtractError, GalleryError, Result};
pub use extract::{Extractor, Gateway, Payload, Probe, Source};
pub use kv_backend::KvBackend;
pub use matcher::{Candidate, MatchResult, Matcher};
pub use record::{EnrollmentRecord, IdentityEntry};
pub use service::FaceService;
pub use store::{IdentityStore, Snapshot};
