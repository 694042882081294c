use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::UNKNOWN_IDENTITY;
use crate::error::{GalleryError, Result};
use crate::extract::{Gateway, Payload, Source};
use crate::naming::{derive_identity, file_name, validate_identity};
use crate::record::EnrollmentRecord;
use crate::store::IdentityStore;

/// Confirmation of a successful enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrollReceipt {
    pub identity: String,
    pub records: usize,
}

/// Adds, replaces, and removes identities.
///
/// An enrollment computes every embedding before touching the store, so a
/// failing source leaves the identity's previous records untouched.
pub struct Enroller {
    store: Arc<IdentityStore>,
    gateway: Arc<Gateway>,
    unknown_fallback: bool,
}

impl Enroller {
    pub fn new(store: Arc<IdentityStore>, gateway: Arc<Gateway>) -> Self {
        Self {
            store,
            gateway,
            unknown_fallback: false,
        }
    }

    /// Enroll under `"unknown"` when path derivation fails.
    pub fn with_unknown_fallback(mut self, enabled: bool) -> Self {
        self.unknown_fallback = enabled;
        self
    }

    /// Replaces `identity`'s records with one record per source.
    pub fn enroll(&self, identity: &str, sources: Vec<Source>) -> Result<EnrollReceipt> {
        validate_identity(identity)?;
        if sources.is_empty() {
            return Err(GalleryError::invalid("enrollment needs at least one source"));
        }
        let mut seen = HashSet::with_capacity(sources.len());
        for src in &sources {
            if src.source_ref.is_empty() {
                return Err(GalleryError::invalid("source ref is empty"));
            }
            if !seen.insert(src.source_ref.as_str()) {
                return Err(GalleryError::invalid(format!(
                    "duplicate source ref {:?}",
                    src.source_ref
                )));
            }
        }

        let enrolled_at = Utc::now();
        let mut records = Vec::with_capacity(sources.len());
        for src in sources {
            let vector = match &src.payload {
                Payload::Vector(v) => {
                    self.gateway.check_dim(v)?;
                    v.clone()
                }
                Payload::Image(bytes) if bytes.is_empty() => {
                    return Err(GalleryError::invalid(format!(
                        "image {:?} is empty",
                        src.source_ref
                    )));
                }
                Payload::Image(bytes) => match self.gateway.extract(bytes) {
                    Ok(v) => v,
                    Err(reason) => {
                        warn!(identity, source_ref = %src.source_ref, %reason, "enrollment aborted");
                        return Err(GalleryError::ExtractionFailed {
                            source_ref: src.source_ref,
                            reason,
                        });
                    }
                },
            };
            records.push(EnrollmentRecord::at(identity, src.source_ref, vector, enrolled_at));
        }

        let entry = self.store.put(identity, records)?;
        info!(identity, records = entry.len(), "enrolled");
        Ok(EnrollReceipt {
            identity: identity.to_string(),
            records: entry.len(),
        })
    }

    /// Enrolls sources whose refs are `container/identity/file` paths.
    ///
    /// Every path must name the same identity; records keep only the file
    /// name as their source ref.
    pub fn enroll_paths(&self, sources: Vec<Source>) -> Result<EnrollReceipt> {
        if sources.is_empty() {
            return Err(GalleryError::invalid("enrollment needs at least one source"));
        }

        let mut identity: Option<String> = None;
        for src in &sources {
            let derived = match derive_identity(&src.source_ref) {
                Ok(name) => name,
                Err(_) if self.unknown_fallback => {
                    warn!(path = %src.source_ref, "identity not derivable, using fallback");
                    UNKNOWN_IDENTITY.to_string()
                }
                Err(e) => return Err(e),
            };
            match &identity {
                None => identity = Some(derived),
                Some(first) if *first != derived => {
                    return Err(GalleryError::invalid(format!(
                        "batch mixes identities {first:?} and {derived:?}"
                    )));
                }
                Some(_) => {}
            }
        }
        let identity = identity.unwrap_or_else(|| UNKNOWN_IDENTITY.to_string());

        let renamed = sources
            .into_iter()
            .map(|src| {
                Ok(Source {
                    source_ref: file_name(&src.source_ref)?.to_string(),
                    payload: src.payload,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        self.enroll(&identity, renamed)
    }

    /// Deletes `identity`. Returns the number of records removed.
    pub fn remove_identity(&self, identity: &str) -> Result<usize> {
        self.store.remove(identity)
    }

    pub fn list_identities(&self) -> Vec<String> {
        self.store.list_identities()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingVector;
    use crate::error::ExtractError;
    use crate::extract::Extractor;

    /// Reads the image bytes as "x,y"; "noface" and "down" simulate failures.
    struct TextExtractor;

    impl Extractor for TextExtractor {
        fn extract(&self, image: &[u8]) -> std::result::Result<Vec<f32>, ExtractError> {
            match image {
                b"noface" => Err(ExtractError::NoFaceDetected),
                b"down" => Err(ExtractError::Unavailable("model not loaded".into())),
                _ => Ok(std::str::from_utf8(image)
                    .unwrap()
                    .split(',')
                    .map(|s| s.parse().unwrap())
                    .collect()),
            }
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    fn enroller() -> (Arc<IdentityStore>, Enroller) {
        let store = Arc::new(IdentityStore::in_memory(2).unwrap());
        let gateway = Arc::new(Gateway::new(Arc::new(TextExtractor), 2).unwrap());
        (Arc::clone(&store), Enroller::new(store, gateway))
    }

    fn refs(store: &IdentityStore, identity: &str) -> Vec<String> {
        store
            .get(identity)
            .unwrap()
            .records()
            .iter()
            .map(|r| r.source_ref.clone())
            .collect()
    }

    #[test]
    fn enroll_images_and_vectors() {
        let (store, e) = enroller();
        let receipt = e
            .enroll(
                "alice",
                vec![
                    Source::image("a.jpg", b"1,0".to_vec()),
                    Source::vector("b.vec", EmbeddingVector::new(vec![0.0, 1.0]).unwrap()),
                ],
            )
            .unwrap();
        assert_eq!(
            receipt,
            EnrollReceipt {
                identity: "alice".into(),
                records: 2
            }
        );
        assert_eq!(refs(&store, "alice"), vec!["a.jpg", "b.vec"]);
        let entry = store.get("alice").unwrap();
        assert_eq!(entry.records()[0].enrolled_at, entry.records()[1].enrolled_at);
    }

    #[test]
    fn reenroll_replaces() {
        let (store, e) = enroller();
        e.enroll("alice", vec![Source::image("1", b"1,0".to_vec()), Source::image("2", b"1,1".to_vec())])
            .unwrap();
        e.enroll("alice", vec![Source::image("3", b"0,1".to_vec())]).unwrap();
        assert_eq!(refs(&store, "alice"), vec!["3"]);
    }

    #[test]
    fn failed_source_leaves_prior_state() {
        let (store, e) = enroller();
        e.enroll("alice", vec![Source::image("old.jpg", b"1,0".to_vec())]).unwrap();

        let err = e
            .enroll(
                "alice",
                vec![
                    Source::image("new1.jpg", b"0,1".to_vec()),
                    Source::image("bad.jpg", b"noface".to_vec()),
                ],
            )
            .unwrap_err();
        match err {
            GalleryError::ExtractionFailed { source_ref, reason } => {
                assert_eq!(source_ref, "bad.jpg");
                assert_eq!(reason, ExtractError::NoFaceDetected);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(refs(&store, "alice"), vec!["old.jpg"]);

        let err = e
            .enroll("bob", vec![Source::image("x.jpg", b"down".to_vec())])
            .unwrap_err();
        assert!(matches!(
            err,
            GalleryError::ExtractionFailed { reason: ExtractError::Unavailable(_), .. }
        ));
        assert!(matches!(store.get("bob"), Err(GalleryError::NotFound(_))));
    }

    #[test]
    fn rejects_bad_batches() {
        let (store, e) = enroller();
        assert!(e.enroll("alice", vec![]).unwrap_err().is_invalid_input());
        assert!(e
            .enroll("", vec![Source::image("a", b"1,0".to_vec())])
            .unwrap_err()
            .is_invalid_input());
        assert!(e
            .enroll(
                "alice",
                vec![Source::image("a", b"1,0".to_vec()), Source::image("a", b"0,1".to_vec())]
            )
            .unwrap_err()
            .is_invalid_input());
        assert!(e
            .enroll("alice", vec![Source::image("a", vec![])])
            .unwrap_err()
            .is_invalid_input());
        assert!(store.is_empty());
    }

    #[test]
    fn enroll_paths_derives_identity() {
        let (store, e) = enroller();
        let receipt = e
            .enroll_paths(vec![
                Source::image("face_data/timothy/1.jpg", b"1,0".to_vec()),
                Source::image("face_data/timothy/2.jpg", b"1,1".to_vec()),
            ])
            .unwrap();
        assert_eq!(receipt.identity, "timothy");
        assert_eq!(refs(&store, "timothy"), vec!["1.jpg", "2.jpg"]);
    }

    #[test]
    fn enroll_paths_rejects_underivable_and_mixed() {
        let (store, e) = enroller();
        assert!(e
            .enroll_paths(vec![Source::image("1.jpg", b"1,0".to_vec())])
            .unwrap_err()
            .is_invalid_input());
        assert!(e
            .enroll_paths(vec![
                Source::image("d/alice/1.jpg", b"1,0".to_vec()),
                Source::image("d/bob/2.jpg", b"0,1".to_vec()),
            ])
            .unwrap_err()
            .is_invalid_input());
        assert!(store.list_identities().is_empty());
    }

    #[test]
    fn unknown_fallback_is_opt_in() {
        let (store, e) = enroller();
        let e = e.with_unknown_fallback(true);
        let receipt = e
            .enroll_paths(vec![Source::image("loose.jpg", b"1,0".to_vec())])
            .unwrap();
        assert_eq!(receipt.identity, UNKNOWN_IDENTITY);
        assert_eq!(e.list_identities(), vec![UNKNOWN_IDENTITY]);
        assert_eq!(e.remove_identity(UNKNOWN_IDENTITY).unwrap(), 1);
        assert!(store.is_empty());
    }
}
