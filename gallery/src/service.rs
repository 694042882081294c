use std::sync::Arc;

use crate::backend::StoreBackend;
use crate::config::Config;
use crate::enroll::{EnrollReceipt, Enroller};
use crate::error::Result;
use crate::extract::{Extractor, Gateway, Probe, Source};
use crate::matcher::{Candidate, MatchResult, Matcher};
use crate::store::IdentityStore;

/// Verify / enroll / list / delete, wired over one store and one extractor.
///
/// All collaborators are injected here; dropping the service closes the
/// store's backend.
pub struct FaceService {
    cfg: Config,
    store: Arc<IdentityStore>,
    gateway: Arc<Gateway>,
    matcher: Matcher,
    enroller: Enroller,
}

impl FaceService {
    pub fn new(
        cfg: Config,
        backend: Box<dyn StoreBackend>,
        extractor: Arc<dyn Extractor>,
    ) -> Result<Self> {
        let cfg = cfg.with_defaults()?;
        let store = Arc::new(IdentityStore::open(cfg.dim, backend)?);
        let gateway = Arc::new(Gateway::new(extractor, cfg.dim)?);
        let matcher = Matcher::new(Arc::clone(&store));
        let enroller = Enroller::new(Arc::clone(&store), Arc::clone(&gateway))
            .with_unknown_fallback(cfg.unknown_fallback);
        Ok(Self {
            cfg,
            store,
            gateway,
            matcher,
            enroller,
        })
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn store(&self) -> &Arc<IdentityStore> {
        &self.store
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Verifies `probe` against the whole gallery, or against `scope` only,
    /// using the configured threshold.
    pub fn verify(&self, probe: &Probe, scope: Option<&str>) -> Result<MatchResult> {
        self.verify_with_threshold(probe, scope, self.cfg.threshold)
    }

    pub fn verify_with_threshold(
        &self,
        probe: &Probe,
        scope: Option<&str>,
        threshold: f32,
    ) -> Result<MatchResult> {
        let vector = self.gateway.embed(probe)?;
        match scope {
            Some(identity) => self
                .matcher
                .match_against_identity(&vector, identity, threshold),
            None => self.matcher.match_against_all(&vector, threshold),
        }
    }

    /// Returns the closest enrolled record to `probe` regardless of
    /// threshold, optionally restricted to `scope`.
    pub fn nearest(&self, probe: &Probe, scope: Option<&str>) -> Result<Option<Candidate>> {
        let vector = self.gateway.embed(probe)?;
        self.matcher.nearest(&vector, scope)
    }

    /// Ranks identities within `threshold` of `probe`.
    pub fn search(&self, probe: &Probe, threshold: f32, limit: usize) -> Result<Vec<Candidate>> {
        let vector = self.gateway.embed(probe)?;
        self.matcher.search(&vector, threshold, limit)
    }

    pub fn enroll(&self, identity: &str, sources: Vec<Source>) -> Result<EnrollReceipt> {
        self.enroller.enroll(identity, sources)
    }

    /// Enrolls sources whose refs are `container/identity/file` paths.
    pub fn enroll_paths(&self, sources: Vec<Source>) -> Result<EnrollReceipt> {
        self.enroller.enroll_paths(sources)
    }

    pub fn list_identities(&self) -> Vec<String> {
        self.enroller.list_identities()
    }

    pub fn delete_identity(&self, identity: &str) -> Result<usize> {
        self.enroller.remove_identity(identity)
    }
}
