use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::config::check_threshold;
use crate::embedding::EmbeddingVector;
use crate::error::{GalleryError, Result};
use crate::record::EnrollmentRecord;
use crate::store::IdentityStore;

/// Outcome of a verification.
///
/// `matched` is true iff `identity` and `distance` are present and
/// `distance <= threshold`. On a no-match all optional fields are empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    /// Minimum distance over the records considered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,
    /// Provenance of the closest record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ref: Option<String>,
}

impl MatchResult {
    pub fn no_match() -> Self {
        Self {
            matched: false,
            identity: None,
            distance: None,
            source_ref: None,
        }
    }

    fn from_candidate(c: Candidate) -> Self {
        Self {
            matched: true,
            identity: Some(c.identity),
            distance: Some(c.distance),
            source_ref: Some(c.source_ref),
        }
    }
}

/// The closest record of one identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub identity: String,
    pub source_ref: String,
    pub distance: f32,
}

/// Nearest-record search over an [`IdentityStore`].
///
/// Brute force: every candidate record is compared. Ties keep the first
/// record encountered, in identity-name then enrollment order.
pub struct Matcher {
    store: Arc<IdentityStore>,
}

impl Matcher {
    pub fn new(store: Arc<IdentityStore>) -> Self {
        Self { store }
    }

    /// Matches `probe` against every enrolled record.
    /// An empty store yields a no-match, not an error.
    pub fn match_against_all(&self, probe: &EmbeddingVector, threshold: f32) -> Result<MatchResult> {
        self.check_probe(probe, threshold)?;
        let snap = self.store.all_records();
        let best = nearest(probe, snap.iter())?;
        Ok(decide(best, threshold))
    }

    /// Matches `probe` against one identity's records only.
    pub fn match_against_identity(
        &self,
        probe: &EmbeddingVector,
        identity: &str,
        threshold: f32,
    ) -> Result<MatchResult> {
        self.check_probe(probe, threshold)?;
        let entry = self.store.get(identity)?;
        let best = nearest(probe, entry.records().iter().map(|r| (entry.identity(), r)))?;
        Ok(decide(best, threshold))
    }

    /// Returns the closest record regardless of threshold, optionally
    /// restricted to one identity.
    pub fn nearest(&self, probe: &EmbeddingVector, scope: Option<&str>) -> Result<Option<Candidate>> {
        self.check_probe(probe, 0.0)?;
        match scope {
            Some(identity) => {
                let entry = self.store.get(identity)?;
                nearest(probe, entry.records().iter().map(|r| (entry.identity(), r)))
            }
            None => nearest(probe, self.store.all_records().iter()),
        }
    }

    /// Returns every identity whose closest record is within `threshold`,
    /// closest first, at most `limit` entries (0 = no limit).
    pub fn search(
        &self,
        probe: &EmbeddingVector,
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<Candidate>> {
        self.check_probe(probe, threshold)?;
        let snap = self.store.all_records();

        let mut hits = Vec::new();
        for entry in snap.entries() {
            let best = nearest(probe, entry.records().iter().map(|r| (entry.identity(), r)))?;
            if let Some(c) = best.filter(|c| c.distance <= threshold) {
                hits.push(c);
            }
        }
        // Stable sort keeps store order among equal distances.
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        if limit > 0 {
            hits.truncate(limit);
        }
        Ok(hits)
    }

    fn check_probe(&self, probe: &EmbeddingVector, threshold: f32) -> Result<()> {
        check_threshold(threshold)?;
        if probe.dim() != self.store.dim() {
            return Err(GalleryError::DimensionMismatch {
                expected: self.store.dim(),
                got: probe.dim(),
            });
        }
        Ok(())
    }
}

fn nearest<'a>(
    probe: &EmbeddingVector,
    records: impl Iterator<Item = (&'a str, &'a EnrollmentRecord)>,
) -> Result<Option<Candidate>> {
    let mut best: Option<(&str, &EnrollmentRecord, f32)> = None;
    for (identity, rec) in records {
        let d = probe.distance(&rec.vector)?;
        if best.is_none_or(|(_, _, min)| d < min) {
            best = Some((identity, rec, d));
        }
    }
    Ok(best.map(|(identity, rec, distance)| Candidate {
        identity: identity.to_string(),
        source_ref: rec.source_ref.clone(),
        distance,
    }))
}

fn decide(best: Option<Candidate>, threshold: f32) -> MatchResult {
    match best {
        Some(c) if c.distance <= threshold => {
            debug!(identity = %c.identity, distance = c.distance, threshold, "match");
            MatchResult::from_candidate(c)
        }
        Some(c) => {
            debug!(nearest = %c.identity, distance = c.distance, threshold, "no match");
            MatchResult::no_match()
        }
        None => {
            debug!("no match: no candidate records");
            MatchResult::no_match()
        }
    }
}
