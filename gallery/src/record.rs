use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::embedding::EmbeddingVector;
use crate::error::{GalleryError, Result};

/// One embedding enrolled for one identity, with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub identity: String,
    pub vector: EmbeddingVector,
    /// Opaque provenance, e.g. the original file name.
    pub source_ref: String,
    pub enrolled_at: DateTime<Utc>,
}

impl EnrollmentRecord {
    pub fn new(
        identity: impl Into<String>,
        source_ref: impl Into<String>,
        vector: EmbeddingVector,
    ) -> Self {
        Self::at(identity, source_ref, vector, Utc::now())
    }

    pub fn at(
        identity: impl Into<String>,
        source_ref: impl Into<String>,
        vector: EmbeddingVector,
        enrolled_at: DateTime<Utc>,
    ) -> Self {
        Self {
            identity: identity.into(),
            vector,
            source_ref: source_ref.into(),
            enrolled_at,
        }
    }
}

/// The full record set of one identity.
///
/// Never empty; every record carries the entry's identity; source refs are
/// unique within the entry.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityEntry {
    identity: String,
    records: Vec<EnrollmentRecord>,
}

impl IdentityEntry {
    pub fn new(identity: impl Into<String>, records: Vec<EnrollmentRecord>) -> Result<Self> {
        let identity = identity.into();
        if records.is_empty() {
            return Err(GalleryError::invalid(format!(
                "identity {identity:?} needs at least one record"
            )));
        }
        let mut seen = HashSet::with_capacity(records.len());
        for rec in &records {
            if rec.identity != identity {
                return Err(GalleryError::invalid(format!(
                    "record {:?} belongs to {:?}, not {identity:?}",
                    rec.source_ref, rec.identity
                )));
            }
            if rec.source_ref.is_empty() {
                return Err(GalleryError::invalid("record source ref is empty"));
            }
            if !seen.insert(rec.source_ref.as_str()) {
                return Err(GalleryError::invalid(format!(
                    "duplicate source ref {:?} for {identity:?}",
                    rec.source_ref
                )));
            }
        }
        Ok(Self { identity, records })
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Records in enrollment order.
    pub fn records(&self) -> &[EnrollmentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always false for a constructed entry.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
