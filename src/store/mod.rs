//! Catalog persistence seen through a narrow API.
//!
//! The pipeline never talks to the document store's query layer directly; it
//! writes through this trait, which keeps the jobs testable against the
//! in-memory implementation and the production path on Postgres.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::catalog::{CatalogRecord, Domain};
use crate::error::StoreError;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgCatalogStore;

/// Result of one bulk upsert. `upserted` counts new records, `modified`
/// counts existing records that actually changed; re-running with identical
/// input yields both at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    pub upserted: u64,
    pub modified: u64,
}

/// Which records a deactivation pass may touch: one domain, optionally
/// narrowed to one membership tag. `version` is what the surviving batch was
/// confirmed against, carried for logging and the records' own version field.
#[derive(Debug, Clone, Default)]
pub struct StaleScope {
    pub mode: Option<String>,
    pub version: Option<String>,
}

/// Partial update produced by the repair pass. `None` fields are left
/// untouched; an all-`None` patch is a no-op.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    pub icon: Option<String>,
    pub icon_small: Option<String>,
    pub icon_large: Option<String>,
    pub is_active: Option<bool>,
}

impl RecordPatch {
    pub fn is_empty(&self) -> bool {
        self.icon.is_none()
            && self.icon_small.is_none()
            && self.icon_large.is_none()
            && self.is_active.is_none()
    }
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Records in one domain, optionally restricted to active ones.
    async fn list(&self, domain: Domain, only_active: bool)
        -> Result<Vec<CatalogRecord>, StoreError>;

    /// Idempotent bulk upsert keyed by stable id. Membership merges as a set
    /// union; every other normalized field replaces the stored value.
    async fn bulk_upsert(
        &self,
        domain: Domain,
        records: &[CatalogRecord],
    ) -> Result<BulkOutcome, StoreError>;

    /// Soft-deactivate records in scope whose stable id is not in `keep`.
    /// Never touches records outside `domain` (or outside `scope.mode` when
    /// set). Returns how many records were flipped.
    async fn deactivate_stale(
        &self,
        domain: Domain,
        scope: &StaleScope,
        keep: &HashSet<String>,
    ) -> Result<u64, StoreError>;

    /// Remove one membership tag across a domain ahead of a rebuild. Tags
    /// other than `mode` are never dropped.
    async fn clear_membership(&self, domain: Domain, mode: &str) -> Result<u64, StoreError>;

    /// Partial field patch for one record; returns whether anything changed.
    async fn apply_patch(
        &self,
        domain: Domain,
        stable_id: &str,
        patch: &RecordPatch,
    ) -> Result<bool, StoreError>;
}
