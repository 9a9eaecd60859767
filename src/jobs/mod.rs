//! Per-domain sync jobs: fetch, normalize, and write one catalog domain.
//!
//! Jobs are synchronous pipelines per run; the only internal fan-out lives in
//! the icon repair job's probe pool. A job either returns a report or fails
//! whole; the scheduler catches failures and retries at the next tick.

use std::path::PathBuf;

use serde::Serialize;

use crate::util::env::env_opt;

pub mod augments;
pub mod champions;
pub mod icon_repair;
pub mod items;

pub use augments::{sync_augments, AugmentSyncOptions};
pub use champions::{sync_champions, ChampionSyncOptions};
pub use icon_repair::{repair_icons, IconRepairOptions};
pub use items::{sync_hex_items, sync_standard_items, HexItemSyncOptions, ItemSyncOptions};

/// Aggregate result of one domain sync.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub version: Option<String>,
    pub total: usize,
    pub upserted: u64,
    pub modified: u64,
    /// Records soft-deactivated by this run's scope.
    pub disabled: u64,
}

/// Aggregate result of one icon repair pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RepairReport {
    /// Entries in the secondary source index.
    pub source_total: usize,
    /// Entries in the optional extra index.
    pub extra_total: usize,
    /// Persisted records inspected.
    pub db_total: usize,
    /// Records the reconciliation cascade matched.
    pub matched: usize,
    /// Records with a computed (and, unless dry-run, persisted) patch.
    pub updated: usize,
    pub dry_run: bool,
    pub validated: bool,
}

/// Cache directory for domain snapshots; `CATALOG_CACHE_DIR` overrides.
pub fn cache_dir() -> PathBuf {
    env_opt("CATALOG_CACHE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/cache"))
}
