//! In-memory catalog store: the test double, and the fallback when no
//! database is configured (results live for the process only).

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::catalog::{CatalogRecord, Domain};
use crate::error::StoreError;

use super::{BulkOutcome, CatalogStore, RecordPatch, StaleScope};

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<Domain, BTreeMap<String, CatalogRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record directly, bypassing upsert accounting. Test helper.
    pub async fn seed(&self, domain: Domain, record: CatalogRecord) {
        let mut inner = self.inner.lock().await;
        inner
            .entry(domain)
            .or_default()
            .insert(record.stable_id.clone(), record);
    }
}

/// Merge an incoming record over the stored one the way the bulk upsert
/// defines it: full replace, except membership unions and creation time
/// sticks.
fn merged(existing: &CatalogRecord, incoming: &CatalogRecord) -> CatalogRecord {
    let mut next = incoming.clone();
    next.created_at = existing.created_at;
    next.updated_at = existing.updated_at;
    next.modes = existing.modes.clone();
    for mode in &incoming.modes {
        next.add_mode(mode);
    }
    next
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list(
        &self,
        domain: Domain,
        only_active: bool,
    ) -> Result<Vec<CatalogRecord>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .get(&domain)
            .map(|records| {
                records
                    .values()
                    .filter(|r| !only_active || r.is_active)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn bulk_upsert(
        &self,
        domain: Domain,
        records: &[CatalogRecord],
    ) -> Result<BulkOutcome, StoreError> {
        let mut inner = self.inner.lock().await;
        let slot = inner.entry(domain).or_default();
        let mut outcome = BulkOutcome::default();
        let now = Utc::now();

        for record in records {
            if record.stable_id.is_empty() {
                continue;
            }
            match slot.get(&record.stable_id) {
                None => {
                    let mut fresh = record.clone();
                    fresh.created_at = Some(now);
                    fresh.updated_at = Some(now);
                    slot.insert(fresh.stable_id.clone(), fresh);
                    outcome.upserted += 1;
                }
                Some(existing) => {
                    let next = merged(existing, record);
                    if next != *existing {
                        let mut next = next;
                        next.updated_at = Some(now);
                        slot.insert(next.stable_id.clone(), next);
                        outcome.modified += 1;
                    }
                }
            }
        }
        Ok(outcome)
    }

    async fn deactivate_stale(
        &self,
        domain: Domain,
        scope: &StaleScope,
        keep: &HashSet<String>,
    ) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock().await;
        let Some(slot) = inner.get_mut(&domain) else {
            return Ok(0);
        };
        let now = Utc::now();
        let mut flipped = 0;
        for record in slot.values_mut() {
            if !record.is_active || keep.contains(&record.stable_id) {
                continue;
            }
            if let Some(mode) = scope.mode.as_deref() {
                if !record.has_mode(mode) {
                    continue;
                }
            }
            record.is_active = false;
            record.updated_at = Some(now);
            flipped += 1;
        }
        Ok(flipped)
    }

    async fn clear_membership(&self, domain: Domain, mode: &str) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock().await;
        let Some(slot) = inner.get_mut(&domain) else {
            return Ok(0);
        };
        let mut changed = 0;
        for record in slot.values_mut() {
            let before = record.modes.len();
            record.modes.retain(|m| m != mode);
            if record.modes.len() != before {
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn apply_patch(
        &self,
        domain: Domain,
        stable_id: &str,
        patch: &RecordPatch,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        let Some(record) = inner.get_mut(&domain).and_then(|slot| slot.get_mut(stable_id)) else {
            return Ok(false);
        };

        let mut changed = false;
        if let Some(icon) = &patch.icon {
            if record.refs.icon != *icon {
                record.refs.icon = icon.clone();
                changed = true;
            }
        }
        if let Some(icon_small) = &patch.icon_small {
            if record.refs.icon_small != *icon_small {
                record.refs.icon_small = icon_small.clone();
                changed = true;
            }
        }
        if let Some(icon_large) = &patch.icon_large {
            if record.refs.icon_large != *icon_large {
                record.refs.icon_large = icon_large.clone();
                changed = true;
            }
        }
        if let Some(is_active) = patch.is_active {
            if record.is_active != is_active {
                record.is_active = is_active;
                changed = true;
            }
        }
        if changed {
            record.updated_at = Some(Utc::now());
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, name: &str, mode: &str) -> CatalogRecord {
        let mut r = CatalogRecord::new(id, name);
        r.add_mode(mode);
        r
    }

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let store = MemoryStore::new();
        let batch = vec![record("7", "Fire Bolt", "hex_brawl")];

        let first = store.bulk_upsert(Domain::Augments, &batch).await.unwrap();
        assert_eq!(first, BulkOutcome { upserted: 1, modified: 0 });

        let second = store.bulk_upsert(Domain::Augments, &batch).await.unwrap();
        assert_eq!(second, BulkOutcome { upserted: 0, modified: 0 });
    }

    #[tokio::test]
    async fn upsert_counts_real_changes_only() {
        let store = MemoryStore::new();
        store
            .bulk_upsert(Domain::Augments, &[record("7", "Fire Bolt", "hex_brawl")])
            .await
            .unwrap();

        let mut renamed = record("7", "Fire Bolt II", "hex_brawl");
        renamed.tier = Some("gold".into());
        let outcome = store.bulk_upsert(Domain::Augments, &[renamed]).await.unwrap();
        assert_eq!(outcome, BulkOutcome { upserted: 0, modified: 1 });

        let stored = store.list(Domain::Augments, false).await.unwrap();
        assert_eq!(stored[0].display_name, "Fire Bolt II");
        assert!(stored[0].created_at.is_some());
    }

    #[tokio::test]
    async fn membership_grows_monotonically_across_syncs() {
        let store = MemoryStore::new();
        store
            .bulk_upsert(Domain::Augments, &[record("7", "Fire Bolt", "arena")])
            .await
            .unwrap();
        store
            .bulk_upsert(Domain::Augments, &[record("7", "Fire Bolt", "hex_brawl")])
            .await
            .unwrap();

        let stored = store.list(Domain::Augments, false).await.unwrap();
        assert_eq!(
            stored[0].modes,
            vec!["arena".to_string(), "hex_brawl".to_string()]
        );
    }

    #[tokio::test]
    async fn clear_membership_drops_exactly_one_tag() {
        let store = MemoryStore::new();
        let mut r = record("7", "Fire Bolt", "arena");
        r.add_mode("hex_brawl");
        store.seed(Domain::Augments, r).await;

        store
            .clear_membership(Domain::Augments, "hex_brawl")
            .await
            .unwrap();
        let stored = store.list(Domain::Augments, false).await.unwrap();
        assert_eq!(stored[0].modes, vec!["arena".to_string()]);
    }

    #[tokio::test]
    async fn deactivation_is_scoped_to_domain_and_mode() {
        let store = MemoryStore::new();
        store.seed(Domain::Augments, record("X1", "Old", "hex_brawl")).await;
        store.seed(Domain::Augments, record("X2", "Other Mode", "arena")).await;
        // Lexically colliding stable id in a different domain.
        store.seed(Domain::Items, record("X1", "Item", "sr")).await;

        let scope = StaleScope {
            mode: Some("hex_brawl".into()),
            version: Some("v2".into()),
        };
        let keep: HashSet<String> = HashSet::new();
        let flipped = store
            .deactivate_stale(Domain::Augments, &scope, &keep)
            .await
            .unwrap();
        assert_eq!(flipped, 1);

        let augments = store.list(Domain::Augments, false).await.unwrap();
        assert!(!augments.iter().find(|r| r.stable_id == "X1").unwrap().is_active);
        assert!(augments.iter().find(|r| r.stable_id == "X2").unwrap().is_active);

        let items = store.list(Domain::Items, false).await.unwrap();
        assert!(items[0].is_active, "other domain must be untouched");
    }

    #[tokio::test]
    async fn deactivation_spares_the_kept_batch() {
        let store = MemoryStore::new();
        store.seed(Domain::HexItems, record("1001", "Boots", "aram")).await;
        store.seed(Domain::HexItems, record("9999", "Removed", "aram")).await;

        let keep: HashSet<String> = ["1001".to_string()].into_iter().collect();
        let flipped = store
            .deactivate_stale(Domain::HexItems, &StaleScope::default(), &keep)
            .await
            .unwrap();
        assert_eq!(flipped, 1);

        let records = store.list(Domain::HexItems, true).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].stable_id, "1001");
    }

    #[tokio::test]
    async fn patch_reports_whether_anything_changed() {
        let store = MemoryStore::new();
        store.seed(Domain::Augments, record("7", "Fire Bolt", "hex_brawl")).await;

        let patch = RecordPatch {
            icon: Some("https://cdn.invalid/a.png".into()),
            ..RecordPatch::default()
        };
        assert!(store.apply_patch(Domain::Augments, "7", &patch).await.unwrap());
        assert!(!store.apply_patch(Domain::Augments, "7", &patch).await.unwrap());
        assert!(!store
            .apply_patch(Domain::Augments, "missing", &patch)
            .await
            .unwrap());
    }
}
