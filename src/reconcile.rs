//! Reconciliation: map a persisted record to its best match in a secondary
//! source when the two disagree on stable ids.
//!
//! Matching proposes a source of truth for patching fields on records that
//! already exist. It never creates records, which is what keeps providers
//! that disagree on identifiers from ever producing duplicate entries.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::catalog::keys::{icon_key, icon_key_of_refs, name_key};
use crate::catalog::CatalogRecord;
use crate::error::FetchError;
use crate::util::json::first_string;

/// One record from a secondary source, reduced to reconciliation fields.
#[derive(Debug, Clone, Default)]
pub struct SecondaryRecord {
    pub stable_id: String,
    pub name: String,
    pub icon_small: String,
    pub icon_large: String,
}

impl SecondaryRecord {
    fn from_raw(raw: &Value) -> Option<Self> {
        let name = first_string(raw, &["name", "nameTRA"])?;
        Some(Self {
            stable_id: first_string(raw, &["augmentId", "apiName", "id"]).unwrap_or_default(),
            name,
            icon_small: first_string(raw, &["iconSmall", "augmentSmallIconPath"])
                .unwrap_or_default(),
            icon_large: first_string(raw, &["iconLarge"]).unwrap_or_default(),
        })
    }

    pub fn icon_key(&self) -> String {
        let key = icon_key(&self.icon_large);
        if !key.is_empty() {
            return key;
        }
        icon_key(&self.icon_small)
    }
}

/// Index over a secondary source, keyed by stable id, name key, and icon key.
/// First occurrence wins per key.
#[derive(Debug, Default)]
pub struct SecondaryIndex {
    records: Vec<SecondaryRecord>,
    by_stable_id: HashMap<String, usize>,
    by_name_key: HashMap<String, usize>,
    by_icon_key: HashMap<String, usize>,
}

impl SecondaryIndex {
    pub fn from_records(records: Vec<SecondaryRecord>) -> Self {
        let mut index = SecondaryIndex {
            records,
            ..SecondaryIndex::default()
        };
        for (i, record) in index.records.iter().enumerate() {
            if !record.stable_id.is_empty() {
                index.by_stable_id.entry(record.stable_id.clone()).or_insert(i);
            }
            let nk = name_key(&record.name);
            if !nk.is_empty() {
                index.by_name_key.entry(nk).or_insert(i);
            }
            let ik = record.icon_key();
            if !ik.is_empty() {
                index.by_icon_key.entry(ik).or_insert(i);
            }
        }
        index
    }

    /// Build from a raw payload: a bare array or `{augments: [...]}`.
    pub fn from_payload(payload: &Value) -> Self {
        let list = payload
            .get("augments")
            .and_then(Value::as_array)
            .or_else(|| payload.as_array());
        let records = list
            .map(|items| items.iter().filter_map(SecondaryRecord::from_raw).collect())
            .unwrap_or_default();
        Self::from_records(records)
    }

    pub fn from_file(path: &Path) -> Result<Self, FetchError> {
        let raw = fs::read(path).map_err(|source| FetchError::File {
            path: path.to_path_buf(),
            source,
        })?;
        let payload: Value =
            serde_json::from_slice(&raw).map_err(|source| FetchError::FileDecode {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::from_payload(&payload))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Strict fallback cascade: stable id equality, then name key, then icon
    /// key. The first hit wins; later strategies are not consulted once an
    /// earlier one succeeds.
    pub fn find_match(&self, record: &CatalogRecord) -> Option<&SecondaryRecord> {
        if !record.stable_id.is_empty() {
            if let Some(&i) = self.by_stable_id.get(&record.stable_id) {
                return self.records.get(i);
            }
        }
        let nk = name_key(&record.display_name);
        if !nk.is_empty() {
            if let Some(&i) = self.by_name_key.get(&nk) {
                return self.records.get(i);
            }
        }
        let ik = icon_key_of_refs(&record.refs);
        if !ik.is_empty() {
            if let Some(&i) = self.by_icon_key.get(&ik) {
                return self.records.get(i);
            }
        }
        None
    }
}

/// Secondary index over an optional extra source, matched by name key only.
/// Used for sources that carry richer icon refs but unreliable ids.
#[derive(Debug, Default)]
pub struct ExtraIndex {
    records: Vec<SecondaryRecord>,
    by_name_key: HashMap<String, usize>,
}

impl ExtraIndex {
    pub fn from_payload(payload: &Value) -> Self {
        let list = payload
            .get("augments")
            .and_then(Value::as_array)
            .or_else(|| payload.as_array());
        let mut index = ExtraIndex::default();
        let Some(list) = list else {
            return index;
        };
        for raw in list {
            // Localized name takes priority here; these files are keyed the
            // way operators curate them, not the way the API spells them.
            let Some(name) = first_string(raw, &["nameTRA", "name"]) else {
                continue;
            };
            let nk = name_key(&name);
            if nk.is_empty() || index.by_name_key.contains_key(&nk) {
                continue;
            }
            let mut record = SecondaryRecord::from_raw(raw).unwrap_or_default();
            record.name = name;
            index.records.push(record);
            index.by_name_key.insert(nk, index.records.len() - 1);
        }
        index
    }

    /// None when the path is unset or the file does not exist; a present but
    /// unreadable file is an error.
    pub fn from_optional_file(path: Option<&Path>) -> Result<Option<Self>, FetchError> {
        let Some(path) = path else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read(path).map_err(|source| FetchError::File {
            path: path.to_path_buf(),
            source,
        })?;
        let payload: Value =
            serde_json::from_slice(&raw).map_err(|source| FetchError::FileDecode {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Some(Self::from_payload(&payload)))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn find_by_name(&self, display_name: &str) -> Option<&SecondaryRecord> {
        let nk = name_key(display_name);
        if nk.is_empty() {
            return None;
        }
        self.by_name_key.get(&nk).and_then(|&i| self.records.get(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn index() -> SecondaryIndex {
        SecondaryIndex::from_payload(&json!({
            "augments": [
                {"apiName": "Aug_FireBolt", "name": "Fire Bolt",
                 "iconLarge": "assets/ux/cherry/augments/icons/firebolt_large.png"},
                {"apiName": "Aug_Frost", "name": "Frost Ward",
                 "iconSmall": "assets/ux/cherry/augments/icons/frost_small.png"},
            ]
        }))
    }

    #[test]
    fn stable_id_match_wins_over_name_key() {
        let idx = index();
        // Same name as Frost Ward, but the stable id points at Fire Bolt.
        let mut record = CatalogRecord::new("Aug_FireBolt", "Frost Ward");
        record.refs.icon = String::new();
        let hit = idx.find_match(&record).unwrap();
        assert_eq!(hit.stable_id, "Aug_FireBolt");
    }

    #[test]
    fn name_key_match_bridges_divergent_ids() {
        let idx = index();
        let record = CatalogRecord::new("legacy-7", "fire bolt");
        let hit = idx.find_match(&record).unwrap();
        assert_eq!(hit.stable_id, "Aug_FireBolt");
    }

    #[test]
    fn icon_key_is_the_last_resort() {
        let idx = index();
        let mut record = CatalogRecord::new("legacy-9", "Renamed Entirely");
        record.refs.icon =
            "https://raw.communitydragon.org/14.23/game/assets/ux/cherry/augments/icons/frost_large.png"
                .into();
        let hit = idx.find_match(&record).unwrap();
        assert_eq!(hit.stable_id, "Aug_Frost");
    }

    #[test]
    fn no_key_match_yields_none() {
        let idx = index();
        let record = CatalogRecord::new("legacy-0", "Unknown");
        assert!(idx.find_match(&record).is_none());
    }

    #[test]
    fn first_occurrence_wins_per_key() {
        let idx = SecondaryIndex::from_payload(&json!([
            {"apiName": "Aug_A", "name": "Same Name"},
            {"apiName": "Aug_B", "name": "Same Name"},
        ]));
        let record = CatalogRecord::new("other", "Same Name");
        assert_eq!(idx.find_match(&record).unwrap().stable_id, "Aug_A");
    }

    #[test]
    fn extra_index_prefers_localized_names() {
        let extra = ExtraIndex::from_payload(&json!({
            "augments": [{"name": "Fire Bolt", "nameTRA": "烈焰冲击",
                          "augmentSmallIconPath": "https://host/icons/firebolt_small.png"}]
        }));
        assert!(extra.find_by_name("烈焰 冲击").is_some());
        assert!(extra.find_by_name("Fire Bolt").is_none());
    }
}
