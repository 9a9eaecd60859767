use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Logical catalog a record lives in. Each domain has its own store scope and
/// its own local cache file; stable ids are unique within one domain only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Augments,
    Champions,
    Items,
    HexItems,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Augments => "augments",
            Domain::Champions => "champions",
            Domain::Items => "items",
            Domain::HexItems => "hex_items",
        }
    }

    /// Key under which a cache snapshot stores this domain's record list.
    pub fn cache_entity_key(&self) -> &'static str {
        match self {
            Domain::Augments => "augments",
            Domain::Champions => "champions",
            Domain::Items | Domain::HexItems => "items",
        }
    }

    /// Default cache file name under the cache directory.
    pub fn cache_file_name(&self) -> &'static str {
        match self {
            Domain::Augments => "augments.json",
            Domain::Champions => "champions.json",
            Domain::Items => "items.standard.json",
            Domain::HexItems => "items.hex_brawl.json",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named resource URL slots carried by every record. Values may be empty
/// (unknown), relative provider paths awaiting base resolution, or absolute
/// URLs, possibly pinned to a specific provider version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceRefs {
    #[serde(default)]
    pub icon: String,
    #[serde(default, rename = "iconSmall")]
    pub icon_small: String,
    #[serde(default, rename = "iconLarge")]
    pub icon_large: String,
}

impl ResourceRefs {
    pub fn is_empty(&self) -> bool {
        self.icon.is_empty() && self.icon_small.is_empty() && self.icon_large.is_empty()
    }
}

/// One canonical record shape for every synced domain (augments, champions,
/// items, hex-mode items). Field names serialize camelCase to match the JSON
/// the local cache files carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRecord {
    /// Provider-authoritative id; upsert key once normalization produced one.
    pub stable_id: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub refs: ResourceRefs,
    /// Normalized tier/rarity; None when the provider carries none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Membership: mode/domain tags. Grows monotonically per sync unless a
    /// refresh pass rebuilds exactly one tag.
    #[serde(default)]
    pub modes: Vec<String>,
    /// Provider version/patch the record was last confirmed against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Soft-delete flag; the pipeline deactivates, it never deletes.
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Provider-specific fields riding along with the canonical shape
    /// (champion title/aliases, item gold and build tree, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_active() -> bool {
    true
}

impl Default for CatalogRecord {
    fn default() -> Self {
        Self {
            stable_id: String::new(),
            display_name: String::new(),
            description: String::new(),
            refs: ResourceRefs::default(),
            tier: None,
            tags: Vec::new(),
            modes: Vec::new(),
            version: None,
            is_active: true,
            created_at: None,
            updated_at: None,
            extra: Map::new(),
        }
    }
}

impl CatalogRecord {
    pub fn new(stable_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            stable_id: stable_id.into(),
            display_name: display_name.into(),
            ..Self::default()
        }
    }

    /// Add a membership tag if absent, preserving existing order.
    pub fn add_mode(&mut self, mode: &str) {
        let mode = mode.trim();
        if mode.is_empty() {
            return;
        }
        if !self.modes.iter().any(|m| m == mode) {
            self.modes.push(mode.to_string());
        }
    }

    pub fn has_mode(&self, mode: &str) -> bool {
        self.modes.iter().any(|m| m == mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_camel_case_with_flattened_refs() {
        let mut record = CatalogRecord::new("Aug_FireBolt", "Fire Bolt");
        record.refs.icon = "https://example.invalid/icon.png".into();
        record.tier = Some("silver".into());

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["stableId"], "Aug_FireBolt");
        assert_eq!(value["displayName"], "Fire Bolt");
        assert_eq!(value["icon"], "https://example.invalid/icon.png");
        assert_eq!(value["isActive"], true);
    }

    #[test]
    fn unknown_fields_round_trip_through_extra() {
        let raw = serde_json::json!({
            "stableId": "1001",
            "displayName": "Boots",
            "gold": {"total": 300},
            "depth": 1
        });
        let record: CatalogRecord = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(record.extra["gold"]["total"], 300);
        assert_eq!(serde_json::to_value(&record).unwrap()["depth"], 1);
    }

    #[test]
    fn add_mode_is_idempotent() {
        let mut record = CatalogRecord::new("a", "A");
        record.add_mode("hex_brawl");
        record.add_mode("hex_brawl");
        record.add_mode("  ");
        assert_eq!(record.modes, vec!["hex_brawl".to_string()]);
    }
}
