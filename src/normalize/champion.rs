//! Champion normalization (Data Dragon `champion.json`).
//!
//! Unlike the arena dumps, Data Dragon's shape is stable, so this normalizer
//! deserializes a typed view instead of walking aliases.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::catalog::{CatalogRecord, ResourceRefs};
use crate::sources::ddragon;

#[derive(Debug, Deserialize)]
struct DdChampion {
    /// English id, e.g. `Neeko`.
    id: Option<String>,
    /// Numeric key as a string, e.g. `518`.
    key: Option<String>,
    name: Option<String>,
    title: Option<String>,
    blurb: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    image: Option<DdImage>,
    info: Option<DdInfo>,
}

#[derive(Debug, Deserialize)]
struct DdImage {
    full: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DdInfo {
    difficulty: Option<i64>,
}

/// Normalize one champion entry, pinning image URLs to `version` where the
/// CDN versions them. Returns None when id or name is missing.
pub fn normalize_champion(raw: &Value, version: &str) -> Option<CatalogRecord> {
    let champion: DdChampion = serde_json::from_value(raw.clone()).ok()?;

    let riot_id = champion.id.as_deref().map(str::trim).unwrap_or_default();
    let name = champion.name.as_deref().map(str::trim).unwrap_or_default();
    if riot_id.is_empty() || name.is_empty() {
        return None;
    }

    let square = champion
        .image
        .as_ref()
        .and_then(|img| img.full.as_deref())
        .map(|file| ddragon::champion_square_url(version, file))
        .unwrap_or_default();

    let mut record = CatalogRecord::new(riot_id, name);
    record.description = champion.blurb.unwrap_or_default();
    record.refs = ResourceRefs {
        icon: square,
        icon_small: ddragon::champion_loading_url(riot_id),
        icon_large: ddragon::champion_splash_url(riot_id),
    };
    record.tags = champion.tags;
    record.version = Some(version.to_string());

    // Alias set: every spelling a search may reasonably use.
    let mut aliases: Vec<String> = Vec::new();
    for candidate in [
        Some(name),
        champion.title.as_deref(),
        Some(riot_id),
        champion.key.as_deref(),
    ] {
        if let Some(text) = candidate.map(str::trim).filter(|t| !t.is_empty()) {
            if !aliases.iter().any(|a| a == text) {
                aliases.push(text.to_string());
            }
        }
    }

    record.extra.insert("aliases".into(), json!(aliases));
    if let Some(title) = champion.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        record.extra.insert("title".into(), json!(title));
    }
    if let Some(key) = champion.key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        record.extra.insert("riotKey".into(), json!(key));
    }
    let difficulty = champion
        .info
        .as_ref()
        .and_then(|info| info.difficulty)
        .unwrap_or(5);
    record.extra.insert("difficulty".into(), json!(difficulty));

    Some(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn neeko() -> Value {
        json!({
            "id": "Neeko",
            "key": "518",
            "name": "妮蔻",
            "title": "万花通灵",
            "blurb": "...",
            "tags": ["Mage", "Support"],
            "image": {"full": "Neeko.png"},
            "info": {"difficulty": 5}
        })
    }

    #[test]
    fn builds_versioned_and_unversioned_image_urls() {
        let record = normalize_champion(&neeko(), "15.1.1").unwrap();
        assert_eq!(record.stable_id, "Neeko");
        assert_eq!(
            record.refs.icon,
            "https://ddragon.leagueoflegends.com/cdn/15.1.1/img/champion/Neeko.png"
        );
        assert_eq!(
            record.refs.icon_large,
            "https://ddragon.leagueoflegends.com/cdn/img/champion/splash/Neeko_0.jpg"
        );
        assert_eq!(record.version.as_deref(), Some("15.1.1"));
    }

    #[test]
    fn alias_set_is_deduplicated_and_ordered() {
        let record = normalize_champion(&neeko(), "15.1.1").unwrap();
        assert_eq!(
            record.extra["aliases"],
            json!(["妮蔻", "万花通灵", "Neeko", "518"])
        );
        assert_eq!(record.extra["riotKey"], json!("518"));
    }

    #[test]
    fn drops_entries_missing_id_or_name() {
        assert!(normalize_champion(&json!({"name": "x"}), "1").is_none());
        assert!(normalize_champion(&json!({"id": "X"}), "1").is_none());
    }
}
