//! Item normalization (Data Dragon `item.json`).
//!
//! The dataset is a map keyed by numeric id, so the id travels next to the
//! entry body. Map availability flags become membership tags; the hex-mode
//! variant keeps only the ARAM subset and rewrites classification for that
//! mode's economy.

use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::catalog::{CatalogRecord, ResourceRefs};
use crate::sources::ddragon;

/// Map id Summoner's Rift uses in `item.json`.
const MAP_SR: &str = "11";
/// Map id for Howling Abyss / ARAM.
const MAP_HA: &str = "12";

#[derive(Debug, Deserialize)]
struct DdItem {
    name: Option<String>,
    description: Option<String>,
    plaintext: Option<String>,
    image: Option<DdImage>,
    gold: Option<DdGold>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    maps: HashMap<String, bool>,
    depth: Option<i64>,
    #[serde(default)]
    from: Vec<String>,
    #[serde(default)]
    into: Vec<String>,
    #[serde(rename = "specialRecipe")]
    special_recipe: Option<i64>,
    group: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DdImage {
    full: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DdGold {
    total: Option<i64>,
    base: Option<i64>,
    sell: Option<i64>,
    purchasable: Option<bool>,
}

/// Normalize one standard item entry. Returns None when the name is missing.
pub fn normalize_item(id: &str, raw: &Value, version: &str) -> Option<CatalogRecord> {
    let item: DdItem = serde_json::from_value(raw.clone()).ok()?;

    let id = id.trim();
    let name = item.name.as_deref().map(str::trim).unwrap_or_default();
    if id.is_empty() || name.is_empty() {
        return None;
    }

    let icon = item
        .image
        .as_ref()
        .and_then(|img| img.full.as_deref())
        .map(|file| ddragon::item_image_url(version, file))
        .unwrap_or_default();

    let description = item.description.unwrap_or_default();
    // Map flags default to available unless the dataset says otherwise.
    let on_sr = item.maps.get(MAP_SR).copied().unwrap_or(true);
    let on_ha = item.maps.get(MAP_HA).copied().unwrap_or(true);

    let gold = item.gold.unwrap_or_default();
    let is_mythic = description.contains("神话");
    let is_legendary = description.contains("传说");
    let is_boots = item.tags.iter().any(|t| t == "Boots");

    let mut record = CatalogRecord::new(id, name);
    record.description = description;
    record.refs = ResourceRefs {
        icon,
        ..ResourceRefs::default()
    };
    record.tags = item.tags;
    record.version = Some(version.to_string());
    if on_sr {
        record.add_mode("sr");
    }
    if on_ha {
        record.add_mode("ha");
        record.add_mode("aram");
    }

    record.extra.insert(
        "plaintext".into(),
        json!(item.plaintext.unwrap_or_default()),
    );
    record.extra.insert(
        "gold".into(),
        json!({
            "total": gold.total.unwrap_or(0),
            "base": gold.base.unwrap_or(0),
            "sell": gold.sell.unwrap_or(0),
            "purchasable": gold.purchasable.unwrap_or(true),
        }),
    );
    record.extra.insert("depth".into(), json!(item.depth.unwrap_or(1)));
    record.extra.insert("from".into(), json!(item.from));
    record.extra.insert("into".into(), json!(item.into));
    record.extra.insert(
        "specialRecipe".into(),
        json!(item.special_recipe.unwrap_or(0)),
    );
    record.extra.insert(
        "group".into(),
        json!(item.group.unwrap_or_default()),
    );
    record.extra.insert("isMythic".into(), json!(is_mythic));
    record.extra.insert("isLegendary".into(), json!(is_legendary));
    record.extra.insert("isBoots".into(), json!(is_boots));

    Some(record)
}

/// Hex-brawl variant: the ARAM subset of the standard dataset, with the
/// mode's own legendary threshold (2000+ gold, excluding consumables and
/// trinkets) and a flattened build depth.
pub fn normalize_hex_item(id: &str, raw: &Value, version: &str) -> Option<CatalogRecord> {
    let mut record = normalize_item(id, raw, version)?;
    if !record.has_mode("aram") {
        return None;
    }

    let price_total = record
        .extra
        .get("gold")
        .and_then(|g| g.get("total"))
        .and_then(Value::as_i64)
        .unwrap_or(0);
    let excluded = record
        .tags
        .iter()
        .any(|t| t == "Consumable" || t == "Trinket");
    let is_legendary = price_total >= 2000 && !excluded;

    record.modes = vec!["aram".to_string()];
    record.extra.insert("isLegendary".into(), json!(is_legendary));
    record
        .extra
        .insert("depth".into(), json!(if is_legendary { 3 } else { 1 }));
    Some(record)
}
