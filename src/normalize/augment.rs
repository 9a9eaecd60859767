//! Arena augment normalization (CommunityDragon `cdragon/arena` payloads).
//!
//! Field names drift between the arena dump, the lol-game-data manifest, and
//! pool exports, so every target field walks an ordered alias table.

use serde_json::Value;

use crate::catalog::tier::normalize_tier;
use crate::catalog::{CatalogRecord, ResourceRefs};
use crate::sources::cdragon;
use crate::util::json::{first_string, non_null, string_list};

const STABLE_ID_FIELDS: &[&str] = &["augmentId", "apiName", "id"];
const NAME_FIELDS: &[&str] = &["name", "nameTRA"];
const DESCRIPTION_FIELDS: &[&str] = &["description", "desc", "tooltip"];
const ICON_FIELDS: &[&str] = &["icon", "iconLarge", "iconSmall", "augmentSmallIconPath"];

/// Normalize one raw augment. `mode` is added to the membership set on top of
/// whatever modes the payload itself names. Returns None when neither a
/// stable id nor a display name resolves.
pub fn normalize_augment(raw: &Value, mode: &str) -> Option<CatalogRecord> {
    let stable_id = first_string(raw, STABLE_ID_FIELDS)?;
    let display_name = first_string(raw, NAME_FIELDS)?;

    let description = first_string(raw, DESCRIPTION_FIELDS).unwrap_or_default();
    let icon = cdragon::resolve_icon_url(&first_string(raw, ICON_FIELDS).unwrap_or_default());
    let tier = normalize_tier(non_null(raw, "tier").or_else(|| non_null(raw, "rarity")));

    let mut record = CatalogRecord::new(stable_id, display_name);
    record.description = description;
    record.refs = ResourceRefs {
        icon,
        ..ResourceRefs::default()
    };
    record.tier = tier;
    record.tags = string_list(raw.get("tags"));
    for m in string_list(raw.get("modes")) {
        record.add_mode(&m);
    }
    record.add_mode(mode);
    Some(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_minimal_arena_entry() {
        let raw = json!({"id": "7", "name": "Fire Bolt", "rarity": 0});
        let record = normalize_augment(&raw, "hex_brawl").unwrap();
        assert_eq!(record.stable_id, "7");
        assert_eq!(record.display_name, "Fire Bolt");
        assert_eq!(record.tier.as_deref(), Some("silver"));
        assert_eq!(record.modes, vec!["hex_brawl".to_string()]);
    }

    #[test]
    fn stable_id_alias_cascade_prefers_augment_id() {
        let raw = json!({"augmentId": "Aug_A", "apiName": "Aug_B", "id": 3, "name": "A"});
        assert_eq!(normalize_augment(&raw, "m").unwrap().stable_id, "Aug_A");

        let raw = json!({"apiName": "Aug_B", "id": 3, "name": "A"});
        assert_eq!(normalize_augment(&raw, "m").unwrap().stable_id, "Aug_B");
    }

    #[test]
    fn localized_name_variant_is_accepted() {
        let raw = json!({"apiName": "Aug_C", "nameTRA": "烈焰冲击"});
        assert_eq!(normalize_augment(&raw, "m").unwrap().display_name, "烈焰冲击");
    }

    #[test]
    fn drops_when_neither_id_nor_name_resolves() {
        assert!(normalize_augment(&json!({"name": "No Id"}), "m").is_none());
        assert!(normalize_augment(&json!({"apiName": "Aug_NoName"}), "m").is_none());
        assert!(normalize_augment(&json!({}), "m").is_none());
    }

    #[test]
    fn relative_icon_paths_resolve_against_game_assets_base() {
        let raw = json!({
            "apiName": "Aug_D",
            "name": "D",
            "iconLarge": "assets/ux/cherry/augments/icons/d_large.png"
        });
        let record = normalize_augment(&raw, "m").unwrap();
        assert_eq!(
            record.refs.icon,
            "https://raw.communitydragon.org/latest/game/assets/ux/cherry/augments/icons/d_large.png"
        );
    }

    #[test]
    fn null_tier_falls_through_to_rarity() {
        let raw = json!({"apiName": "Aug_E", "name": "E", "tier": null, "rarity": 2});
        assert_eq!(
            normalize_augment(&raw, "m").unwrap().tier.as_deref(),
            Some("prismatic")
        );
    }

    #[test]
    fn payload_modes_merge_with_run_mode() {
        let raw = json!({"apiName": "Aug_F", "name": "F", "modes": ["arena", "hex_brawl"]});
        let record = normalize_augment(&raw, "hex_brawl").unwrap();
        assert_eq!(
            record.modes,
            vec!["arena".to_string(), "hex_brawl".to_string()]
        );
    }
}
