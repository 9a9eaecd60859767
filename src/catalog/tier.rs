//! Tier/rarity normalization.
//!
//! Providers spell the same three-tier scale several ways: numeric rarity
//! codes (0/1/2), the same codes as strings, and `kSilver`-style enum names.
//! Unrecognized spellings pass through unchanged so a new provider tier never
//! gets rejected at normalization time.

use serde_json::Value;

pub const TIER_SILVER: &str = "silver";
pub const TIER_GOLD: &str = "gold";
pub const TIER_PRISMATIC: &str = "prismatic";

/// Map a provider tier/rarity value onto the canonical scale.
/// Returns None when the value is absent, null, empty, or not a scalar.
pub fn normalize_tier(value: Option<&Value>) -> Option<String> {
    let value = value?;

    if let Some(code) = value.as_i64() {
        return Some(match code {
            0 => TIER_SILVER.to_string(),
            1 => TIER_GOLD.to_string(),
            2 => TIER_PRISMATIC.to_string(),
            other => other.to_string(),
        });
    }

    let text = value.as_str()?.trim();
    if text.is_empty() {
        return None;
    }

    match text {
        "0" => return Some(TIER_SILVER.to_string()),
        "1" => return Some(TIER_GOLD.to_string()),
        "2" => return Some(TIER_PRISMATIC.to_string()),
        _ => {}
    }

    // kSilver / Silver / SILVER all collapse onto the same canonical value.
    let lowered = text.to_lowercase();
    if lowered.contains(TIER_SILVER) {
        return Some(TIER_SILVER.to_string());
    }
    if lowered.contains(TIER_GOLD) {
        return Some(TIER_GOLD.to_string());
    }
    if lowered.contains(TIER_PRISMATIC) {
        return Some(TIER_PRISMATIC.to_string());
    }

    Some(text.to_string())
}
