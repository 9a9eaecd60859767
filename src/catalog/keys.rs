//! Derived lookup keys used for reconciliation when stable ids disagree
//! across sources.

use std::sync::OnceLock;

use regex::Regex;

use super::record::ResourceRefs;

/// Case-, whitespace- and middle-dot-insensitive fold of a display name.
/// Chinese localizations punctuate multi-word names with interpuncts, and the
/// spacing differs between sources; both are stripped before comparison.
pub fn name_key(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '·' | '•' | '・'))
        .flat_map(char::to_lowercase)
        .collect()
}

fn icon_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)/icons/([^/]+?)_(?:large|small)\.png").unwrap())
}

/// Stable token from an icon URL's filename, independent of which size
/// variant of the icon the URL points at. Empty when the URL does not follow
/// the `/icons/<token>_<size>.png` convention.
pub fn icon_key(value: &str) -> String {
    icon_key_re()
        .captures(value)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_lowercase())
        .unwrap_or_default()
}

/// First non-empty icon key among a record's resource refs, preferring the
/// primary slot.
pub fn icon_key_of_refs(refs: &ResourceRefs) -> String {
    for candidate in [&refs.icon, &refs.icon_large, &refs.icon_small] {
        let key = icon_key(candidate);
        if !key.is_empty() {
            return key;
        }
    }
    String::new()
}
