//! CommunityDragon: arena augment definitions and game asset bases.
//!
//! Asset paths show up in three shapes: bare `assets/...` paths relative to
//! the game-assets base, absolute `/lol-game-data/...` paths relative to the
//! raw mirror, and fully-qualified URLs (sometimes pinned to a numeric patch
//! mirror that eventually goes stale).

use std::sync::OnceLock;

use regex::Regex;

/// Base for `assets/...` game asset paths, tracking the latest patch.
pub const GAME_ASSET_BASE: &str = "https://raw.communitydragon.org/latest/game/";

/// Raw mirror root for absolute `/lol-game-data/...` style paths.
pub const RAW_LATEST_BASE: &str = "https://raw.communitydragon.org/latest";

/// Plugin-manifest base; second choice when the game-assets base misses.
pub const PLUGINS_ASSET_BASE: &str =
    "https://raw.communitydragon.org/latest/plugins/rcp-be-lol-game-data/global/default/";

pub const DEFAULT_LOCALE: &str = "zh_CN";

/// CommunityDragon spells locales lowercased with underscores (`zh_cn`).
pub fn normalize_locale(locale: &str) -> String {
    let raw = locale.trim();
    if raw.is_empty() {
        return "zh_cn".to_string();
    }
    raw.to_lowercase().replace('-', "_")
}

/// Default arena augment source for one locale.
pub fn arena_source_url(locale: &str) -> String {
    format!(
        "https://raw.communitydragon.org/latest/cdragon/arena/{}.json",
        normalize_locale(locale)
    )
}

/// Resolve an icon value to an absolute URL. Absolute URLs pass through
/// unchanged; relative paths resolve against the matching base.
pub fn resolve_icon_url(value: &str) -> String {
    let icon = value.trim();
    if icon.is_empty() {
        return String::new();
    }
    if icon.starts_with("http://") || icon.starts_with("https://") {
        return icon.to_string();
    }
    if icon.starts_with("assets/") {
        return format!("{GAME_ASSET_BASE}{icon}");
    }
    if icon.starts_with('/') {
        return format!("{RAW_LATEST_BASE}{icon}");
    }
    icon.to_string()
}

fn game_assets_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)/game/(assets/.+)$").unwrap())
}

fn assets_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)/(assets/.+)$").unwrap())
}

fn pinned_mirror_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)raw\.communitydragon\.org/\d+\.").unwrap())
}

/// Extract the `assets/...` suffix from a full or partial CommunityDragon
/// URL; empty when the value carries no assets path.
pub fn extract_assets_path(value: &str) -> String {
    let raw = value.trim();
    if raw.is_empty() {
        return String::new();
    }
    for re in [game_assets_re(), assets_re()] {
        if let Some(m) = re.captures(raw).and_then(|c| c.get(1)) {
            return m.as_str().trim_start_matches('/').to_string();
        }
    }
    String::new()
}

/// Join a base URL and an assets path, tolerating stray slashes on either.
pub fn join_base(base: &str, assets_path: &str) -> String {
    let base = base.trim();
    let path = assets_path.trim().trim_start_matches('/');
    if base.is_empty() || path.is_empty() {
        return String::new();
    }
    format!("{}/{}", base.trim_end_matches('/'), path)
}

/// Arena augment icons exist under two internal mode codenames; when one
/// directory misses, the sibling usually has the same file. Returns the
/// flipped path, or empty when the path is under neither directory.
pub fn toggle_mode_path(assets_path: &str) -> String {
    const CHERRY: &str = "assets/ux/cherry/augments/";
    const KIWI: &str = "assets/ux/kiwi/augments/";

    let raw = assets_path.trim();
    let lowered = raw.to_lowercase();
    if lowered.starts_with(CHERRY) {
        return format!("{KIWI}{}", &raw[CHERRY.len()..]);
    }
    if lowered.starts_with(KIWI) {
        return format!("{CHERRY}{}", &raw[KIWI.len()..]);
    }
    String::new()
}

/// Whether a URL is pinned to a numeric patch mirror (e.g. `/14.23/game/...`).
/// Such URLs rot once the mirror drops the patch, so they count as stale.
pub fn is_version_pinned(url: &str) -> bool {
    pinned_mirror_re().is_match(url)
}
