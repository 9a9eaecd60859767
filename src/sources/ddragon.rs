//! Riot Data Dragon: the versioned CDN serving champion and item datasets.
//!
//! Every dataset URL embeds a patch version; "latest" is whatever the version
//! endpoint lists first (the list is newest-first).

use std::time::Duration;

use reqwest::Client;

use crate::error::FetchError;

pub const DATA_DRAGON_BASE: &str = "https://ddragon.leagueoflegends.com";

/// Datasets the pipeline pulls from Data Dragon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    Champions,
    Items,
}

impl Dataset {
    pub fn url(&self, version: &str, locale: &str) -> String {
        let file = match self {
            Dataset::Champions => "champion.json",
            Dataset::Items => "item.json",
        };
        format!("{DATA_DRAGON_BASE}/cdn/{version}/data/{locale}/{file}")
    }
}

pub fn versions_url() -> String {
    format!("{DATA_DRAGON_BASE}/api/versions.json")
}

/// Resolve the latest published patch version.
pub async fn latest_version(client: &Client, timeout: Duration) -> Result<String, FetchError> {
    let url = versions_url();
    let payload = super::get_json(client, &url, timeout).await?;
    payload
        .as_array()
        .and_then(|versions| versions.first())
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(FetchError::MissingVersion { url })
}

/// Version-pinned square portrait base for one patch.
pub fn champion_square_url(version: &str, image_file: &str) -> String {
    format!("{DATA_DRAGON_BASE}/cdn/{version}/img/champion/{image_file}")
}

/// Splash art is served unversioned, keyed by champion id.
pub fn champion_splash_url(champion_id: &str) -> String {
    format!("{DATA_DRAGON_BASE}/cdn/img/champion/splash/{champion_id}_0.jpg")
}

pub fn champion_loading_url(champion_id: &str) -> String {
    format!("{DATA_DRAGON_BASE}/cdn/img/champion/loading/{champion_id}_0.jpg")
}

pub fn item_image_url(version: &str, image_file: &str) -> String {
    format!("{DATA_DRAGON_BASE}/cdn/{version}/img/item/{image_file}")
}
