//! Pool filters: an externally supplied allow-list restricting a broad
//! upstream dump (a full augment catalog) to the subset valid for one mode.

use std::collections::HashSet;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::error::FetchError;
use crate::util::json::{first_i64, first_string};

/// Allowed external identifiers, keyed both ways providers spell them:
/// string API names and numeric ids.
#[derive(Debug, Clone, Default)]
pub struct PoolFilter {
    pub api_names: HashSet<String>,
    pub ids: HashSet<i64>,
}

impl PoolFilter {
    pub fn is_empty(&self) -> bool {
        self.api_names.is_empty() && self.ids.is_empty()
    }

    /// Whether a raw entry belongs to the pool, by API name or numeric id.
    pub fn allows(&self, raw: &Value) -> bool {
        if let Some(api_name) = first_string(raw, &["augmentId", "apiName"]) {
            if self.api_names.contains(&api_name) {
                return true;
            }
        }
        if let Some(id) = first_i64(raw, &["id"]) {
            if self.ids.contains(&id) {
                return true;
            }
        }
        false
    }

    /// Parse any of the upstream pool shapes: a bare array, or an object
    /// wrapping the list under `augments`/`augmentIds`/`allowedAugments`.
    /// Entries may be strings (API names), numbers (ids), or objects.
    pub fn from_payload(payload: &Value) -> Self {
        let list = payload
            .as_array()
            .or_else(|| payload.get("augments").and_then(Value::as_array))
            .or_else(|| payload.get("augmentIds").and_then(Value::as_array))
            .or_else(|| payload.get("allowedAugments").and_then(Value::as_array));

        let mut pool = PoolFilter::default();
        let Some(list) = list else {
            return pool;
        };

        for entry in list {
            match entry {
                Value::String(s) => {
                    let text = s.trim();
                    if !text.is_empty() {
                        pool.api_names.insert(text.to_string());
                    }
                }
                Value::Number(n) => {
                    if let Some(id) = n.as_i64() {
                        pool.ids.insert(id);
                    }
                }
                Value::Object(_) => {
                    if let Some(api_name) = first_string(entry, &["augmentId", "apiName"]) {
                        pool.api_names.insert(api_name);
                    }
                    if let Some(id) = first_i64(entry, &["id"]) {
                        pool.ids.insert(id);
                    }
                }
                _ => {}
            }
        }
        pool
    }
}

/// Fetch and parse a pool allow-list from a remote URL.
pub async fn fetch_pool(
    client: &Client,
    url: &str,
    timeout: Duration,
) -> Result<PoolFilter, FetchError> {
    let payload = super::get_json(client, url, timeout).await?;
    Ok(PoolFilter::from_payload(&payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_every_wrapper_shape() {
        let bare = PoolFilter::from_payload(&json!(["Aug_A", 7]));
        assert!(bare.api_names.contains("Aug_A"));
        assert!(bare.ids.contains(&7));

        let wrapped = PoolFilter::from_payload(&json!({"allowedAugments": [{"apiName": "Aug_B", "id": 9}]}));
        assert!(wrapped.api_names.contains("Aug_B"));
        assert!(wrapped.ids.contains(&9));

        assert!(PoolFilter::from_payload(&json!({"unrelated": true})).is_empty());
    }

    #[test]
    fn allows_by_api_name_or_numeric_id() {
        let pool = PoolFilter::from_payload(&json!({"augments": ["Aug_FireBolt", 12]}));
        assert!(pool.allows(&json!({"apiName": "Aug_FireBolt"})));
        assert!(pool.allows(&json!({"id": 12, "name": "anything"})));
        assert!(!pool.allows(&json!({"apiName": "Aug_Other", "id": 99})));
    }
}
