//! Reachability probing for candidate resource URLs.
//!
//! A probe answers one question (does this URL currently resolve) and the
//! resolver walks an ordered candidate list until one does. Exhaustion falls
//! back to a best-effort choice instead of failing the record.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use url::Url;

use crate::error::FetchError;

#[async_trait]
pub trait Probe: Send + Sync {
    /// Whether the URL currently answers with a success status.
    async fn check(&self, url: &str) -> bool;
}

/// HEAD probe with a one-byte ranged GET fallback for hosts that reject or
/// mishandle HEAD. Any 2xx (206 included) counts as reachable.
pub struct HttpProbe {
    client: Client,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(crate::sources::USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn check(&self, url: &str) -> bool {
        let url = url.trim();
        if url.is_empty() {
            return false;
        }

        if let Ok(response) = self.client.head(url).timeout(self.timeout).send().await {
            if response.status().is_success() {
                return true;
            }
        }

        match self
            .client
            .get(url)
            .timeout(self.timeout)
            .header(header::RANGE, "bytes=0-0")
            .send()
            .await
        {
            Ok(response) => {
                let status = response.status();
                status.is_success() || status == StatusCode::PARTIAL_CONTENT
            }
            Err(_) => false,
        }
    }
}

/// Try candidates strictly in order, returning the first reachable one and
/// never probing past a success. Exhaustion falls back to `last_resort` when
/// non-empty, then to the first non-empty candidate.
pub async fn resolve_candidates(
    probe: &dyn Probe,
    candidates: &[String],
    last_resort: &str,
) -> Option<String> {
    for candidate in candidates {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            continue;
        }
        if probe.check(candidate).await {
            return Some(candidate.to_string());
        }
    }

    let last_resort = last_resort.trim();
    if !last_resort.is_empty() {
        return Some(last_resort.to_string());
    }
    candidates
        .iter()
        .map(|c| c.trim())
        .find(|c| !c.is_empty())
        .map(str::to_string)
}

/// Trusted-source fast path: first candidate that parses as an absolute URL,
/// accepted without probing.
pub fn first_well_formed(candidates: &[String]) -> Option<String> {
    candidates
        .iter()
        .map(|c| c.trim())
        .find(|c| Url::parse(c).is_ok())
        .map(str::to_string)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Probe stub answering from a fixed reachable set and logging calls.
    pub struct FakeProbe {
        reachable: HashSet<String>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeProbe {
        pub fn new<I: IntoIterator<Item = S>, S: Into<String>>(reachable: I) -> Self {
            Self {
                reachable: reachable.into_iter().map(Into::into).collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Probe for FakeProbe {
        async fn check(&self, url: &str) -> bool {
            self.calls.lock().unwrap().push(url.to_string());
            self.reachable.contains(url)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeProbe;
    use super::*;

    #[tokio::test]
    async fn first_reachable_candidate_wins_and_probing_stops() {
        let probe = FakeProbe::new(["https://cdn.invalid/good.png"]);
        let candidates = vec![
            "https://cdn.invalid/bad.png".to_string(),
            "https://cdn.invalid/also-bad.png".to_string(),
            "https://cdn.invalid/good.png".to_string(),
            "https://cdn.invalid/never-tried.png".to_string(),
        ];

        let resolved = resolve_candidates(&probe, &candidates, "").await;
        assert_eq!(resolved.as_deref(), Some("https://cdn.invalid/good.png"));

        let calls = probe.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert!(!calls.iter().any(|c| c.contains("never-tried")));
    }

    #[tokio::test]
    async fn exhaustion_prefers_the_stored_value() {
        let probe = FakeProbe::new(Vec::<String>::new());
        let candidates = vec!["https://cdn.invalid/a.png".to_string()];
        let resolved = resolve_candidates(&probe, &candidates, "https://cdn.invalid/stored.png").await;
        assert_eq!(resolved.as_deref(), Some("https://cdn.invalid/stored.png"));
    }

    #[tokio::test]
    async fn exhaustion_without_stored_value_falls_back_to_first_candidate() {
        let probe = FakeProbe::new(Vec::<String>::new());
        let candidates = vec![
            "  ".to_string(),
            "https://cdn.invalid/a.png".to_string(),
        ];
        let resolved = resolve_candidates(&probe, &candidates, "").await;
        assert_eq!(resolved.as_deref(), Some("https://cdn.invalid/a.png"));
    }

    #[tokio::test]
    async fn empty_candidate_list_yields_none() {
        let probe = FakeProbe::new(Vec::<String>::new());
        assert_eq!(resolve_candidates(&probe, &[], "").await, None);
    }

    #[test]
    fn well_formed_fast_path_skips_relative_paths() {
        let candidates = vec![
            "assets/not/absolute.png".to_string(),
            "https://cdn.invalid/ok.png".to_string(),
        ];
        assert_eq!(
            first_well_formed(&candidates).as_deref(),
            Some("https://cdn.invalid/ok.png")
        );
        assert_eq!(first_well_formed(&["nope".to_string()]), None);
    }
}
