use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

pub const ENV_URL: &str = "SUPABASE_URL";
pub const ENV_SERVICE_KEY: &str = "SUPABASE_SERVICE_KEY";
pub const ENV_ANON_KEY: &str = "SUPABASE_KEY";

/// How long fetched tables stay fresh.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Which credential the store client authenticates with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Service,
    Anon,
}

impl KeyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyKind::Service => "service",
            KeyKind::Anon => "anon",
        }
    }
}

/// Connection settings for the hosted table store.
#[derive(Clone)]
pub struct StoreConfig {
    pub url: Url,
    pub key: String,
    pub key_kind: KeyKind,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("url", &self.url.as_str())
            .field("key", &"<redacted>")
            .field("key_kind", &self.key_kind)
            .finish()
    }
}

impl StoreConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through `lookup`. The service key wins over the anon
    /// key; empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let raw_url = get(ENV_URL);
        let key = get(ENV_SERVICE_KEY)
            .map(|k| (k, KeyKind::Service))
            .or_else(|| get(ENV_ANON_KEY).map(|k| (k, KeyKind::Anon)));

        let (raw_url, (key, key_kind)) = match (raw_url, key) {
            (Some(u), Some(k)) => (u, k),
            _ => {
                return Err(Error::Config(format!(
                    "missing {ENV_URL} or {ENV_SERVICE_KEY}/{ENV_ANON_KEY} in environment variables"
                )))
            }
        };

        let url = Url::parse(raw_url.trim())?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "{ENV_URL} must be an http(s) URL, got {url}"
            )));
        }

        log::info!("Store URL: {url}");
        log::info!("Using key type: {}", key_kind.as_str());

        Ok(Self {
            url,
            key,
            key_kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_service_key_preferred() {
        let cfg = StoreConfig::from_lookup(lookup(&[
            (ENV_URL, "https://example.supabase.co"),
            (ENV_SERVICE_KEY, "service-secret"),
            (ENV_ANON_KEY, "anon-secret"),
        ]))
        .unwrap();
        assert_eq!(cfg.key, "service-secret");
        assert_eq!(cfg.key_kind, KeyKind::Service);
    }

    #[test]
    fn test_falls_back_to_anon_key() {
        let cfg = StoreConfig::from_lookup(lookup(&[
            (ENV_URL, "https://example.supabase.co"),
            (ENV_SERVICE_KEY, ""),
            (ENV_ANON_KEY, "anon-secret"),
        ]))
        .unwrap();
        assert_eq!(cfg.key, "anon-secret");
        assert_eq!(cfg.key_kind, KeyKind::Anon);
    }

    #[test]
    fn test_missing_credentials_is_config_error() {
        let err = StoreConfig::from_lookup(lookup(&[(ENV_URL, "https://example.supabase.co")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = StoreConfig::from_lookup(lookup(&[(ENV_ANON_KEY, "anon-secret")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_rejects_non_http_url() {
        let err = StoreConfig::from_lookup(lookup(&[
            (ENV_URL, "ftp://example.supabase.co"),
            (ENV_ANON_KEY, "anon-secret"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_debug_redacts_key() {
        let cfg = StoreConfig::from_lookup(lookup(&[
            (ENV_URL, "https://example.supabase.co"),
            (ENV_ANON_KEY, "anon-secret"),
        ]))
        .unwrap();
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("anon-secret"));
    }
}
