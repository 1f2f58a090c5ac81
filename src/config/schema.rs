//! Configuration schema definitions.
//!
//! All types derive Serde traits: route descriptors arrive from the host as
//! JSON across the FFI boundary, and the listener/cache sections keep the
//! same shape for embedders using the crate as a plain library.

use serde::{Deserialize, Serialize};

/// Dispatch tier for a registered route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Pre-computed body, served from the exact-match map.
    Static,
    /// Produced via the host callback, replayed from the TTL cache.
    Cached,
    /// Produced via the host callback on every request.
    Dynamic,
}

impl Tier {
    /// Parse a tier name as it appears in FFI descriptors.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "static" => Some(Tier::Static),
            "cached" => Some(Tier::Cached),
            "dynamic" => Some(Tier::Dynamic),
            _ => None,
        }
    }
}

/// A single route registration descriptor.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteSpec {
    /// HTTP method, uppercase (e.g. "GET").
    pub method: String,

    /// Path pattern: `/`-delimited literal segments and `{name}` placeholders.
    pub pattern: String,

    /// Dispatch tier.
    pub tier: Tier,

    /// Cache TTL in milliseconds. Required (and > 0) for `Tier::Cached`.
    #[serde(default)]
    pub ttl_ms: Option<u64>,

    /// Pre-computed response body. Required for `Tier::Static`.
    #[serde(default)]
    pub body: Option<String>,

    /// Content type served with the body (static tier) or cached entries.
    #[serde(default)]
    pub content_type: Option<String>,
}

/// Per-pattern metadata inside the bulk catalog.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogEntry {
    pub tier: Tier,
    #[serde(default)]
    pub ttl_ms: Option<u64>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
}

impl CatalogEntry {
    fn into_spec(self, method: String, pattern: String) -> RouteSpec {
        RouteSpec {
            method,
            pattern,
            tier: self.tier,
            ttl_ms: self.ttl_ms,
            body: self.body,
            content_type: self.content_type,
        }
    }
}

/// Parse the bulk catalog sent over `set_routes`:
/// `{method: {pattern: {tier, ttl_ms?, body?, content_type?}}}`.
///
/// Object order is preserved so that catalog order defines the dynamic
/// tie-break order (first registered pattern wins).
pub fn parse_catalog(json: &str) -> Result<Vec<RouteSpec>, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let methods = value
        .as_object()
        .ok_or_else(|| serde::de::Error::custom("catalog root must be an object"))?;

    let mut specs = Vec::new();
    for (method, patterns) in methods {
        let patterns = patterns
            .as_object()
            .ok_or_else(|| serde::de::Error::custom("method entry must be an object"))?;
        for (pattern, meta) in patterns {
            let entry: CatalogEntry = serde_json::from_value(meta.clone())?;
            specs.push(entry.into_spec(method.clone(), pattern.clone()));
        }
    }
    Ok(specs)
}

/// Listener binding mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerMode {
    /// Loopback binding, verbose diagnostics.
    Development,
    /// All-interface binding, minimal diagnostics.
    Production,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Explicit bind address. When absent, derived from the mode.
    pub address: Option<String>,

    /// Listening port.
    pub port: u16,

    /// Development or production binding.
    pub mode: ListenerMode,
}

impl ListenerConfig {
    /// The socket address to bind, combining address override, mode and port.
    pub fn bind_address(&self) -> String {
        match &self.address {
            Some(addr) => format!("{}:{}", addr, self.port),
            None => match self.mode {
                ListenerMode::Development => format!("127.0.0.1:{}", self.port),
                ListenerMode::Production => format!("0.0.0.0:{}", self.port),
            },
        }
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            address: None,
            port: 8080,
            mode: ListenerMode::Development,
        }
    }
}

/// Response cache settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Interval between background sweeps of expired entries, in seconds.
    pub purge_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            purge_interval_secs: 30,
        }
    }
}

/// Root engine configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub listener: ListenerConfig,
    pub cache: CacheConfig,
}
