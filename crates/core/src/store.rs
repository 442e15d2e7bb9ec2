//! Store registration
//!
//! A store is one remote license/update server. Its API URL is normalized to
//! scheme + host + port at registration; a store whose URL resolves to the
//! local installation is rejected outright, since a site pinging itself is
//! always a configuration mistake.

use crate::error::ConfigError;
use crate::product::{Product, ProductConfig};
use std::collections::BTreeMap;

/// Default trust window for cached version-check results: 3 hours.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3 * 60 * 60;

/// Declarative store registration arguments.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Explicit unique id. Derived from the normalized host when omitted;
    /// set it explicitly if you intend to look the store up by id later.
    pub id: Option<String>,
    /// License/update server endpoint. Path and query are stripped.
    pub api_url: String,
    /// Verify the server's TLS certificate. Leave on outside development.
    pub verify_tls: bool,
    /// Seconds a cached version-check result stays trusted. 0 disables
    /// caching entirely: every check hits the network.
    pub cache_ttl: u64,
}

impl StoreConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            id: None,
            api_url: api_url.into(),
            verify_tls: true,
            cache_ttl: DEFAULT_CACHE_TTL_SECS,
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    pub fn cache_ttl(mut self, secs: u64) -> Self {
        self.cache_ttl = secs;
        self
    }
}

/// A registered store and the products that belong to it.
#[derive(Debug)]
pub struct Store {
    id: String,
    api_url: String,
    verify_tls: bool,
    cache_ttl: u64,
    products: BTreeMap<String, Product>,
}

impl Store {
    /// Validates a registration against the local site URL.
    pub fn new(config: StoreConfig, site_url: &str) -> Result<Self, ConfigError> {
        let api_url = normalize_url(&config.api_url)?;

        // Reject self-pings before any network call can happen. The local
        // URL may be unparseable (tests, odd hosts); compare trimmed
        // strings as a fallback.
        let local = normalize_url(site_url)
            .unwrap_or_else(|_| site_url.trim_end_matches('/').to_string());
        if api_url == local {
            return Err(ConfigError::SelfPing(api_url));
        }

        let id = match config.id {
            Some(id) if !id.trim().is_empty() => id.trim().to_string(),
            _ => sanitize_id(&api_url),
        };

        Ok(Self {
            id,
            api_url,
            verify_tls: config.verify_tls,
            cache_ttl: config.cache_ttl,
            products: BTreeMap::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Normalized endpoint: scheme + host + port, no trailing slash.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn verify_tls(&self) -> bool {
        self.verify_tls
    }

    pub fn cache_ttl(&self) -> u64 {
        self.cache_ttl
    }

    /// Registers a product. Re-registering an existing product id is
    /// idempotent and returns the already-registered instance.
    pub fn add_product(&mut self, config: ProductConfig) -> Result<&Product, ConfigError> {
        let product = Product::new(config, &self.id)?;
        let id = product.id().to_string();
        Ok(self.products.entry(id).or_insert(product))
    }

    pub fn product(&self, id: &str) -> Option<&Product> {
        self.products.get(id)
    }

    /// All products, in stable id order.
    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }

    pub fn products_of_kind(&self, kind: crate::product::ProductKind) -> Vec<&Product> {
        self.products.values().filter(|p| p.kind() == kind).collect()
    }
}

/// Strips a URL down to scheme + host (+ non-default port).
fn normalize_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::MissingApiUrl);
    }

    let url = reqwest::Url::parse(trimmed).map_err(|e| ConfigError::InvalidApiUrl {
        url: trimmed.to_string(),
        reason: e.to_string(),
    })?;

    let host = url.host_str().ok_or_else(|| ConfigError::InvalidApiUrl {
        url: trimmed.to_string(),
        reason: "missing host".to_string(),
    })?;

    let mut normalized = format!("{}://{}", url.scheme(), host.to_ascii_lowercase());
    if let Some(port) = url.port() {
        normalized.push_str(&format!(":{port}"));
    }
    Ok(normalized)
}

/// Lowercases and squashes a normalized URL into an option-safe id.
fn sanitize_id(url: &str) -> String {
    let stripped = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    stripped
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}
