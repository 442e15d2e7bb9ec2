//! Configuration file parsing for lichen.toml
//!
//! The config file plays the role the host application's registration hooks
//! would: it declares the local site, the stores, and the installed
//! products, and every invocation rebuilds the SDK from it.

use anyhow::{bail, Context, Result};
use lichen_core::{
    Environment, EnvironmentLabel, KeyValueStore, ProductConfig, Sdk, StoreConfig,
};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

pub const CONFIG_FILE: &str = "lichen.toml";

/// Main configuration structure for lichen.toml
#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
    /// Public URL of this installation, reported to stores.
    pub site_url: String,

    /// Runtime environment: local, development, staging, or production.
    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default, rename = "store")]
    pub stores: Vec<StoreEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreEntry {
    /// License/update server endpoint.
    pub api_url: String,

    /// Explicit store id (derived from the host when omitted).
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default = "default_true")]
    pub verify_tls: bool,

    /// Seconds a cached version check stays trusted; 0 disables caching.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl: u64,

    #[serde(default, rename = "product")]
    pub products: Vec<ProductEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductEntry {
    /// "plugin" or "theme"
    #[serde(rename = "type")]
    pub kind: String,

    /// Remote catalog id.
    pub item_id: u64,

    /// Locally installed version.
    pub version: String,

    /// Plugin main file (plugins only).
    #[serde(default)]
    pub file: Option<String>,

    /// Slug (required for themes, derived from `file` for plugins).
    #[serde(default)]
    pub slug: Option<String>,

    /// Opt into the pre-release channel.
    #[serde(default)]
    pub beta: bool,
}

fn default_environment() -> String {
    "production".to_string()
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl() -> u64 {
    lichen_core::store::DEFAULT_CACHE_TTL_SECS
}

impl CliConfig {
    /// Loads and parses a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: CliConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        if config.site_url.trim().is_empty() {
            bail!("{}: site_url must not be empty", path.display());
        }
        Ok(config)
    }

    /// Builds the SDK and registers every configured store and product.
    pub fn build_sdk(&self, kv: Arc<dyn KeyValueStore>) -> Result<Sdk> {
        let env = Environment::new(
            self.site_url.clone(),
            EnvironmentLabel::parse(&self.environment),
        );
        let mut sdk = Sdk::new(env, kv);

        for entry in &self.stores {
            let mut config = StoreConfig::new(&entry.api_url)
                .verify_tls(entry.verify_tls)
                .cache_ttl(entry.cache_ttl);
            if let Some(id) = &entry.id {
                config = config.id(id);
            }

            let store = sdk
                .register_store(config)
                .with_context(|| format!("Invalid store {}", entry.api_url))?;

            for product in &entry.products {
                store
                    .add_product(product.to_product_config()?)
                    .with_context(|| format!("Invalid product in store {}", entry.api_url))?;
            }
        }

        Ok(sdk)
    }
}

impl ProductEntry {
    fn to_product_config(&self) -> Result<ProductConfig> {
        let mut config = match self.kind.as_str() {
            "plugin" => {
                let file = self
                    .file
                    .as_ref()
                    .with_context(|| format!("Plugin {} is missing `file`", self.item_id))?;
                ProductConfig::plugin(self.item_id, file, &self.version)
            }
            "theme" => {
                let slug = self
                    .slug
                    .as_ref()
                    .with_context(|| format!("Theme {} is missing `slug`", self.item_id))?;
                ProductConfig::theme(self.item_id, slug, &self.version)
            }
            other => bail!("Unknown product type {other:?} (expected \"plugin\" or \"theme\")"),
        };

        config.slug = self.slug.clone().or(config.slug);
        Ok(config.beta(self.beta))
    }
}

/// Starter configuration written by `lichen init`.
pub const SAMPLE_CONFIG: &str = r#"# Lichen configuration
#
# Declare this installation, the stores it buys from, and the installed
# products. Run `lichen check` to look for updates and `lichen license`
# to manage keys.

site_url = "https://my-site.example"
environment = "production"

[[store]]
api_url = "https://store.example.com"
# cache_ttl = 10800   # seconds; 0 disables version-check caching

[[store.product]]
type = "plugin"
item_id = 123
file = "my-plugin/my-plugin.toml"
version = "1.0.0"

# [[store.product]]
# type = "theme"
# item_id = 456
# slug = "my-theme"
# version = "2.1.0"
"#;
