//! Product registration
//!
//! A product is one plugin or theme integration registered against a store.
//! Construction fills in everything derivable (slug from the plugin file,
//! option names from kind + slug) and fails loudly when a required field is
//! missing — a bad registration is an integration bug, not a runtime state.

use crate::error::ConfigError;
use crate::storage::{self, KeyValueStore};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Whether a product is a plugin or a theme. The distinction decides how the
/// product is identified and which presentation shape its update records use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductKind {
    Plugin,
    Theme,
}

impl fmt::Display for ProductKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductKind::Plugin => write!(f, "plugin"),
            ProductKind::Theme => write!(f, "theme"),
        }
    }
}

/// Pluggable license key storage.
///
/// The default keeps the key in the SDK's key-value store under the
/// product's derived option name. Integrations that manage keys elsewhere
/// (their own settings screen, a constant in code) implement this instead.
pub trait LicenseKeyStore: Send + Sync {
    fn get(&self) -> Option<String>;
    /// `None` clears the stored key.
    fn set(&self, key: Option<&str>);
}

/// Declarative product registration arguments.
///
/// Use [`ProductConfig::plugin`] or [`ProductConfig::theme`] and chain the
/// optional setters; [`Product::new`] validates and fills the rest.
pub struct ProductConfig {
    pub kind: ProductKind,
    pub item_id: u64,
    pub version: String,
    /// Plugin main file, relative to the install root (`my-plugin/my-plugin.toml`
    /// style paths); identifies the plugin and yields its slug.
    pub file: Option<String>,
    /// Required for themes; derived from `file` for plugins.
    pub slug: Option<String>,
    /// Opt into the pre-release channel.
    pub beta: bool,
    /// Override for the option name holding the license key.
    pub license_key_option: Option<String>,
    /// Override for the option name holding the license record.
    pub license_record_option: Option<String>,
    /// Custom key storage; replaces the key-value-store default entirely.
    pub license_store: Option<Arc<dyn LicenseKeyStore>>,
    /// Per-product overrides for user-facing message templates.
    pub strings: HashMap<String, String>,
}

impl ProductConfig {
    pub fn plugin(item_id: u64, file: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            kind: ProductKind::Plugin,
            item_id,
            version: version.into(),
            file: Some(file.into()),
            slug: None,
            beta: false,
            license_key_option: None,
            license_record_option: None,
            license_store: None,
            strings: HashMap::new(),
        }
    }

    pub fn theme(item_id: u64, slug: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            kind: ProductKind::Theme,
            item_id,
            version: version.into(),
            file: None,
            slug: Some(slug.into()),
            beta: false,
            license_key_option: None,
            license_record_option: None,
            license_store: None,
            strings: HashMap::new(),
        }
    }

    pub fn beta(mut self, beta: bool) -> Self {
        self.beta = beta;
        self
    }

    pub fn with_license_store(mut self, store: Arc<dyn LicenseKeyStore>) -> Self {
        self.license_store = Some(store);
        self
    }

    pub fn with_string(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.strings.insert(key.into(), text.into());
        self
    }
}

/// A registered product. Immutable after registration; license state lives
/// in the key-value store, not on the product itself.
pub struct Product {
    id: String,
    store_id: String,
    kind: ProductKind,
    item_id: u64,
    version: String,
    slug: String,
    file: Option<String>,
    beta: bool,
    key_option: String,
    record_option: String,
    license_store: Option<Arc<dyn LicenseKeyStore>>,
    strings: HashMap<String, String>,
}

impl fmt::Debug for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Product")
            .field("id", &self.id)
            .field("store_id", &self.store_id)
            .field("kind", &self.kind)
            .field("item_id", &self.item_id)
            .field("version", &self.version)
            .field("slug", &self.slug)
            .field("beta", &self.beta)
            .finish_non_exhaustive()
    }
}

impl Product {
    /// Validates a registration and derives the remaining identity fields.
    pub fn new(config: ProductConfig, store_id: &str) -> Result<Self, ConfigError> {
        let mut missing = Vec::new();
        if config.item_id == 0 {
            missing.push("item_id");
        }
        if config.version.trim().is_empty() {
            missing.push("version");
        }

        let slug = match (&config.slug, &config.file) {
            (Some(slug), _) => Some(slug.clone()),
            (None, Some(file)) => Some(slug_from_file(file)),
            (None, None) => None,
        };
        match (config.kind, &slug) {
            (ProductKind::Theme, None) => missing.push("slug"),
            (ProductKind::Plugin, None) => missing.push("file"),
            _ => {}
        }

        if !missing.is_empty() {
            return Err(ConfigError::MissingFields(missing.join(", ")));
        }
        let slug = slug.unwrap_or_default();

        // Plugins are identified by their main file path, themes by slug.
        let id = match (config.kind, &config.file) {
            (ProductKind::Plugin, Some(file)) => file.clone(),
            _ => slug.clone(),
        };

        let key_option = config
            .license_key_option
            .unwrap_or_else(|| storage::license_key_option(config.kind, &slug));
        let record_option = config
            .license_record_option
            .unwrap_or_else(|| storage::license_record_option(config.kind, &slug));

        Ok(Self {
            id,
            store_id: store_id.to_string(),
            kind: config.kind,
            item_id: config.item_id,
            version: config.version,
            slug,
            file: config.file,
            beta: config.beta,
            key_option,
            record_option,
            license_store: config.license_store,
            strings: config.strings,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn store_id(&self) -> &str {
        &self.store_id
    }

    pub fn kind(&self) -> ProductKind {
        self.kind
    }

    pub fn item_id(&self) -> u64 {
        self.item_id
    }

    /// Locally installed version.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    pub fn beta(&self) -> bool {
        self.beta
    }

    /// Option name holding the persisted license record.
    pub fn record_option(&self) -> &str {
        &self.record_option
    }

    /// Per-product message override, if registered.
    pub fn string(&self, key: &str) -> Option<&str> {
        self.strings.get(key).map(String::as_str)
    }

    /// Reads the license key, preferring a custom `LicenseKeyStore` over the
    /// default option. Blank keys read as absent.
    pub fn license_key(&self, kv: &dyn KeyValueStore) -> Option<String> {
        let raw = match &self.license_store {
            Some(store) => store.get(),
            None => kv.get(&self.key_option),
        };
        raw.map(|k| k.trim().to_string()).filter(|k| !k.is_empty())
    }

    /// Writes (or with `None`, clears) the license key.
    pub fn set_license_key(&self, kv: &dyn KeyValueStore, key: Option<&str>) {
        match &self.license_store {
            Some(store) => store.set(key),
            None => match key {
                Some(key) => kv.set(&self.key_option, key.trim()),
                None => kv.delete(&self.key_option),
            },
        }
    }

    /// Per-product body of the batched version-check request.
    pub fn to_api_args(&self, kv: &dyn KeyValueStore) -> serde_json::Value {
        json!({
            "license": self.license_key(kv),
            "item_id": self.item_id,
            "version": self.version,
            "slug": self.slug,
            "beta": self.beta,
        })
    }
}

fn slug_from_file(file: &str) -> String {
    let basename = file.rsplit(['/', '\\']).next().unwrap_or(file);
    match basename.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem.to_string(),
        _ => basename.to_string(),
    }
}
