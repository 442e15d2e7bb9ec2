//! Update detection and presentation shaping
//!
//! Given the locally registered products and a store's latest-version
//! records, decide per product whether an update exists and shape the
//! result the way the presentation layer expects. Plugin and theme records
//! use different identity fields — that asymmetry is a presentation-layer
//! contract, so it is preserved exactly, but modeled as one tagged union
//! here instead of ad hoc mutation.

pub mod cache;
pub mod version;

pub use cache::LatestVersionCache;

use crate::product::{Product, ProductKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One per-product record as the store reports it. Unknown wire fields are
/// retained so nothing the store sends is lost on the way through.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersionInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    /// Details page URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Download package URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tested: Option<String>,
    // These four arrive as associative structures, arrays, or not at all,
    // depending on the store version. Kept raw here; `reconcile_one`
    // normalizes them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sections: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banners: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icons: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contributors: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A shaped update record, ready for the presentation layer.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum UpdateRecord {
    Plugin(PluginUpdate),
    Theme(ThemeUpdate),
}

/// Plugin shape: `plugin` and `id` duplicate the product id; `slug` in the
/// embedded info is overridden with the registered slug.
#[derive(Debug, Clone, Serialize)]
pub struct PluginUpdate {
    pub plugin: String,
    pub id: String,
    #[serde(flatten)]
    pub info: VersionInfo,
}

/// Theme shape: carries the registered slug as `theme`.
#[derive(Debug, Clone, Serialize)]
pub struct ThemeUpdate {
    pub theme: String,
    #[serde(flatten)]
    pub info: VersionInfo,
}

impl UpdateRecord {
    fn for_product(product: &Product, mut info: VersionInfo) -> Self {
        match product.kind() {
            ProductKind::Theme => UpdateRecord::Theme(ThemeUpdate {
                theme: product.slug().to_string(),
                info,
            }),
            ProductKind::Plugin => {
                // Make sure the slug is the locally registered one.
                info.slug = Some(product.slug().to_string());
                UpdateRecord::Plugin(PluginUpdate {
                    plugin: product.id().to_string(),
                    id: product.id().to_string(),
                    info,
                })
            }
        }
    }

    pub fn info(&self) -> &VersionInfo {
        match self {
            UpdateRecord::Plugin(PluginUpdate { info, .. })
            | UpdateRecord::Theme(ThemeUpdate { info, .. }) => info,
        }
    }
}

/// The two partitions of an update check. Every product with version info
/// lands in exactly one; products the store said nothing about appear in
/// neither.
#[derive(Debug, Default, Serialize)]
pub struct UpdateDelta {
    pub updates_available: BTreeMap<String, UpdateRecord>,
    pub no_update: BTreeMap<String, UpdateRecord>,
}

impl UpdateDelta {
    pub fn is_empty(&self) -> bool {
        self.updates_available.is_empty() && self.no_update.is_empty()
    }

    /// Folds another store's delta into this one.
    pub fn merge(&mut self, other: UpdateDelta) {
        self.updates_available.extend(other.updates_available);
        self.no_update.extend(other.no_update);
    }
}

/// Partitions `products` by comparing their installed versions against the
/// fetched records.
pub fn reconcile(
    products: &[&Product],
    latest_versions: &BTreeMap<String, VersionInfo>,
) -> UpdateDelta {
    let mut delta = UpdateDelta::default();

    for product in products {
        let Some(info) = latest_versions.get(product.id()) else {
            continue;
        };
        // No version info means "unknown", not "no update".
        let Some(new_version) = info.new_version.clone() else {
            continue;
        };

        let record = UpdateRecord::for_product(product, info.clone());
        if version::is_newer(product.version(), &new_version) {
            delta.updates_available.insert(product.id().to_string(), record);
        } else {
            delta.no_update.insert(product.id().to_string(), record);
        }
    }

    delta
}

/// Detailed record for a single product's "view version details" screen.
/// The four associative fields are always present as ordered sequences,
/// normalizing an inconsistency in the wire format.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetails {
    #[serde(flatten)]
    pub info: VersionInfo,
    pub sections: Vec<(String, String)>,
    pub banners: Vec<(String, String)>,
    pub icons: Vec<(String, String)>,
    pub contributors: Vec<(String, String)>,
}

/// Formats the record for `product`, if the store reported one.
pub fn reconcile_one(
    product: &Product,
    latest_versions: &BTreeMap<String, VersionInfo>,
) -> Option<ProductDetails> {
    let mut info = latest_versions.get(product.id())?.clone();

    let sections = normalize_assoc(info.sections.take());
    let banners = normalize_assoc(info.banners.take());
    let icons = normalize_assoc(info.icons.take());
    let contributors = normalize_assoc(info.contributors.take());

    Some(ProductDetails {
        info,
        sections,
        banners,
        icons,
        contributors,
    })
}

/// Flattens an associative wire value into `(key, text)` pairs. Objects keep
/// their entries, arrays are keyed by position, anything else (including
/// absent) becomes the empty sequence.
fn normalize_assoc(value: Option<Value>) -> Vec<(String, String)> {
    match value {
        Some(Value::Object(map)) => map
            .into_iter()
            .map(|(key, value)| (key, stringify(value)))
            .collect(),
        Some(Value::Array(items)) => items
            .into_iter()
            .enumerate()
            .map(|(index, value)| (index.to_string(), stringify(value)))
            .collect(),
        _ => Vec::new(),
    }
}

fn stringify(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}
