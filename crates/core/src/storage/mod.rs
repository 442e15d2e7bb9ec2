//! Persistent key-value storage abstraction
//!
//! Provides a `KeyValueStore` trait that decouples the SDK from the host's
//! option storage. One implementation ships with the core:
//! - `MemoryStore`: in-memory, used by tests and short-lived processes
//!
//! Integrations back the trait with whatever the host platform offers (a
//! settings table, a JSON file, etc.). Keys are ASCII and namespaced with a
//! fixed `lichen_` prefix; the derivation helpers below keep the formats in
//! one place.

pub mod memory;

pub use memory::MemoryStore;

use crate::product::ProductKind;

/// Abstract persistent string-to-string mapping.
///
/// No expiry semantics of its own: TTL and cooldown bookkeeping is encoded
/// in the stored values by the callers. Implementations are expected to be
/// last-write-wins under concurrent access; the SDK never requires
/// compare-and-swap.
pub trait KeyValueStore: Send + Sync {
    /// Returns the stored value, or `None` if the key is absent.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, overwriting any previous value.
    fn set(&self, key: &str, value: &str);

    /// Removes `key`. Removing an absent key is a no-op.
    fn delete(&self, key: &str);
}

/// Key under which a store's latest-versions envelope is cached.
pub fn latest_cache_key(store_id: &str) -> String {
    format!("lichen_latest_cache_{store_id}")
}

/// Key under which a product's license key is stored.
pub fn license_key_option(kind: ProductKind, slug: &str) -> String {
    format!("lichen_{kind}_{slug}_license")
}

/// Key under which a product's last known license record is stored.
pub fn license_record_option(kind: ProductKind, slug: &str) -> String {
    format!("lichen_{kind}_{slug}_license_record")
}

/// Key under which a host's failed-request cooldown timestamp is stored.
pub fn failed_request_key(host_key: &str) -> String {
    format!("lichen_failed_request_{host_key}")
}
