//! SDK root
//!
//! One `Sdk` per process, constructed explicitly at startup and handed to
//! whatever needs it — there are no singletons or globals. It owns the
//! store registry and the wired-together cache, client, and license
//! manager, and exposes the operations the host surfaces call.

use crate::clock::{Clock, SystemClock};
use crate::env::Environment;
use crate::error::{ConfigError, LicenseError};
use crate::license::{LicenseAction, LicenseManager, LicenseRecord, LicenseState};
use crate::product::{Product, ProductKind};
use crate::remote::breaker::CircuitBreaker;
use crate::remote::client::ApiClient;
use crate::remote::transport::{HttpTransport, Transport};
use crate::storage::KeyValueStore;
use crate::store::{Store, StoreConfig};
use crate::update::{self, LatestVersionCache, ProductDetails, UpdateDelta};
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct Sdk {
    env: Environment,
    kv: Arc<dyn KeyValueStore>,
    client: ApiClient,
    cache: LatestVersionCache,
    licenses: LicenseManager,
    stores: BTreeMap<String, Store>,
}

impl std::fmt::Debug for Sdk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sdk")
            .field("env", &self.env)
            .field("stores", &self.stores.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Sdk {
    /// Production wiring: system clock and blocking HTTP transport.
    pub fn new(env: Environment, kv: Arc<dyn KeyValueStore>) -> Self {
        Self::with_parts(env, kv, Arc::new(SystemClock), Arc::new(HttpTransport))
    }

    /// Full dependency injection, used by tests and embedders with their
    /// own transport.
    pub fn with_parts(
        env: Environment,
        kv: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let breaker = CircuitBreaker::new(kv.clone(), clock.clone());
        let client = ApiClient::new(transport, breaker, env.clone());
        let cache = LatestVersionCache::new(kv.clone(), clock.clone());
        let licenses = LicenseManager::new(kv.clone(), clock);

        Self {
            env,
            kv,
            client,
            cache,
            licenses,
            stores: BTreeMap::new(),
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Registers a store, or returns the existing one when the id is
    /// already taken — integrations re-register on every process start, so
    /// duplicate registration is the normal case, not an error.
    pub fn register_store(&mut self, config: StoreConfig) -> Result<&mut Store, ConfigError> {
        let store = Store::new(config, &self.env.site_url)?;
        let id = store.id().to_string();
        Ok(self.stores.entry(id).or_insert(store))
    }

    pub fn store(&self, id: &str) -> Option<&Store> {
        self.stores.get(id)
    }

    /// Registered stores in stable id order.
    pub fn stores(&self) -> impl Iterator<Item = &Store> {
        self.stores.values()
    }

    /// Looks a product up by id across all stores.
    pub fn product(&self, product_id: &str) -> Option<(&Store, &Product)> {
        self.stores
            .values()
            .find_map(|store| store.product(product_id).map(|product| (store, product)))
    }

    /// Update sweep over every store's products of `kind`. At most one
    /// batched request per store, covering all of its products so the
    /// cached result serves plugin and theme sweeps alike; a failing store
    /// is skipped for this cycle and never aborts the sweep.
    pub fn check_updates(&self, kind: ProductKind) -> UpdateDelta {
        let mut delta = UpdateDelta::default();

        for store in self.stores.values() {
            let products = store.products_of_kind(kind);
            if products.is_empty() {
                continue;
            }

            match self.cache.latest_versions(&self.client, store, None) {
                Ok(latest) => delta.merge(update::reconcile(&products, &latest)),
                Err(e) => {
                    tracing::warn!(store = store.id(), error = %e, "store skipped for this update cycle");
                }
            }
        }

        delta
    }

    /// Detail record for the "view version details" screen. Stores are
    /// tried in order; a store that fails or doesn't know the product is
    /// skipped.
    pub fn version_details(&self, kind: ProductKind, slug: &str) -> Option<ProductDetails> {
        for store in self.stores.values() {
            let matching: Vec<&Product> = store
                .products()
                .filter(|p| p.kind() == kind && p.slug() == slug)
                .collect();
            if matching.is_empty() {
                continue;
            }

            match self.cache.latest_versions(&self.client, store, None) {
                Ok(latest) => {
                    if let Some(details) = update::reconcile_one(matching[0], &latest) {
                        return Some(details);
                    }
                }
                Err(e) => {
                    tracing::debug!(store = store.id(), error = %e, "version details unavailable");
                }
            }
        }

        None
    }

    pub fn activate_license(
        &self,
        product_id: &str,
        key: &str,
    ) -> Result<LicenseRecord, LicenseError> {
        let (store, product) = self.resolve(product_id)?;
        self.licenses.activate(&self.client, store, product, key)
    }

    pub fn deactivate_license(&self, product_id: &str) -> Result<LicenseRecord, LicenseError> {
        let (store, product) = self.resolve(product_id)?;
        self.licenses.deactivate(&self.client, store, product)
    }

    /// Clears the stored key and record. Local-only.
    pub fn delete_license(&self, product_id: &str) -> Result<(), LicenseError> {
        let (_, product) = self.resolve(product_id)?;
        self.licenses.delete(product);
        Ok(())
    }

    pub fn license_record(&self, product_id: &str) -> Option<LicenseRecord> {
        let (_, product) = self.product(product_id)?;
        self.licenses.record(product)
    }

    pub fn license_state(&self, product_id: &str) -> Option<LicenseState> {
        let (_, product) = self.product(product_id)?;
        Some(self.licenses.state(product))
    }

    pub fn license_action(&self, product_id: &str) -> Option<LicenseAction> {
        let (_, product) = self.product(product_id)?;
        Some(self.licenses.allowed_action(product))
    }

    pub fn license_status_message(&self, product_id: &str) -> Option<String> {
        let (_, product) = self.product(product_id)?;
        self.licenses.status_message(product)
    }

    /// The backing key-value store, for embedders that share it.
    pub fn key_value_store(&self) -> &Arc<dyn KeyValueStore> {
        &self.kv
    }

    fn resolve(&self, product_id: &str) -> Result<(&Store, &Product), LicenseError> {
        self.product(product_id)
            .ok_or_else(|| LicenseError::UnknownProduct(product_id.to_string()))
    }
}
