//! Per-store cache of version-check results
//!
//! One batched request per store per TTL window, everything else served from
//! the key-value store. A failed fetch caches an empty result for the rest
//! of the window so a failing endpoint isn't hammered on every page load —
//! unless caching is disabled (TTL 0), in which case nothing is ever
//! written. Concurrent callers may both miss and both fetch; last write
//! wins, which is acceptable because the cached value is a pure function of
//! remote state.

use crate::clock::Clock;
use crate::error::TransportError;
use crate::product::Product;
use crate::remote::client::ApiClient;
use crate::remote::transport::Method;
use crate::storage::{self, KeyValueStore};
use crate::store::Store;
use crate::update::VersionInfo;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Stored shape: fetch timestamp plus the raw per-product records.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEnvelope {
    time_stored: u64,
    data: BTreeMap<String, VersionInfo>,
}

pub struct LatestVersionCache {
    kv: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl LatestVersionCache {
    pub fn new(kv: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { kv, clock }
    }

    /// Latest version records for `products` (all of the store's products
    /// when `None`), from cache when the stored entry is still inside the
    /// store's TTL, otherwise via one batched remote request.
    ///
    /// Failures propagate to the caller even when an empty result was
    /// written back; treat them by skipping this store for the cycle.
    pub fn latest_versions(
        &self,
        client: &ApiClient,
        store: &Store,
        products: Option<&[&Product]>,
    ) -> Result<BTreeMap<String, VersionInfo>, TransportError> {
        if let Some(data) = self.read_valid(store) {
            tracing::debug!(store = store.id(), "serving versions from cache");
            return Ok(data);
        }

        let selected: Vec<&Product> = match products {
            Some(products) => products.to_vec(),
            None => store.products().collect(),
        };

        match self.fetch(client, store, &selected) {
            Ok(data) => {
                self.write(store, &data);
                Ok(data)
            }
            // An open circuit made no exchange; there is no failure to pin.
            Err(TransportError::CircuitOpen) => Err(TransportError::CircuitOpen),
            Err(e) => {
                tracing::warn!(store = store.id(), error = %e, "version check failed");
                self.write(store, &BTreeMap::new());
                Err(e)
            }
        }
    }

    fn read_valid(&self, store: &Store) -> Option<BTreeMap<String, VersionInfo>> {
        if store.cache_ttl() == 0 {
            return None;
        }

        let raw = self.kv.get(&storage::latest_cache_key(store.id()))?;
        let envelope: CacheEnvelope = serde_json::from_str(&raw).ok()?;

        if self.clock.now() < envelope.time_stored.saturating_add(store.cache_ttl()) {
            Some(envelope.data)
        } else {
            None
        }
    }

    fn write(&self, store: &Store, data: &BTreeMap<String, VersionInfo>) {
        if store.cache_ttl() == 0 {
            return;
        }

        let envelope = CacheEnvelope {
            time_stored: self.clock.now(),
            data: data.clone(),
        };
        match serde_json::to_string(&envelope) {
            Ok(json) => self.kv.set(&storage::latest_cache_key(store.id()), &json),
            Err(e) => tracing::warn!(store = store.id(), error = %e, "failed to cache versions"),
        }
    }

    /// One POST covering every selected product.
    fn fetch(
        &self,
        client: &ApiClient,
        store: &Store,
        products: &[&Product],
    ) -> Result<BTreeMap<String, VersionInfo>, TransportError> {
        let mut batch = Map::new();
        for product in products {
            batch.insert(product.id().to_string(), product.to_api_args(&*self.kv));
        }

        let mut params = Map::new();
        params.insert("products".to_string(), Value::Object(batch));

        let response = client.request(store, params, Method::Post)?;

        let records = response
            .get("products")
            .and_then(Value::as_object)
            .filter(|products| !products.is_empty())
            .ok_or_else(|| {
                TransportError::InvalidResponse("missing products in response".to_string())
            })?;

        serde_json::from_value(Value::Object(records.clone()))
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::env::Environment;
    use crate::product::ProductConfig;
    use crate::remote::breaker::CircuitBreaker;
    use crate::store::StoreConfig;
    use crate::testutil::ScriptedTransport;

    const SITE: &str = "https://customer.example";
    const TTL: u64 = 10_800; // 3 hours

    struct Fixture {
        cache: LatestVersionCache,
        client: ApiClient,
        transport: Arc<ScriptedTransport>,
        kv: Arc<crate::storage::MemoryStore>,
        clock: Arc<ManualClock>,
        store: Store,
    }

    fn fixture(ttl: u64, outcomes: Vec<Result<crate::remote::transport::ApiResponse, TransportError>>) -> Fixture {
        let transport = Arc::new(ScriptedTransport::new(outcomes));
        let kv = Arc::new(crate::storage::MemoryStore::new());
        let clock = Arc::new(ManualClock::new(1_000));
        let breaker = CircuitBreaker::new(kv.clone(), clock.clone());
        let client = ApiClient::new(transport.clone(), breaker, Environment::production(SITE));
        let cache = LatestVersionCache::new(kv.clone(), clock.clone());

        let mut store = Store::new(
            StoreConfig::new("https://store.example.com").cache_ttl(ttl),
            SITE,
        )
        .unwrap();
        store
            .add_product(ProductConfig::plugin(1, "p/p.toml", "1.0"))
            .unwrap();

        Fixture {
            cache,
            client,
            transport,
            kv,
            clock,
            store,
        }
    }

    fn ok_body() -> Result<crate::remote::transport::ApiResponse, TransportError> {
        ScriptedTransport::ok(
            200,
            r#"{"products":{"p/p.toml":{"new_version":"1.1","slug":"p"}}}"#,
        )
    }

    #[test]
    fn miss_fetches_and_writes_back() {
        let f = fixture(TTL, vec![ok_body()]);
        let data = f
            .cache
            .latest_versions(&f.client, &f.store, None)
            .unwrap();

        assert_eq!(data["p/p.toml"].new_version.as_deref(), Some("1.1"));
        assert_eq!(f.transport.calls(), 1);
        assert!(f.kv.get("lichen_latest_cache_store_example_com").is_some());
    }

    #[test]
    fn second_call_within_ttl_is_a_pure_cache_hit() {
        let f = fixture(TTL, vec![ok_body()]);
        f.cache.latest_versions(&f.client, &f.store, None).unwrap();
        let data = f.cache.latest_versions(&f.client, &f.store, None).unwrap();

        assert_eq!(data["p/p.toml"].new_version.as_deref(), Some("1.1"));
        assert_eq!(f.transport.calls(), 1);
    }

    #[test]
    fn entry_is_valid_up_to_but_not_at_ttl() {
        // Written at t=1000 with a 3h TTL: valid at 1000+10799, stale at
        // 1000+10800.
        let f = fixture(TTL, vec![ok_body(), ok_body()]);
        f.cache.latest_versions(&f.client, &f.store, None).unwrap();

        f.clock.set(1_000 + TTL - 1);
        f.cache.latest_versions(&f.client, &f.store, None).unwrap();
        assert_eq!(f.transport.calls(), 1);

        f.clock.set(1_000 + TTL);
        f.cache.latest_versions(&f.client, &f.store, None).unwrap();
        assert_eq!(f.transport.calls(), 2);
    }

    #[test]
    fn ttl_zero_always_fetches_and_never_writes() {
        let f = fixture(0, vec![ok_body(), ok_body()]);
        f.cache.latest_versions(&f.client, &f.store, None).unwrap();
        f.cache.latest_versions(&f.client, &f.store, None).unwrap();

        assert_eq!(f.transport.calls(), 2);
        assert!(f.kv.get("lichen_latest_cache_store_example_com").is_none());
    }

    #[test]
    fn failure_writes_back_an_empty_envelope_that_expires() {
        let f = fixture(TTL, vec![ScriptedTransport::failing(), ok_body()]);

        let err = f.cache.latest_versions(&f.client, &f.store, None).unwrap_err();
        assert!(matches!(err, TransportError::Network(_)));

        // The empty result is served for the rest of the window...
        let raw = f.kv.get("lichen_latest_cache_store_example_com").unwrap();
        let envelope: CacheEnvelope = serde_json::from_str(&raw).unwrap();
        assert!(envelope.data.is_empty());
        assert_eq!(envelope.time_stored, 1_000);
        let data = f.cache.latest_versions(&f.client, &f.store, None).unwrap();
        assert!(data.is_empty());
        assert_eq!(f.transport.calls(), 1);

        // ...and expires normally. The breaker cooldown (1h) also has to
        // lapse before the retry goes out.
        f.clock.set(1_000 + TTL);
        f.cache.latest_versions(&f.client, &f.store, None).unwrap();
        assert_eq!(f.transport.calls(), 2);
    }

    #[test]
    fn failure_with_ttl_zero_writes_nothing() {
        let f = fixture(0, vec![ScriptedTransport::failing()]);
        let err = f.cache.latest_versions(&f.client, &f.store, None).unwrap_err();
        assert!(matches!(err, TransportError::Network(_)));
        assert!(f.kv.get("lichen_latest_cache_store_example_com").is_none());
    }

    #[test]
    fn open_circuit_fails_fast_and_caches_nothing() {
        let f = fixture(TTL, vec![ScriptedTransport::failing()]);

        // First call trips the breaker and pins the empty envelope; clear
        // the envelope to observe the circuit-open path in isolation.
        f.cache.latest_versions(&f.client, &f.store, None).unwrap_err();
        f.kv.delete("lichen_latest_cache_store_example_com");

        let err = f.cache.latest_versions(&f.client, &f.store, None).unwrap_err();
        assert!(matches!(err, TransportError::CircuitOpen));
        assert!(f.kv.get("lichen_latest_cache_store_example_com").is_none());
        assert_eq!(f.transport.calls(), 1);
    }

    #[test]
    fn missing_products_in_response_is_invalid() {
        let f = fixture(TTL, vec![ScriptedTransport::ok(200, r#"{"products":{}}"#)]);
        let err = f.cache.latest_versions(&f.client, &f.store, None).unwrap_err();
        assert!(matches!(err, TransportError::InvalidResponse(_)));
    }

    #[test]
    fn batch_request_covers_all_products_in_one_call() {
        let f = fixture(TTL, vec![ok_body()]);
        let mut store = Store::new(
            StoreConfig::new("https://store.example.com").cache_ttl(TTL),
            SITE,
        )
        .unwrap();
        store
            .add_product(ProductConfig::plugin(1, "a/a.toml", "1.0"))
            .unwrap();
        store
            .add_product(ProductConfig::plugin(2, "b/b.toml", "2.0"))
            .unwrap();

        let _ = f.cache.latest_versions(&f.client, &store, None);

        assert_eq!(f.transport.calls(), 1);
        let seen = f.transport.seen.lock().unwrap();
        let batch = seen[0].params["products"].as_object().unwrap();
        assert_eq!(batch.len(), 2);
        assert!(batch.contains_key("a/a.toml"));
        assert!(batch.contains_key("b/b.toml"));
    }
}
