//! License lifecycle
//!
//! Activation and deactivation talk to the store directly (through the
//! circuit breaker, never through the version cache) and persist the
//! resulting record next to the key. Deleting is local-only: it clears the
//! key and record without telling the store, so the activation slot is not
//! freed remotely — a deliberate simplification.

pub mod messages;
pub mod record;

pub use record::{LicenseRecord, LicenseStatus};

use crate::clock::Clock;
use crate::error::LicenseError;
use crate::product::Product;
use crate::remote::client::ApiClient;
use crate::remote::transport::Method;
use crate::storage::KeyValueStore;
use crate::store::Store;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Where a product's license currently stands, derived from the stored key
/// and record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseState {
    /// No key stored.
    Unlicensed,
    /// Key stored but never confirmed by the store.
    PendingActivation,
    /// Store confirmed the key is activated and usable here.
    Active,
    /// Key retained after an explicit deactivation.
    Inactive,
    /// The store reported a problem that needs the admin's attention.
    NeedsAttention(LicenseStatus),
}

/// The one action the admin surface should offer for a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseAction {
    Activate,
    Deactivate,
}

/// License endpoint response envelope.
#[derive(Debug, Deserialize)]
struct LicenseResponse {
    #[serde(default)]
    success: bool,
    /// Resulting status, e.g. `valid` or `deactivated`.
    #[serde(default)]
    license: Option<LicenseStatus>,
    /// Error code on failure.
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    expires: Option<String>,
    #[serde(default)]
    item_name: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

pub struct LicenseManager {
    kv: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl LicenseManager {
    pub fn new(kv: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { kv, clock }
    }

    /// Last persisted record, if any.
    pub fn record(&self, product: &Product) -> Option<LicenseRecord> {
        let raw = self.kv.get(product.record_option())?;
        serde_json::from_str(&raw).ok()
    }

    /// Current state of the product's license.
    pub fn state(&self, product: &Product) -> LicenseState {
        if product.license_key(&*self.kv).is_none() {
            return LicenseState::Unlicensed;
        }
        match self.record(product) {
            None => LicenseState::PendingActivation,
            Some(record) if record.activated && record.status.is_usable() => LicenseState::Active,
            Some(record)
                if matches!(
                    record.status,
                    LicenseStatus::Deactivated | LicenseStatus::Inactive
                ) =>
            {
                LicenseState::Inactive
            }
            Some(record) => LicenseState::NeedsAttention(record.status),
        }
    }

    /// Which button the admin surface should render.
    pub fn allowed_action(&self, product: &Product) -> LicenseAction {
        match self.state(product) {
            LicenseState::Active => LicenseAction::Deactivate,
            _ => LicenseAction::Activate,
        }
    }

    /// Display text for the current record.
    pub fn status_message(&self, product: &Product) -> Option<String> {
        let record = self.record(product)?;
        Some(messages::status_message(
            &record,
            self.clock.now(),
            Some(product),
        ))
    }

    /// Activates `key` for the product. On success the key and the record
    /// reported by the store are persisted; on rejection nothing changes
    /// locally and the error carries a display-ready message.
    pub fn activate(
        &self,
        client: &ApiClient,
        store: &Store,
        product: &Product,
        key: &str,
    ) -> Result<LicenseRecord, LicenseError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(LicenseError::MissingKey);
        }

        let response = self.exchange(client, store, product, "activate_license", key)?;

        if !response.success {
            let code = response.error.unwrap_or_default();
            let message = messages::rejection_message(
                &code,
                response.expires.as_deref(),
                response.item_name.as_deref(),
                Some(product),
            );
            tracing::info!(product = product.id(), code, "license activation rejected");
            return Err(LicenseError::Rejected {
                code: (!code.is_empty()).then_some(code),
                message,
            });
        }

        let record = self.build_record(response, true);
        product.set_license_key(&*self.kv, Some(key));
        self.persist(product, &record);
        Ok(record)
    }

    /// Deactivates the product's stored key. The key itself is retained so
    /// the admin can reactivate without retyping it.
    pub fn deactivate(
        &self,
        client: &ApiClient,
        store: &Store,
        product: &Product,
    ) -> Result<LicenseRecord, LicenseError> {
        let key = product
            .license_key(&*self.kv)
            .ok_or(LicenseError::MissingKey)?;

        let response = self.exchange(client, store, product, "deactivate_license", &key)?;

        if !response.success {
            let code = response.error.unwrap_or_default();
            let message = messages::rejection_message(
                &code,
                response.expires.as_deref(),
                response.item_name.as_deref(),
                Some(product),
            );
            return Err(LicenseError::Rejected {
                code: (!code.is_empty()).then_some(code),
                message,
            });
        }

        let mut record = self.build_record(response, false);
        if record.status.is_usable() {
            // Stores answer deactivations with the key's overall status;
            // locally this site is no longer activated.
            record.status = LicenseStatus::Deactivated;
        }
        self.persist(product, &record);
        Ok(record)
    }

    /// Clears the key and record. Local-only: the store is not notified and
    /// the activation slot stays used until it expires remotely.
    pub fn delete(&self, product: &Product) {
        product.set_license_key(&*self.kv, None);
        self.kv.delete(product.record_option());
    }

    fn exchange(
        &self,
        client: &ApiClient,
        store: &Store,
        product: &Product,
        action: &str,
        key: &str,
    ) -> Result<LicenseResponse, LicenseError> {
        let mut params = Map::new();
        params.insert("action".to_string(), json!(action));
        params.insert("license".to_string(), json!(key));
        params.insert("item_id".to_string(), json!(product.item_id()));

        let value = client.request(store, params, Method::Get)?;
        serde_json::from_value(value).map_err(|e| {
            LicenseError::Transport(crate::error::TransportError::InvalidResponse(e.to_string()))
        })
    }

    fn build_record(&self, response: LicenseResponse, activated: bool) -> LicenseRecord {
        LicenseRecord {
            status: response.license.unwrap_or(if activated {
                LicenseStatus::Valid
            } else {
                LicenseStatus::Deactivated
            }),
            activated,
            expires: response.expires,
            item_name: response.item_name,
            last_sync: Some(self.clock.now()),
            extra: response.extra,
        }
    }

    fn persist(&self, product: &Product, record: &LicenseRecord) {
        match serde_json::to_string(record) {
            Ok(json) => self.kv.set(product.record_option(), &json),
            Err(e) => {
                tracing::warn!(product = product.id(), error = %e, "failed to persist license")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::env::Environment;
    use crate::error::TransportError;
    use crate::product::ProductConfig;
    use crate::remote::breaker::CircuitBreaker;
    use crate::storage::MemoryStore;
    use crate::store::StoreConfig;
    use crate::testutil::ScriptedTransport;

    const SITE: &str = "https://customer.example";

    struct Fixture {
        manager: LicenseManager,
        client: ApiClient,
        transport: Arc<ScriptedTransport>,
        kv: Arc<MemoryStore>,
        store: Store,
        product: Product,
    }

    fn fixture(
        outcomes: Vec<Result<crate::remote::transport::ApiResponse, TransportError>>,
    ) -> Fixture {
        let transport = Arc::new(ScriptedTransport::new(outcomes));
        let kv = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(50_000));
        let breaker = CircuitBreaker::new(kv.clone(), clock.clone());
        let client = ApiClient::new(transport.clone(), breaker, Environment::production(SITE));
        let manager = LicenseManager::new(kv.clone(), clock);
        let store = Store::new(StoreConfig::new("https://store.example.com"), SITE).unwrap();
        let product =
            Product::new(ProductConfig::plugin(42, "p/p.toml", "1.0"), "store_a").unwrap();

        Fixture {
            manager,
            client,
            transport,
            kv,
            store,
            product,
        }
    }

    #[test]
    fn activation_persists_key_and_record() {
        let f = fixture(vec![ScriptedTransport::ok(
            200,
            r#"{"success":true,"license":"valid","expires":"2027-03-01 23:59:59","item_name":"My Plugin"}"#,
        )]);

        let record = f
            .manager
            .activate(&f.client, &f.store, &f.product, " key-123 ")
            .unwrap();

        assert_eq!(record.status, LicenseStatus::Valid);
        assert!(record.activated);
        assert_eq!(record.last_sync, Some(50_000));
        assert_eq!(
            f.product.license_key(&*f.kv),
            Some("key-123".to_string())
        );
        assert_eq!(f.manager.state(&f.product), LicenseState::Active);
        assert_eq!(
            f.manager.allowed_action(&f.product),
            LicenseAction::Deactivate
        );

        // The request carried the license action parameters.
        let seen = f.transport.seen.lock().unwrap();
        assert_eq!(seen[0].params["action"], "activate_license");
        assert_eq!(seen[0].params["license"], "key-123");
        assert_eq!(seen[0].params["item_id"], 42);
        assert_eq!(seen[0].method, Method::Get);
    }

    #[test]
    fn expired_rejection_formats_the_date_and_persists_nothing() {
        let f = fixture(vec![ScriptedTransport::ok(
            200,
            r#"{"success":false,"error":"expired","expires":"2024-01-01"}"#,
        )]);

        let err = f
            .manager
            .activate(&f.client, &f.store, &f.product, "key-123")
            .unwrap_err();

        match err {
            LicenseError::Rejected { code, message } => {
                assert_eq!(code.as_deref(), Some("expired"));
                assert!(message.contains("January 1, 2024"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(f.product.license_key(&*f.kv), None);
        assert!(f.manager.record(&f.product).is_none());
    }

    #[test]
    fn limit_rejection_uses_the_limit_message() {
        let f = fixture(vec![ScriptedTransport::ok(
            200,
            r#"{"success":false,"error":"no_activations_left"}"#,
        )]);

        let err = f
            .manager
            .activate(&f.client, &f.store, &f.product, "key-123")
            .unwrap_err();
        assert!(err
            .user_message()
            .contains("reached its activation limit"));
    }

    #[test]
    fn unknown_rejection_code_gets_the_generic_message() {
        let f = fixture(vec![ScriptedTransport::ok(
            200,
            r#"{"success":false,"error":"gamma_burst"}"#,
        )]);

        let err = f
            .manager
            .activate(&f.client, &f.store, &f.product, "key-123")
            .unwrap_err();
        assert_eq!(err.user_message(), "An error occurred, please try again.");
    }

    #[test]
    fn blank_key_is_rejected_before_any_network_call() {
        let f = fixture(vec![]);
        let err = f
            .manager
            .activate(&f.client, &f.store, &f.product, "   ")
            .unwrap_err();
        assert!(matches!(err, LicenseError::MissingKey));
        assert_eq!(f.transport.calls(), 0);
    }

    #[test]
    fn deactivation_retains_the_key() {
        let f = fixture(vec![
            ScriptedTransport::ok(200, r#"{"success":true,"license":"valid"}"#),
            ScriptedTransport::ok(200, r#"{"success":true,"license":"deactivated"}"#),
        ]);

        f.manager
            .activate(&f.client, &f.store, &f.product, "key-123")
            .unwrap();
        let record = f
            .manager
            .deactivate(&f.client, &f.store, &f.product)
            .unwrap();

        assert_eq!(record.status, LicenseStatus::Deactivated);
        assert!(!record.activated);
        // Key kept for painless reactivation.
        assert_eq!(
            f.product.license_key(&*f.kv),
            Some("key-123".to_string())
        );
        assert_eq!(f.manager.state(&f.product), LicenseState::Inactive);
        assert_eq!(f.manager.allowed_action(&f.product), LicenseAction::Activate);
    }

    #[test]
    fn deactivation_without_a_key_is_missing_key() {
        let f = fixture(vec![]);
        let err = f
            .manager
            .deactivate(&f.client, &f.store, &f.product)
            .unwrap_err();
        assert!(matches!(err, LicenseError::MissingKey));
    }

    #[test]
    fn delete_clears_key_and_record_without_a_remote_call() {
        let f = fixture(vec![ScriptedTransport::ok(
            200,
            r#"{"success":true,"license":"valid"}"#,
        )]);
        f.manager
            .activate(&f.client, &f.store, &f.product, "key-123")
            .unwrap();

        f.manager.delete(&f.product);

        assert_eq!(f.product.license_key(&*f.kv), None);
        assert!(f.manager.record(&f.product).is_none());
        assert_eq!(f.manager.state(&f.product), LicenseState::Unlicensed);
        assert_eq!(f.transport.calls(), 1);
    }

    #[test]
    fn key_without_record_is_pending_activation() {
        let f = fixture(vec![]);
        f.product.set_license_key(&*f.kv, Some("key-123"));
        assert_eq!(f.manager.state(&f.product), LicenseState::PendingActivation);
    }

    #[test]
    fn problem_status_needs_attention() {
        let f = fixture(vec![]);
        f.product.set_license_key(&*f.kv, Some("key-123"));
        f.kv.set(
            f.product.record_option(),
            r#"{"status":"expired","activated":false}"#,
        );
        assert_eq!(
            f.manager.state(&f.product),
            LicenseState::NeedsAttention(LicenseStatus::Expired)
        );
        let message = f.manager.status_message(&f.product).unwrap();
        assert!(message.contains("expired"), "{message}");
    }

    #[test]
    fn transport_failure_surfaces_as_license_error() {
        let f = fixture(vec![ScriptedTransport::failing()]);
        let err = f
            .manager
            .activate(&f.client, &f.store, &f.product, "key-123")
            .unwrap_err();
        assert!(matches!(err, LicenseError::Transport(_)));
        assert_eq!(err.user_message(), "An error occurred, please try again.");
    }
}
