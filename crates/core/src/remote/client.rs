//! Store API client
//!
//! One request/response exchange with a store, with the policy the rest of
//! the SDK relies on: standard environment parameters attached, a uniform
//! timeout, the circuit breaker consulted before and fed after every
//! exchange, and JSON decoding with typed failures. The client never
//! retries and never interprets license/update semantics — that belongs to
//! the callers.

use crate::env::Environment;
use crate::error::TransportError;
use crate::remote::breaker::CircuitBreaker;
use crate::remote::transport::{ApiRequest, Method, Transport};
use crate::store::Store;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// Uniform timeout for every store exchange.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub struct ApiClient {
    transport: Arc<dyn Transport>,
    breaker: CircuitBreaker,
    env: Environment,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, breaker: CircuitBreaker, env: Environment) -> Self {
        Self {
            transport,
            breaker,
            env,
        }
    }

    /// Performs one exchange with `store` and decodes the JSON body.
    ///
    /// The `url` and `environment` parameters are filled in unless the
    /// caller supplied them. Transport failures and non-2xx responses feed
    /// the circuit breaker; a malformed body does not (the host answered,
    /// it just answered garbage).
    pub fn request(
        &self,
        store: &Store,
        params: Map<String, Value>,
        method: Method,
    ) -> Result<Value, TransportError> {
        let host_key = CircuitBreaker::host_key(store.api_url());
        if !self.breaker.should_attempt(&host_key) {
            tracing::debug!(store = store.id(), "skipping request, host is cooling down");
            return Err(TransportError::CircuitOpen);
        }

        let mut params = params;
        params
            .entry("url")
            .or_insert_with(|| Value::String(self.env.site_url.clone()));
        params
            .entry("environment")
            .or_insert_with(|| Value::String(self.env.label.to_string()));

        let request = ApiRequest {
            url: store.api_url().to_string(),
            method,
            params,
            timeout: REQUEST_TIMEOUT,
            verify_tls: store.verify_tls(),
        };

        let response = match self.transport.send(&request) {
            Ok(response) => response,
            Err(e) => {
                self.breaker.record_failure(&host_key);
                return Err(e);
            }
        };

        if !response.is_success() {
            self.breaker.record_failure(&host_key);
            return Err(TransportError::Status {
                status: response.status,
                body: response.body,
            });
        }

        serde_json::from_str(&response.body)
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::env::EnvironmentLabel;
    use crate::error::TransportError;
    use crate::remote::transport::ApiResponse;
    use crate::storage::MemoryStore;
    use crate::store::StoreConfig;
    use crate::testutil::ScriptedTransport;
    use serde_json::json;

    fn fixture(
        outcomes: Vec<Result<ApiResponse, TransportError>>,
    ) -> (ApiClient, Arc<ScriptedTransport>, Arc<MemoryStore>, Store) {
        let transport = Arc::new(ScriptedTransport::new(outcomes));
        let kv = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(1_000));
        let breaker = CircuitBreaker::new(kv.clone(), clock);
        let env = Environment::new("https://customer.example", EnvironmentLabel::Staging);
        let client = ApiClient::new(transport.clone(), breaker, env);
        let store = Store::new(
            StoreConfig::new("https://store.example.com"),
            "https://customer.example",
        )
        .unwrap();
        (client, transport, kv, store)
    }

    #[test]
    fn environment_defaults_are_attached() {
        let (client, transport, _, store) = fixture(vec![ScriptedTransport::ok(200, "{}")]);
        client.request(&store, Map::new(), Method::Get).unwrap();

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[0].params["url"], json!("https://customer.example"));
        assert_eq!(seen[0].params["environment"], json!("staging"));
        assert_eq!(seen[0].timeout, REQUEST_TIMEOUT);
    }

    #[test]
    fn caller_supplied_parameters_win() {
        let (client, transport, _, store) = fixture(vec![ScriptedTransport::ok(200, "{}")]);
        let mut params = Map::new();
        params.insert("url".to_string(), json!("https://override.example"));
        client.request(&store, params, Method::Get).unwrap();

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[0].params["url"], json!("https://override.example"));
    }

    #[test]
    fn non_2xx_becomes_status_error_and_trips_breaker() {
        let (client, transport, _, store) =
            fixture(vec![ScriptedTransport::ok(500, "boom"), ScriptedTransport::ok(200, "{}")]);

        let err = client.request(&store, Map::new(), Method::Get).unwrap_err();
        match err {
            TransportError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // Second call is short-circuited without touching the transport.
        let err = client.request(&store, Map::new(), Method::Get).unwrap_err();
        assert!(matches!(err, TransportError::CircuitOpen));
        assert_eq!(transport.calls(), 1);
    }

    #[test]
    fn malformed_body_is_invalid_response_and_does_not_trip_breaker() {
        let (client, transport, _, store) = fixture(vec![
            ScriptedTransport::ok(200, "<html>not json</html>"),
            ScriptedTransport::ok(200, "{\"ok\":true}"),
        ]);

        let err = client.request(&store, Map::new(), Method::Get).unwrap_err();
        assert!(matches!(err, TransportError::InvalidResponse(_)));

        // The host is not cooling down; the next call goes through.
        let value = client.request(&store, Map::new(), Method::Get).unwrap();
        assert_eq!(value["ok"], json!(true));
        assert_eq!(transport.calls(), 2);
    }
}
