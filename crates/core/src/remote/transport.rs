//! HTTP transport for store API requests
//!
//! The `Transport` trait is the seam between the SDK and the network: the
//! default implementation uses blocking reqwest, tests substitute scripted
//! responses. A transport only reports network-level failure; interpreting
//! status codes is the client's job.

use crate::error::TransportError;
use serde_json::{Map, Value};
use std::time::Duration;

/// HTTP method for a store exchange. License actions use GET with query
/// parameters; batched version checks POST a JSON body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A single outbound exchange.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub url: String,
    pub method: Method,
    /// Flat parameter bag. For GET, scalar values become query parameters;
    /// for POST the whole bag is the JSON body.
    pub params: Map<String, Value>,
    pub timeout: Duration,
    pub verify_tls: bool,
}

/// The raw result of an exchange, status uninterpreted.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs one exchange. Implementations must not retry.
pub trait Transport: Send + Sync {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// Blocking reqwest transport.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpTransport;

impl Transport for HttpTransport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(request.timeout)
            .danger_accept_invalid_certs(!request.verify_tls)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let builder = match request.method {
            Method::Get => client.get(&request.url).query(&query_pairs(&request.params)),
            Method::Post => client.post(&request.url).json(&request.params),
        };

        let response = builder
            .send()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(ApiResponse { status, body })
    }
}

/// Flattens scalar parameters into query pairs. Nested values don't occur on
/// GET endpoints; any that slip through are serialized as JSON text.
fn query_pairs(params: &Map<String, Value>) -> Vec<(String, String)> {
    params
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), text)
        })
        .collect()
}
