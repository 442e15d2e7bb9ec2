//! Shared unit-test fixtures

use crate::error::TransportError;
use crate::remote::transport::{ApiRequest, ApiResponse, Transport};
use std::sync::Mutex;

/// Scripted transport: pops the next canned outcome per call and records
/// every request it saw.
pub(crate) struct ScriptedTransport {
    outcomes: Mutex<Vec<Result<ApiResponse, TransportError>>>,
    pub seen: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new(mut outcomes: Vec<Result<ApiResponse, TransportError>>) -> Self {
        outcomes.reverse();
        Self {
            outcomes: Mutex::new(outcomes),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn ok(status: u16, body: &str) -> Result<ApiResponse, TransportError> {
        Ok(ApiResponse {
            status,
            body: body.to_string(),
        })
    }

    pub fn failing() -> Result<ApiResponse, TransportError> {
        Err(TransportError::Network("connection refused".to_string()))
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        self.seen.lock().unwrap().push(request.clone());
        self.outcomes
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Err(TransportError::Network("script exhausted".to_string())))
    }
}
