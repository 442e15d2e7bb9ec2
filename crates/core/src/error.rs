//! Error types
//!
//! Three failure domains, kept separate so call sites can't conflate them:
//! - `ConfigError`: registration-time mistakes by the integrating extension.
//!   Fail-fast; never produced at runtime.
//! - `TransportError`: anything that went wrong talking to a store. Always
//!   recoverable by skipping the store for the current cycle.
//! - `LicenseError`: a license operation that did not end in an active key,
//!   carrying the user-facing message.

use thiserror::Error;

/// Invalid store or product registration. Indicates a programming or
/// configuration mistake, not a runtime condition.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required product fields: {0}")]
    MissingFields(String),

    #[error("missing store api_url")]
    MissingApiUrl,

    #[error("invalid api_url {url}: {reason}")]
    InvalidApiUrl { url: String, reason: String },

    #[error("a site cannot ping itself: {0}")]
    SelfPing(String),
}

/// A failed exchange with a remote store.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected HTTP status {status}")]
    Status {
        status: u16,
        /// Raw response body, retained for diagnostics.
        body: String,
    },

    #[error("invalid response from API: {0}")]
    InvalidResponse(String),

    /// The host recently failed and is cooling down; no network attempt was
    /// made. Functionally equivalent to any other transport failure.
    #[error("host is cooling down after a recent failure")]
    CircuitOpen,
}

/// A license operation that did not succeed.
#[derive(Debug, Error)]
pub enum LicenseError {
    #[error("no license key to activate")]
    MissingKey,

    #[error("unknown product: {0}")]
    UnknownProduct(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The store rejected the operation. `message` is display-ready.
    #[error("{message}")]
    Rejected {
        /// Remote error code, when the store provided one.
        code: Option<String>,
        message: String,
    },
}

impl LicenseError {
    /// Display-ready message for the admin surface. Transport problems get
    /// the generic try-again wording rather than raw error details.
    pub fn user_message(&self) -> String {
        match self {
            LicenseError::Rejected { message, .. } => message.clone(),
            _ => crate::license::messages::generic_failure(),
        }
    }
}
