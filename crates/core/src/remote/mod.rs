//! Remote store communication
//!
//! Three layers, bottom up:
//! - `transport`: one request/response exchange behind an injectable trait
//! - `breaker`: per-host cooldown after a failure
//! - `client`: parameter defaults, timeout policy, JSON decoding, and the
//!   breaker check in front of every exchange

pub mod breaker;
pub mod client;
pub mod transport;

pub use breaker::CircuitBreaker;
pub use client::ApiClient;
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, Transport};
