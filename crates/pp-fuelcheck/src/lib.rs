//! pp-fuelcheck
//!
//! Upstream boundary: the [`Upstream`] contract the sync runner consumes and
//! the NSW FuelCheck implementation of it.
//!
//! The client fetches everything during `init` and serves snapshots from
//! memory afterwards. Accessors called before a successful `init` return
//! empty collections.

use std::fmt;

use async_trait::async_trait;
use pp_schemas::{Brand, Fueltype, InitState, Price, Station};

pub mod address;
mod client;
pub mod geohash;
pub mod timestamp;
pub mod token;
mod wire;

pub use client::{FuelCheckClient, FuelCheckConfig};
pub use token::{AccessToken, TokenCache};
pub use wire::PriceIngest;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum FuelCheckError {
    /// Network or transport failure.
    Transport(String),
    /// Credentials or token rejected.
    Unauthorized(String),
    /// The API answered with a non-success status.
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },
    /// A response payload could not be decoded.
    Decode(String),
    /// Token cache could not be written.
    TokenCache(String),
    /// Client construction or settings problem.
    Config(String),
}

impl fmt::Display for FuelCheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FuelCheckError::Transport(msg) => write!(f, "transport error: {msg}"),
            FuelCheckError::Unauthorized(msg) => write!(f, "unauthorized: {msg}"),
            FuelCheckError::Api {
                status,
                code: Some(c),
                message,
            } => write!(f, "fuelcheck api error status={status} code={c}: {message}"),
            FuelCheckError::Api {
                status,
                code: None,
                message,
            } => write!(f, "fuelcheck api error status={status}: {message}"),
            FuelCheckError::Decode(msg) => write!(f, "decode error: {msg}"),
            FuelCheckError::TokenCache(msg) => write!(f, "token cache error: {msg}"),
            FuelCheckError::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for FuelCheckError {}

// ---------------------------------------------------------------------------
// Upstream contract
// ---------------------------------------------------------------------------

/// Source of upstream truth for one sync run.
#[async_trait]
pub trait Upstream: Send + Sync {
    fn name(&self) -> &'static str;

    fn state(&self) -> &InitState;

    /// Authenticate and fetch every snapshot. Sets `state` either way.
    async fn init(&mut self) -> Result<(), FuelCheckError>;

    fn brands(&self) -> Vec<Brand>;

    fn fueltypes(&self) -> Vec<Fueltype>;

    fn stations(&self) -> Vec<Station>;

    fn prices(&self) -> Vec<Price>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_api_with_code() {
        let err = FuelCheckError::Api {
            status: 400,
            code: Some("E0012".into()),
            message: "bad request".into(),
        };
        assert_eq!(
            err.to_string(),
            "fuelcheck api error status=400 code=E0012: bad request"
        );
    }

    #[test]
    fn error_display_api_without_code() {
        let err = FuelCheckError::Api {
            status: 503,
            code: None,
            message: "unavailable".into(),
        };
        assert_eq!(err.to_string(), "fuelcheck api error status=503: unavailable");
    }
}
