//! crates/stichelbuch_core/src/ports.rs
//!
//! Defines the service contracts (traits) the core depends on.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to stay independent of the concrete storage backend and randomness source.

use async_trait::async_trait;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Durable string-keyed storage, the local-storage analog.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns `None` when nothing was ever written under `key`.
    async fn get(&self, key: &str) -> PortResult<Option<String>>;

    /// Replaces whatever is stored under `key`.
    async fn set(&self, key: &str, value: &str) -> PortResult<()>;
}

/// Source of randomness for the "surprise me" pick.
pub trait RandomSource: Send {
    /// Returns an index in `0..len`. Callers never pass `len == 0`.
    fn pick_index(&mut self, len: usize) -> usize;
}
