//! Error types at the service boundaries.
//!
//! [`CartError`] is `Clone` so the engine can keep the last failure in a
//! retrievable field while also returning it to the caller.

use rust_decimal::Decimal;
use thiserror::Error;

use harvest_core::{LineId, QuantityError};

use crate::local_store::StoreError;
use crate::ports::BackendError;

/// Cart engine error taxonomy.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CartError {
    /// Quantity was zero, negative or not a number. Raised before any I/O.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(#[from] QuantityError),

    /// The operation needs a valid client session.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The backend could not be reached.
    #[error("network failure: {0}")]
    NetworkFailure(String),

    /// The backend refused the operation; message is the backend's own.
    #[error("{0}")]
    ServerRejected(String),

    /// No line with this ID in the cart.
    #[error("cart line not found: {0}")]
    LineNotFound(LineId),

    /// The guest cart slot could not be read or written.
    #[error("local store error: {0}")]
    LocalStore(String),

    /// The engine was detached from its owner.
    #[error("cart engine detached")]
    Detached,
}

impl From<BackendError> for CartError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Network(_) | BackendError::Decode(_) => {
                Self::NetworkFailure(err.to_string())
            }
            BackendError::Rejected(msg) => Self::ServerRejected(msg),
            BackendError::NotFound(_) => Self::ServerRejected(err.to_string()),
            BackendError::Unauthorized => Self::NotAuthenticated,
        }
    }
}

impl From<StoreError> for CartError {
    fn from(err: StoreError) -> Self {
        Self::LocalStore(err.to_string())
    }
}

impl CartError {
    /// Whether retrying the same call later may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkFailure(_) | Self::LocalStore(_))
    }
}

/// Catalog store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// Backend call failed.
    #[error("catalog backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Producer inventory errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InventoryError {
    /// The operation needs a valid producer session.
    #[error("not authenticated as a producer")]
    NotAuthenticated,

    /// Stock figures can't be negative.
    #[error("invalid stock: {0}")]
    InvalidStock(Decimal),

    /// Backend call failed.
    #[error("inventory backend error: {0}")]
    Backend(BackendError),
}

impl From<BackendError> for InventoryError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Unauthorized => Self::NotAuthenticated,
            other => Self::Backend(other),
        }
    }
}
