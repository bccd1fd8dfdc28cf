//! Cart operation errors.
//!
//! All variants carry user-presentable messages: callers surface them
//! directly (e.g. as a toast) rather than translating them. The store's
//! state is left unchanged whenever one of these is returned.

use thiserror::Error;

use crate::inventory::InventoryError;
use crate::storage::StorageError;

/// Errors returned by cart mutations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The inventory check itself failed (network, server error,
    /// unparseable body). Not retried automatically.
    #[error("{0}")]
    InventoryCheckFailed(String),

    /// The inventory service marked the product or variant inactive.
    #[error("{title} is no longer available")]
    ProductUnavailable { title: String },

    /// Tracked inventory reports zero stock.
    #[error("{title} is out of stock")]
    OutOfStock { title: String },

    /// The requested (or combined) quantity exceeds tracked stock.
    #[error("only {available} of {title} available (requested {requested})")]
    InsufficientStock {
        title: String,
        requested: u32,
        available: u32,
    },

    /// A reconciliation pass failed as a whole, outside the per-line loop.
    #[error("inventory refresh failed: {0}")]
    InventoryRefreshFailed(String),

    /// The persisted cart could not be read back.
    #[error("cart storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<InventoryError> for CartError {
    /// Collapse any oracle failure into a check failure carrying the
    /// service-provided message where one exists.
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::Api { message, .. } => Self::InventoryCheckFailed(message),
            other => Self::InventoryCheckFailed(other.to_string()),
        }
    }
}
