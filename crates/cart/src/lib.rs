//! Cart state manager with inventory reconciliation.
//!
//! # Architecture
//!
//! - The catalog and stock counts live in an external system; the cart only
//!   holds the shopper's intent, validated against a remote inventory-check
//!   endpoint on every add
//! - No caching of inventory responses - stock answers must be live
//! - The item list is persisted as a whole to a device-local store after
//!   every mutation and restored on startup
//!
//! # Components
//!
//! - [`store::CartStore`] - the in-memory line-item aggregate and its
//!   mutation operations
//! - [`inventory`] - the inventory oracle trait and its HTTP client
//! - [`storage`] - pluggable persistence backends (file, in-memory)
//! - [`config`] - environment-driven configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use kiosk_cart::config::CartConfig;
//! use kiosk_cart::inventory::InventoryClient;
//! use kiosk_cart::storage::FileStorage;
//! use kiosk_cart::store::CartStore;
//!
//! let config = CartConfig::from_env()?;
//! let oracle = InventoryClient::new(&config.inventory)?;
//! let storage = FileStorage::new(&config.storage_dir);
//! let mut cart = CartStore::restore(oracle, storage)?;
//!
//! cart.add_item(&product, Some(&variant), 1).await?;
//! let summary = cart.refresh_inventory().await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod inventory;
pub mod storage;
pub mod store;
pub mod types;

pub use error::CartError;
pub use inventory::{InventoryClient, InventoryError, InventoryOracle, InventoryStatus};
pub use storage::{CartStorage, FileStorage, MemoryStorage, StorageError};
pub use store::CartStore;
pub use types::{
    CartItem, Product, ProductVariant, QuantityChange, RefreshSummary, RemovalReason, RemovedItem,
};
