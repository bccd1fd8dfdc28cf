//! Integration tests for Kiosk.
//!
//! # Test Categories
//!
//! - `cart_flow` - add/update/remove/clear flows and derived totals
//! - `cart_refresh` - full-cart reconciliation against live inventory
//!
//! This crate provides the shared fixtures: a scriptable in-process
//! inventory oracle and catalog descriptor builders. The HTTP wire
//! behavior of the real client is covered separately in `kiosk-cart`'s
//! wiremock tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use kiosk_cart::inventory::{InventoryError, InventoryOracle, InventoryStatus};
use kiosk_cart::types::{Product, ProductVariant};
use kiosk_core::{ProductId, VariantId};
use rust_decimal::Decimal;

/// Initialize test logging once; safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Scripted outcome for one product/variant key.
#[derive(Debug, Clone)]
pub enum OracleOutcome {
    /// Respond with this status.
    Available(InventoryStatus),
    /// Respond with the distinguishable not-found signal.
    NotFound,
    /// Respond with a transport/server failure.
    Unreachable,
}

/// In-process inventory oracle scripted per composite key.
///
/// Clones share the same script, so a test can keep a handle and re-script
/// outcomes after the cart has taken ownership of its copy (e.g. stock ran
/// out between add and refresh). Unknown keys answer not-found, matching a
/// catalog that has never heard of the product.
#[derive(Debug, Clone, Default)]
pub struct MockOracle {
    inner: Rc<RefCell<MockOracleInner>>,
}

#[derive(Debug, Default)]
struct MockOracleInner {
    outcomes: HashMap<String, OracleOutcome>,
    calls: u32,
}

impl MockOracle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the outcome for a product (or product/variant pair).
    #[must_use]
    pub fn with(self, product_id: &str, variant_id: Option<&str>, outcome: OracleOutcome) -> Self {
        self.set(product_id, variant_id, outcome);
        self
    }

    /// Re-script an outcome on a live oracle.
    pub fn set(&self, product_id: &str, variant_id: Option<&str>, outcome: OracleOutcome) {
        self.inner
            .borrow_mut()
            .outcomes
            .insert(oracle_key(product_id, variant_id), outcome);
    }

    /// How many checks have been issued so far.
    #[must_use]
    pub fn calls(&self) -> u32 {
        self.inner.borrow().calls
    }
}

fn oracle_key(product_id: &str, variant_id: Option<&str>) -> String {
    format!("{product_id}{}", variant_id.unwrap_or(""))
}

impl InventoryOracle for MockOracle {
    async fn check(
        &self,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
    ) -> Result<InventoryStatus, InventoryError> {
        let key = oracle_key(product_id.as_str(), variant_id.map(VariantId::as_str));
        let mut inner = self.inner.borrow_mut();
        inner.calls += 1;
        match inner.outcomes.get(&key) {
            Some(OracleOutcome::Available(status)) => Ok(status.clone()),
            Some(OracleOutcome::Unreachable) => Err(InventoryError::Api {
                status: 502,
                message: "upstream unreachable".to_string(),
            }),
            Some(OracleOutcome::NotFound) | None => Err(InventoryError::NotFound(key)),
        }
    }
}

/// Status for an active item with a tracked stock count.
#[must_use]
pub fn in_stock(quantity: u32) -> InventoryStatus {
    InventoryStatus {
        is_active: true,
        track_inventory: true,
        inventory_quantity: quantity,
        price: None,
        sku: None,
        title: None,
    }
}

/// Status for an active item whose stock is not tracked.
#[must_use]
pub fn always_available() -> InventoryStatus {
    InventoryStatus {
        is_active: true,
        track_inventory: false,
        inventory_quantity: 0,
        price: None,
        sku: None,
        title: None,
    }
}

/// Status for an item the catalog has marked inactive.
#[must_use]
pub fn discontinued() -> InventoryStatus {
    InventoryStatus {
        is_active: false,
        track_inventory: false,
        inventory_quantity: 0,
        price: None,
        sku: None,
        title: None,
    }
}

/// Catalog product fixture priced in whole cents.
#[must_use]
pub fn product(id: &str, title: &str, price_cents: i64) -> Product {
    Product {
        id: ProductId::new(id),
        title: title.to_string(),
        slug: title.to_lowercase().replace(' ', "-"),
        price: Decimal::new(price_cents, 2),
        sku: Some(format!("SKU-{id}")),
        featured_image: Some(format!("https://cdn.example.com/{id}.jpg")),
    }
}

/// Variant fixture with a size and optional price override.
#[must_use]
pub fn variant(id: &str, size: &str, price_cents: Option<i64>) -> ProductVariant {
    ProductVariant {
        id: VariantId::new(id),
        title: Some(size.to_string()),
        size: Some(size.to_string()),
        color: None,
        material: None,
        price: price_cents.map(|cents| Decimal::new(cents, 2)),
        sku: None,
        featured_image: None,
    }
}
