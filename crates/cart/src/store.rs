//! The cart aggregate and its mutation operations.
//!
//! `CartStore` holds the authoritative client-side view of what the shopper
//! intends to buy. Adds are validated against the inventory oracle before
//! any state changes; `refresh_inventory` reconciles the whole cart against
//! live stock in one pass. Quantity updates and removals are optimistic
//! local edits.
//!
//! Mutations take `&mut self`, so concurrent same-line mutations are
//! serialized by ownership rather than an internal lock.

use kiosk_core::LineItemId;
use rust_decimal::Decimal;

use crate::error::CartError;
use crate::inventory::InventoryOracle;
use crate::storage::CartStorage;
use crate::types::{
    CartItem, Product, ProductVariant, QuantityChange, RefreshSummary, RemovalReason, RemovedItem,
    line_item_id,
};

/// Fixed 7.5% VAT, a storewide policy (not region-aware).
fn vat_rate() -> Decimal {
    Decimal::new(75, 3)
}

/// In-memory, persisted cart.
///
/// Generic over its collaborators: `O` answers availability questions, `S`
/// persists the item list across reloads. Construct one per session and
/// pass it to whatever needs it - there is no ambient global cart.
#[derive(Debug)]
pub struct CartStore<O, S> {
    oracle: O,
    storage: S,
    items: Vec<CartItem>,
    /// Transient drawer-open UI flag; never persisted.
    open: bool,
}

impl<O: InventoryOracle, S: CartStorage> CartStore<O, S> {
    /// Create an empty cart.
    pub const fn new(oracle: O, storage: S) -> Self {
        Self {
            oracle,
            storage,
            items: Vec::new(),
            open: false,
        }
    }

    /// Restore the persisted cart, or start empty when nothing was stored.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Storage`] if a persisted snapshot exists but
    /// cannot be read back.
    pub fn restore(oracle: O, storage: S) -> Result<Self, CartError> {
        let items = storage.load()?.unwrap_or_default();
        Ok(Self {
            oracle,
            storage,
            items,
            open: false,
        })
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `quantity` of a product (or one of its variants) to the cart.
    ///
    /// Always checks the inventory oracle first, even for a line already in
    /// the cart, so price and availability are re-synced from the source of
    /// truth on every add. A quantity of 0 is treated as 1.
    ///
    /// # Errors
    ///
    /// - [`CartError::InventoryCheckFailed`] if the oracle call fails
    /// - [`CartError::ProductUnavailable`] if the item is inactive
    /// - [`CartError::OutOfStock`] if tracked stock is zero
    /// - [`CartError::InsufficientStock`] if the requested (or combined)
    ///   quantity exceeds tracked stock
    ///
    /// The cart is left unchanged on any failure.
    pub async fn add_item(
        &mut self,
        product: &Product,
        variant: Option<&ProductVariant>,
        quantity: u32,
    ) -> Result<(), CartError> {
        let quantity = quantity.max(1);
        let title = display_title(product, variant);

        let status = self
            .oracle
            .check(&product.id, variant.map(|v| &v.id))
            .await?;

        if !status.is_active {
            return Err(CartError::ProductUnavailable { title });
        }
        if status.track_inventory && status.inventory_quantity == 0 {
            return Err(CartError::OutOfStock { title });
        }

        let id = line_item_id(&product.id, variant.map(|v| &v.id));

        if let Some(item) = self.items.iter_mut().find(|i| i.id == id) {
            let new_quantity = item.quantity + quantity;
            if status.track_inventory && new_quantity > status.inventory_quantity {
                return Err(CartError::InsufficientStock {
                    title,
                    requested: new_quantity,
                    available: status.inventory_quantity,
                });
            }

            item.quantity = new_quantity;
            item.inventory_quantity = status.inventory_quantity;
            item.price = status
                .price
                .unwrap_or_else(|| unit_price(product, variant));
            if let Some(sku) = status
                .sku
                .or_else(|| variant.and_then(|v| v.sku.clone()))
                .or_else(|| product.sku.clone())
            {
                item.sku = Some(sku);
            }
            if let Some(v) = variant {
                if let Some(variant_title) = status.title.or_else(|| v.title.clone()) {
                    item.variant_title = Some(variant_title);
                }
                item.size = v.size.clone().or_else(|| item.size.take());
                item.color = v.color.clone().or_else(|| item.color.take());
                item.material = v.material.clone().or_else(|| item.material.take());
            } else if let Some(product_title) = status.title {
                item.title = product_title;
            }
        } else {
            if status.track_inventory && quantity > status.inventory_quantity {
                return Err(CartError::InsufficientStock {
                    title,
                    requested: quantity,
                    available: status.inventory_quantity,
                });
            }

            let (item_title, variant_title) = match variant {
                Some(v) => (
                    product.title.clone(),
                    status.title.or_else(|| v.title.clone()),
                ),
                None => (status.title.unwrap_or_else(|| product.title.clone()), None),
            };

            self.items.push(CartItem {
                id,
                product_id: product.id.clone(),
                variant_id: variant.map(|v| v.id.clone()),
                title: item_title,
                variant_title,
                size: variant.and_then(|v| v.size.clone()),
                color: variant.and_then(|v| v.color.clone()),
                material: variant.and_then(|v| v.material.clone()),
                price: status
                    .price
                    .unwrap_or_else(|| unit_price(product, variant)),
                quantity,
                inventory_quantity: status.inventory_quantity,
                sku: status
                    .sku
                    .or_else(|| variant.and_then(|v| v.sku.clone()))
                    .or_else(|| product.sku.clone()),
                featured_image: variant
                    .and_then(|v| v.featured_image.clone())
                    .or_else(|| product.featured_image.clone()),
            });
        }

        self.persist();
        Ok(())
    }

    /// Set a line's quantity in place. A quantity of 0 removes the line.
    ///
    /// This is an optimistic local edit: no inventory re-check happens
    /// here. Overshoot is caught by the next [`Self::refresh_inventory`]
    /// or [`Self::add_item`].
    pub fn update_quantity(&mut self, item_id: &LineItemId, quantity: u32) {
        if quantity == 0 {
            self.remove_item(item_id);
            return;
        }
        if let Some(item) = self.items.iter_mut().find(|i| &i.id == item_id) {
            item.quantity = quantity;
            self.persist();
        }
    }

    /// Remove a line if present; silently does nothing otherwise.
    pub fn remove_item(&mut self, item_id: &LineItemId) {
        let before = self.items.len();
        self.items.retain(|i| &i.id != item_id);
        if self.items.len() != before {
            self.persist();
        }
    }

    /// Empty the cart unconditionally.
    pub fn clear(&mut self) {
        self.items.clear();
        self.persist();
    }

    /// Reconcile every line against current live inventory.
    ///
    /// Lines whose product/variant is gone, inactive, or out of stock are
    /// dropped; lines exceeding available tracked stock are clamped down;
    /// lines whose check fails for any other reason are kept unchanged
    /// (fail open - a transient outage must not empty the shopper's cart).
    /// Prices are deliberately not re-synced here.
    ///
    /// Oracle calls run sequentially per line; the in-memory list is
    /// replaced once, after all lines are processed.
    ///
    /// Returns `Ok(None)` for an empty cart, without any network calls.
    ///
    /// # Errors
    ///
    /// Per-line failures never surface. Returns
    /// [`CartError::InventoryRefreshFailed`] only when the reconciled set
    /// cannot be persisted.
    pub async fn refresh_inventory(&mut self) -> Result<Option<RefreshSummary>, CartError> {
        if self.items.is_empty() {
            return Ok(None);
        }

        let snapshot = std::mem::take(&mut self.items);
        let mut kept = Vec::with_capacity(snapshot.len());
        let mut removed_items = Vec::new();
        let mut quantity_changes = Vec::new();

        for item in snapshot {
            match self.oracle.check(&item.product_id, item.variant_id.as_ref()).await {
                Err(e) if e.is_not_found() => {
                    removed_items.push(RemovedItem {
                        item,
                        reason: RemovalReason::NoLongerExists,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        item_id = %item.id,
                        error = %e,
                        "inventory check failed during refresh; keeping line unchanged"
                    );
                    kept.push(item);
                }
                Ok(status) if !status.is_active => {
                    removed_items.push(RemovedItem {
                        item,
                        reason: RemovalReason::Unavailable,
                    });
                }
                Ok(status) if status.track_inventory && status.inventory_quantity == 0 => {
                    removed_items.push(RemovedItem {
                        item,
                        reason: RemovalReason::OutOfStock,
                    });
                }
                Ok(status) => {
                    let mut item = item;
                    let previous_quantity = item.quantity;
                    if status.track_inventory && status.inventory_quantity < item.quantity {
                        item.quantity = status.inventory_quantity;
                    }
                    item.inventory_quantity = status.inventory_quantity;
                    if item.quantity != previous_quantity {
                        quantity_changes.push(QuantityChange {
                            item: item.clone(),
                            previous_quantity,
                        });
                    }
                    kept.push(item);
                }
            }
        }

        self.items = kept;
        self.storage
            .save(&self.items)
            .map_err(|e| CartError::InventoryRefreshFailed(e.to_string()))?;

        Ok(Some(RefreshSummary {
            removed_items,
            quantity_changes,
            total_items: self.total_items(),
        }))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Current lines, in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Look up a line by its composite id.
    #[must_use]
    pub fn get(&self, item_id: &LineItemId) -> Option<&CartItem> {
        self.items.iter().find(|i| &i.id == item_id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total quantity across all lines.
    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Sum of `price * quantity` across all lines, in exact decimal
    /// arithmetic.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// VAT owed on the current subtotal.
    #[must_use]
    pub fn tax_amount(&self) -> Decimal {
        self.subtotal() * vat_rate()
    }

    // =========================================================================
    // UI flag
    // =========================================================================

    /// Whether the cart drawer is open.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.open
    }

    pub const fn set_open(&mut self, open: bool) {
        self.open = open;
    }

    pub const fn toggle_open(&mut self) {
        self.open = !self.open;
    }

    /// Write the item list through to storage. Persistence failures are
    /// logged, not propagated: the in-memory cart stays usable.
    fn persist(&self) {
        if let Err(e) = self.storage.save(&self.items) {
            tracing::error!(error = %e, "failed to persist cart");
        }
    }
}

/// Unit price from the input descriptors: variant override, else product.
fn unit_price(product: &Product, variant: Option<&ProductVariant>) -> Decimal {
    variant.and_then(|v| v.price).unwrap_or(product.price)
}

/// User-facing name for error messages.
fn display_title(product: &Product, variant: Option<&ProductVariant>) -> String {
    match variant.and_then(|v| v.title.as_deref()) {
        Some(variant_title) => format!("{} - {variant_title}", product.title),
        None => product.title.clone(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::HashMap;

    use kiosk_core::{ProductId, VariantId};

    use crate::inventory::{InventoryError, InventoryStatus};
    use crate::storage::MemoryStorage;

    #[derive(Clone)]
    enum Outcome {
        Available(InventoryStatus),
        NotFound,
        ServerError,
    }

    /// Map-backed oracle; answers by composite key and counts calls.
    #[derive(Default)]
    struct StubOracle {
        outcomes: HashMap<String, Outcome>,
        calls: Cell<u32>,
    }

    impl StubOracle {
        fn with(mut self, product_id: &str, variant_id: Option<&str>, outcome: Outcome) -> Self {
            let key = format!("{product_id}{}", variant_id.unwrap_or(""));
            self.outcomes.insert(key, outcome);
            self
        }

        fn calls(&self) -> u32 {
            self.calls.get()
        }
    }

    impl InventoryOracle for StubOracle {
        async fn check(
            &self,
            product_id: &ProductId,
            variant_id: Option<&VariantId>,
        ) -> Result<InventoryStatus, InventoryError> {
            self.calls.set(self.calls.get() + 1);
            let key = format!(
                "{product_id}{}",
                variant_id.map(VariantId::as_str).unwrap_or("")
            );
            match self.outcomes.get(&key) {
                Some(Outcome::Available(status)) => Ok(status.clone()),
                Some(Outcome::ServerError) => Err(InventoryError::Api {
                    status: 500,
                    message: "internal server error".to_string(),
                }),
                Some(Outcome::NotFound) | None => Err(InventoryError::NotFound(key)),
            }
        }
    }

    fn tracked(quantity: u32) -> InventoryStatus {
        InventoryStatus {
            is_active: true,
            track_inventory: true,
            inventory_quantity: quantity,
            price: None,
            sku: None,
            title: None,
        }
    }

    fn untracked() -> InventoryStatus {
        InventoryStatus {
            is_active: true,
            track_inventory: false,
            inventory_quantity: 0,
            price: None,
            sku: None,
            title: None,
        }
    }

    fn product(id: &str, price: Decimal) -> Product {
        Product {
            id: ProductId::new(id),
            title: format!("Product {id}"),
            slug: format!("product-{id}"),
            price,
            sku: Some(format!("SKU-{id}")),
            featured_image: None,
        }
    }

    fn variant(id: &str) -> ProductVariant {
        ProductVariant {
            id: VariantId::new(id),
            title: Some(format!("Variant {id}")),
            size: Some("M".to_string()),
            color: None,
            material: None,
            price: None,
            sku: None,
            featured_image: None,
        }
    }

    fn store(oracle: StubOracle) -> CartStore<StubOracle, MemoryStorage> {
        CartStore::new(oracle, MemoryStorage::new())
    }

    #[tokio::test]
    async fn add_item_appends_a_new_line() {
        let oracle = StubOracle::default().with("p1", None, Outcome::Available(tracked(5)));
        let mut cart = store(oracle);

        cart.add_item(&product("p1", Decimal::new(1999, 2)), None, 2)
            .await
            .unwrap();

        assert_eq!(cart.items().len(), 1);
        let item = &cart.items()[0];
        assert_eq!(item.id.as_str(), "p1");
        assert_eq!(item.quantity, 2);
        assert_eq!(item.inventory_quantity, 5);
        assert_eq!(item.price, Decimal::new(1999, 2));
    }

    #[tokio::test]
    async fn adding_the_same_line_twice_merges_quantities() {
        let oracle = StubOracle::default().with("p1", Some("v1"), Outcome::Available(tracked(10)));
        let mut cart = store(oracle);
        let p = product("p1", Decimal::new(1999, 2));
        let v = variant("v1");

        cart.add_item(&p, Some(&v), 2).await.unwrap();
        cart.add_item(&p, Some(&v), 3).await.unwrap();

        assert_eq!(cart.items().len(), 1, "no duplicate composite ids");
        assert_eq!(cart.items()[0].quantity, 5);
    }

    #[tokio::test]
    async fn variant_and_base_product_get_separate_lines() {
        let oracle = StubOracle::default()
            .with("p1", None, Outcome::Available(untracked()))
            .with("p1", Some("v1"), Outcome::Available(untracked()));
        let mut cart = store(oracle);
        let p = product("p1", Decimal::new(500, 2));
        let v = variant("v1");

        cart.add_item(&p, None, 1).await.unwrap();
        cart.add_item(&p, Some(&v), 1).await.unwrap();

        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.items()[0].id.as_str(), "p1");
        assert_eq!(cart.items()[1].id.as_str(), "p1v1");
    }

    #[tokio::test]
    async fn add_beyond_tracked_stock_fails_and_cart_is_unchanged() {
        let oracle = StubOracle::default().with("p1", None, Outcome::Available(tracked(5)));
        let mut cart = store(oracle);
        let p = product("p1", Decimal::new(1000, 2));

        let err = cart.add_item(&p, None, 6).await.unwrap_err();
        assert!(matches!(
            err,
            CartError::InsufficientStock {
                requested: 6,
                available: 5,
                ..
            }
        ));
        assert!(cart.is_empty());

        cart.add_item(&p, None, 5).await.unwrap();
        assert_eq!(cart.items()[0].quantity, 5);
    }

    #[tokio::test]
    async fn merge_beyond_tracked_stock_leaves_existing_line_untouched() {
        let oracle = StubOracle::default().with("p1", None, Outcome::Available(tracked(5)));
        let mut cart = store(oracle);
        let p = product("p1", Decimal::new(1000, 2));

        cart.add_item(&p, None, 4).await.unwrap();
        let err = cart.add_item(&p, None, 2).await.unwrap_err();

        assert!(matches!(
            err,
            CartError::InsufficientStock {
                requested: 6,
                available: 5,
                ..
            }
        ));
        assert_eq!(cart.items()[0].quantity, 4, "existing line unmodified");
    }

    #[tokio::test]
    async fn inactive_product_is_unavailable() {
        let status = InventoryStatus {
            is_active: false,
            ..untracked()
        };
        let oracle = StubOracle::default().with("p1", None, Outcome::Available(status));
        let mut cart = store(oracle);

        let err = cart
            .add_item(&product("p1", Decimal::ONE), None, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::ProductUnavailable { .. }));
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn zero_tracked_stock_is_out_of_stock() {
        let oracle = StubOracle::default().with("p1", None, Outcome::Available(tracked(0)));
        let mut cart = store(oracle);

        let err = cart
            .add_item(&product("p1", Decimal::ONE), None, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::OutOfStock { .. }));
    }

    #[tokio::test]
    async fn untracked_items_ignore_stock_counts() {
        let oracle = StubOracle::default().with("p1", None, Outcome::Available(untracked()));
        let mut cart = store(oracle);

        cart.add_item(&product("p1", Decimal::ONE), None, 999)
            .await
            .unwrap();
        assert_eq!(cart.items()[0].quantity, 999);
    }

    #[tokio::test]
    async fn oracle_failure_surfaces_as_check_failed() {
        let oracle = StubOracle::default().with("p1", None, Outcome::ServerError);
        let mut cart = store(oracle);

        let err = cart
            .add_item(&product("p1", Decimal::ONE), None, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::InventoryCheckFailed(_)));
        assert_eq!(err.to_string(), "internal server error");
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn merge_resyncs_price_and_sku_from_oracle() {
        let first = tracked(10);
        let second = InventoryStatus {
            price: Some(Decimal::new(1799, 2)),
            sku: Some("SKU-NEW".to_string()),
            ..tracked(10)
        };

        let oracle = StubOracle::default().with("p1", None, Outcome::Available(first));
        let mut cart = store(oracle);
        let p = product("p1", Decimal::new(1999, 2));
        cart.add_item(&p, None, 1).await.unwrap();
        assert_eq!(cart.items()[0].price, Decimal::new(1999, 2));

        // Oracle now reports a price drop; the next add must pick it up.
        cart.oracle = StubOracle::default().with("p1", None, Outcome::Available(second));
        cart.add_item(&p, None, 1).await.unwrap();

        let item = &cart.items()[0];
        assert_eq!(item.quantity, 2);
        assert_eq!(item.price, Decimal::new(1799, 2));
        assert_eq!(item.sku.as_deref(), Some("SKU-NEW"));
    }

    #[tokio::test]
    async fn zero_requested_quantity_is_treated_as_one() {
        let oracle = StubOracle::default().with("p1", None, Outcome::Available(tracked(5)));
        let mut cart = store(oracle);

        cart.add_item(&product("p1", Decimal::ONE), None, 0)
            .await
            .unwrap();
        assert_eq!(cart.items()[0].quantity, 1);
    }

    #[tokio::test]
    async fn update_quantity_zero_removes_the_line() {
        let oracle = StubOracle::default().with("p1", None, Outcome::Available(tracked(5)));
        let mut cart = store(oracle);
        cart.add_item(&product("p1", Decimal::ONE), None, 2)
            .await
            .unwrap();

        let id = cart.items()[0].id.clone();
        cart.update_quantity(&id, 0);
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn update_quantity_sets_in_place_without_oracle_call() {
        let oracle = StubOracle::default().with("p1", None, Outcome::Available(tracked(5)));
        let mut cart = store(oracle);
        cart.add_item(&product("p1", Decimal::ONE), None, 2)
            .await
            .unwrap();
        let calls_after_add = cart.oracle.calls();

        let id = cart.items()[0].id.clone();
        // Optimistic: allowed to overshoot tracked stock until the next refresh.
        cart.update_quantity(&id, 50);

        assert_eq!(cart.items()[0].quantity, 50);
        assert_eq!(cart.oracle.calls(), calls_after_add);
    }

    #[test]
    fn remove_item_is_idempotent() {
        let mut cart = store(StubOracle::default());
        cart.remove_item(&LineItemId::new("ghost"));
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn clear_empties_the_cart() {
        let oracle = StubOracle::default()
            .with("p1", None, Outcome::Available(untracked()))
            .with("p2", None, Outcome::Available(untracked()));
        let mut cart = store(oracle);
        cart.add_item(&product("p1", Decimal::ONE), None, 1)
            .await
            .unwrap();
        cart.add_item(&product("p2", Decimal::ONE), None, 1)
            .await
            .unwrap();

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total_items(), 0);
    }

    #[tokio::test]
    async fn totals_are_exact() {
        let oracle = StubOracle::default()
            .with("p1", None, Outcome::Available(untracked()))
            .with("p2", None, Outcome::Available(untracked()));
        let mut cart = store(oracle);

        cart.add_item(&product("p1", Decimal::new(1250, 2)), None, 2)
            .await
            .unwrap();
        cart.add_item(&product("p2", Decimal::new(4800, 2)), None, 1)
            .await
            .unwrap();

        assert_eq!(cart.total_items(), 3);
        assert_eq!(cart.subtotal(), Decimal::new(7300, 2));
        // 73.00 * 0.075 = 5.475, exactly.
        assert_eq!(cart.tax_amount(), Decimal::new(5475, 3));
    }

    #[tokio::test]
    async fn empty_cart_refresh_is_a_no_op() {
        let mut cart = store(StubOracle::default());
        let summary = cart.refresh_inventory().await.unwrap();
        assert!(summary.is_none());
        assert_eq!(cart.oracle.calls(), 0, "no network calls for empty cart");
    }

    #[test]
    fn open_flag_toggles() {
        let mut cart = store(StubOracle::default());
        assert!(!cart.is_open());
        cart.toggle_open();
        assert!(cart.is_open());
        cart.set_open(false);
        assert!(!cart.is_open());
    }
}
