//! Cart line items and the descriptors used to create them.
//!
//! `Product` and `ProductVariant` are explicit input records: the fields a
//! caller must supply when adding to the cart, with optionality spelled out
//! rather than inferred from whatever shape the catalog handed back.

use kiosk_core::{LineItemId, ProductId, VariantId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A purchasable catalog product, as passed to [`crate::store::CartStore::add_item`].
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    /// URL slug for linking back to the product page.
    pub slug: String,
    /// Listed unit price; superseded by the oracle's price when it reports one.
    pub price: Decimal,
    pub sku: Option<String>,
    pub featured_image: Option<String>,
}

/// A selected variant of a product (size/color/material combination).
#[derive(Debug, Clone, PartialEq)]
pub struct ProductVariant {
    pub id: VariantId,
    pub title: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub material: Option<String>,
    /// Price override; falls back to the product price when absent.
    pub price: Option<Decimal>,
    pub sku: Option<String>,
    pub featured_image: Option<String>,
}

/// One line in the cart.
///
/// Descriptive fields are a snapshot taken at add-time and may go stale;
/// `price` and `inventory_quantity` reflect the last successful inventory
/// check. `inventory_quantity` is advisory only - it is enforced at mutation
/// time, not continuously.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    /// Composite key: product id, plus variant id when a variant is selected.
    pub id: LineItemId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub title: String,
    pub variant_title: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub material: Option<String>,
    /// Unit price at the last successful inventory check.
    pub price: Decimal,
    /// Always >= 1; a mutation that would drop it below 1 removes the line.
    pub quantity: u32,
    /// Last-known available stock, for display and mutation-time guards.
    pub inventory_quantity: u32,
    pub sku: Option<String>,
    pub featured_image: Option<String>,
}

impl CartItem {
    /// Price of this line: unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Build the composite cart key for a product/variant pair.
///
/// The variant id is appended directly to the product id so that every
/// selected variant gets its own line.
#[must_use]
pub fn line_item_id(product_id: &ProductId, variant_id: Option<&VariantId>) -> LineItemId {
    match variant_id {
        Some(variant_id) => LineItemId::new(format!("{product_id}{variant_id}")),
        None => LineItemId::new(product_id.as_str()),
    }
}

/// Why a line was dropped during [`crate::store::CartStore::refresh_inventory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    /// The inventory service no longer knows the product or variant.
    NoLongerExists,
    /// The product or variant is marked inactive.
    Unavailable,
    /// Tracked inventory reports zero stock.
    OutOfStock,
}

impl std::fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            Self::NoLongerExists => "product/variant no longer exists",
            Self::Unavailable => "no longer available",
            Self::OutOfStock => "out of stock",
        };
        write!(f, "{reason}")
    }
}

/// A line dropped during reconciliation, with the reason it was dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedItem {
    pub item: CartItem,
    pub reason: RemovalReason,
}

/// A surviving line whose quantity was clamped during reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantityChange {
    /// The line as it stands after reconciliation.
    pub item: CartItem,
    pub previous_quantity: u32,
}

/// Outcome of a full-cart reconciliation pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RefreshSummary {
    pub removed_items: Vec<RemovedItem>,
    pub quantity_changes: Vec<QuantityChange>,
    /// Total quantity across all surviving lines.
    pub total_items: u32,
}
