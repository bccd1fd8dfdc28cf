//! Inventory query service client.
//!
//! The inventory service is the source of truth for stock counts, active
//! status, price, and SKU. Responses are never cached: a stale "in stock"
//! answer is worse than an extra round trip, so every check hits the
//! service directly.
//!
//! Prices travel on the wire as decimal strings (e.g. `"19.99"`), matching
//! the string (de)serialization `rust_decimal` is configured with.

use kiosk_core::{ProductId, VariantId};
use reqwest::header::{HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::config::InventoryServiceConfig;

/// Fallback message when the service gives no usable error body.
pub const GENERIC_CHECK_FAILURE: &str = "failed to check inventory";

/// Errors that can occur when querying the inventory service.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Service returned a non-success status.
    #[error("inventory service error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The product or variant is unknown to the service.
    #[error("product or variant not found: {0}")]
    NotFound(String),

    /// Response body could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),
}

impl InventoryError {
    /// Whether this is the distinguishable not-found signal, as opposed to
    /// a transport or server failure.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Availability report for one product or variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryStatus {
    /// Whether the product/variant is purchasable at all.
    pub is_active: bool,
    /// Whether the stock count is authoritative. Untracked items are
    /// treated as always available.
    pub track_inventory: bool,
    /// Available stock; meaningful only when `track_inventory` is set.
    #[serde(default)]
    pub inventory_quantity: u32,
    /// Canonical unit price, overriding the caller's snapshot when present.
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub sku: Option<String>,
    /// Canonical display title for the product or variant.
    #[serde(default)]
    pub title: Option<String>,
}

/// Source of truth for stock and availability.
///
/// The seam between the cart and the network: production code uses
/// [`InventoryClient`], tests inject stubs.
#[allow(async_fn_in_trait)] // cart mutations run on one logical thread; no Send bound needed
pub trait InventoryOracle {
    /// Query current availability for a product, or one of its variants
    /// when `variant_id` is given.
    async fn check(
        &self,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
    ) -> Result<InventoryStatus, InventoryError>;
}

/// HTTP client for the inventory query service.
#[derive(Debug, Clone)]
pub struct InventoryClient {
    client: reqwest::Client,
    endpoint: Url,
}

impl InventoryClient {
    /// Create a new inventory service client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build or the access token
    /// is not a valid header value.
    pub fn new(config: &InventoryServiceConfig) -> Result<Self, InventoryError> {
        let mut headers = HeaderMap::new();
        headers.insert("Accept", HeaderValue::from_static("application/json"));

        if let Some(token) = &config.access_token {
            let auth_value = format!("Bearer {}", token.expose_secret());
            let mut value = HeaderValue::from_str(&auth_value)
                .map_err(|e| InventoryError::Parse(format!("invalid access token: {e}")))?;
            value.set_sensitive(true);
            headers.insert("Authorization", value);
        }

        let client = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    /// Query current availability for a product or variant.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::NotFound`] for a 404, [`InventoryError::Api`]
    /// for other non-success statuses (with the service's message extracted
    /// from the body), and transport/parse errors otherwise.
    pub async fn check_availability(
        &self,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
    ) -> Result<InventoryStatus, InventoryError> {
        let mut request = self
            .client
            .get(self.endpoint.clone())
            .query(&[("product_id", product_id.as_str())]);
        if let Some(variant_id) = variant_id {
            request = request.query(&[("variant_id", variant_id.as_str())]);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            let subject = match variant_id {
                Some(variant_id) => format!("{product_id}/{variant_id}"),
                None => product_id.to_string(),
            };
            return Err(InventoryError::NotFound(subject));
        }

        // Read the body as text first so error diagnostics survive a failed
        // JSON parse.
        if !status.is_success() {
            let message = match response.text().await {
                Ok(body) => error_message_from_body(&body),
                Err(_) => GENERIC_CHECK_FAILURE.to_string(),
            };
            return Err(InventoryError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "failed to parse inventory response"
            );
            InventoryError::Parse(e.to_string())
        })
    }
}

impl InventoryOracle for InventoryClient {
    async fn check(
        &self,
        product_id: &ProductId,
        variant_id: Option<&VariantId>,
    ) -> Result<InventoryStatus, InventoryError> {
        self.check_availability(product_id, variant_id).await
    }
}

/// Error body shape used by the inventory service.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// Extract a human-readable message from an error response body.
///
/// Prefers a JSON `message` (or `error`) field, falls back to the raw body
/// text, and finally to [`GENERIC_CHECK_FAILURE`] when the body is empty.
fn error_message_from_body(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body)
        && let Some(message) = parsed.message.or(parsed.error)
    {
        return message;
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        GENERIC_CHECK_FAILURE.to_string()
    } else {
        trimmed.to_string()
    }
}
