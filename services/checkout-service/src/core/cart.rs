// /mp-checkout/services/checkout-service/src/core/cart.rs

use std::time::Duration;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use crate::{
    models::{CartData, PreferenceItem},
    utils::error::{AppError, AppResult},
};

const DEFAULT_TITLE: &str = "Producto";

/// Client untuk cart API di main backend
#[derive(Clone)]
pub struct CartClient {
    client: Client,
    base_url: String,
}

impl CartClient {
    /// Initialize cart client dengan timeout per request
    pub fn new(base_url: &str, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(client, base_url))
    }

    fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Ambil cart user dari main backend
    pub async fn get_cart(&self, user_token: &str) -> AppResult<CartData> {
        let url = format!("{}/appCART/ver/", self.base_url);
        tracing::info!("Fetching cart from {} with token {}...", url, token_prefix(user_token));

        let response = self.client
            .get(&url)
            .header("Authorization", format!("Token {}", user_token))
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Cart fetch failed: {} - {}", status, body);
            return Err(upstream_error("Cart backend", status, &body));
        }

        let cart: CartData = response.json().await
            .map_err(|e| AppError::ExternalService(format!("Invalid cart payload: {}", e)))?;

        tracing::info!("Cart fetched, {} products", cart.product_count());
        Ok(cart)
    }

    /// Konfirmasi order di main backend setelah pembayaran
    pub async fn confirm_order(&self, user_token: &str, payment_id: &str) -> AppResult<Value> {
        let url = format!("{}/appCART/confirmar/", self.base_url);
        tracing::info!("Confirming order at {} for payment {}", url, payment_id);

        let response = self.client
            .post(&url)
            .header("Authorization", format!("Token {}", user_token))
            .json(&serde_json::json!({ "payment_id": payment_id }))
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Order confirmation failed: {} - {}", status, body);
            return Err(upstream_error("Order confirmation", status, &body));
        }

        // Some backends answer 201 with an empty body
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body)
            .map_err(|e| AppError::ExternalService(format!("Invalid confirmation payload: {}", e)))
    }
}

fn token_prefix(token: &str) -> String {
    token.chars().take(5).collect()
}

fn upstream_error(what: &str, status: StatusCode, body: &str) -> AppError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            AppError::Unauthorized(format!("{} rejected the user token", what))
        }
        _ => AppError::ExternalService(format!("{} returned {}: {}", what, status, body)),
    }
}

/// Convert cart backend products ke line items MercadoPago
///
/// Missing fields fall back to defaults. Numeric fields may be JSON numbers
/// or numeric strings, anything else fails the whole conversion.
pub fn cart_to_items(cart: &CartData, currency_id: &str) -> AppResult<Vec<PreferenceItem>> {
    let Some(products) = cart.productos.as_ref() else {
        tracing::error!("Cart payload has no products list");
        return Ok(Vec::new());
    };

    products
        .iter()
        .enumerate()
        .map(|(index, product)| product_to_item(index, product, currency_id))
        .collect()
}

fn product_to_item(index: usize, product: &Value, currency_id: &str) -> AppResult<PreferenceItem> {
    let invalid = |field: &str| {
        AppError::ValidationError(format!("Cart product #{} has invalid {}", index + 1, field))
    };

    if !product.is_object() {
        return Err(invalid("entry"));
    }

    let quantity = match product.get("cantidad") {
        None | Some(Value::Null) => 1,
        Some(value) => as_f64(value)
            .filter(|q| q.fract() == 0.0 && *q >= 1.0 && *q <= u32::MAX as f64)
            .map(|q| q as u32)
            .ok_or_else(|| invalid("cantidad"))?,
    };

    let unit_price = match product.get("precio") {
        None | Some(Value::Null) => 0.0,
        Some(value) => as_f64(value)
            .filter(|p| p.is_finite() && *p >= 0.0)
            .ok_or_else(|| invalid("precio"))?,
    };

    Ok(PreferenceItem {
        id: product.get("id").and_then(as_text).unwrap_or_default(),
        title: product.get("nombre").and_then(as_text).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        description: product.get("descripcion").and_then(as_text).unwrap_or_default(),
        quantity,
        unit_price,
        currency_id: currency_id.to_string(),
    })
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
