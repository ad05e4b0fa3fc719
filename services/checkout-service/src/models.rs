// /mp-checkout/services/checkout-service/src/models.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

// ========================= REQUEST DTOs =========================

/// Request untuk membuat preference dari cart user
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreatePreferenceRequest {
    #[validate(email(message = "Payer email tidak valid"))]
    pub payer_email: Option<String>,

    /// Reference yang dikirim balik oleh MercadoPago, default UUID baru
    #[validate(length(min = 1, max = 256))]
    pub external_reference: Option<String>,
}

/// Request untuk konfirmasi order di main backend
#[derive(Debug, Deserialize, Validate)]
pub struct ConfirmOrderRequest {
    #[validate(length(min = 1, max = 64, message = "Payment ID diperlukan"))]
    pub payment_id: String,
}

/// Webhook notification dari MercadoPago
///
/// Depending on the integration the topic arrives as `type` or `topic`,
/// and the resource id inside `data.id` or as a top level `id`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WebhookNotification {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub topic: Option<String>,
    pub action: Option<String>,
    pub data: Option<WebhookData>,
    pub id: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WebhookData {
    pub id: Option<serde_json::Value>,
}

impl WebhookNotification {
    pub fn topic(&self) -> Option<&str> {
        self.kind.as_deref().or(self.topic.as_deref())
    }

    /// Resource id, numbers and strings both accepted
    pub fn resource_id(&self) -> Option<String> {
        self.data
            .as_ref()
            .and_then(|data| data.id.as_ref())
            .or(self.id.as_ref())
            .and_then(json_id_to_string)
    }
}

fn json_id_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ========================= RESPONSE DTOs =========================

/// Standard error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    pub error_code: Option<String>,
    pub details: Option<serde_json::Value>,
}

/// Response wrapper untuk preference baru
#[derive(Debug, Serialize)]
pub struct PreferenceResponse {
    pub success: bool,
    pub message: String,
    pub data: Option<CheckoutSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSummary {
    pub preference_id: String,
    pub init_point: Option<String>,
    pub sandbox_init_point: Option<String>,
    pub external_reference: String,
    pub item_count: usize,
}

/// Response wrapper untuk status pembayaran
#[derive(Debug, Serialize)]
pub struct PaymentStatusResponse {
    pub success: bool,
    pub message: String,
    pub data: Option<PaymentInfo>,
}

// ========================= CART BACKEND DTOs =========================

/// Cart payload dari main backend, disimpan mentah karena format numerik tidak konsisten
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CartData {
    #[serde(default)]
    pub productos: Option<Vec<serde_json::Value>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CartData {
    pub fn product_count(&self) -> usize {
        self.productos.as_ref().map(Vec::len).unwrap_or(0)
    }
}

// ========================= PAYMENT GATEWAY DTOs =========================

/// Line item dalam format MercadoPago
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub currency_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BackUrls {
    pub success: String,
    pub failure: String,
    pub pending: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Payer {
    pub email: String,
}

/// Body untuk POST /checkout/preferences
#[derive(Debug, Clone, Serialize)]
pub struct PreferenceRequest {
    pub items: Vec<PreferenceItem>,
    pub external_reference: String,
    pub back_urls: BackUrls,
    pub auto_return: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer: Option<Payer>,
}

/// Preference yang dibuat oleh MercadoPago
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preference {
    pub id: String,
    pub init_point: Option<String>,
    pub sandbox_init_point: Option<String>,
    pub external_reference: Option<String>,
}

/// Payment resource dari GET /v1/payments/{id}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInfo {
    pub id: serde_json::Value,
    pub status: String,
    pub status_detail: Option<String>,
    pub external_reference: Option<String>,
    pub transaction_amount: Option<f64>,
    pub currency_id: Option<String>,
    pub date_approved: Option<String>,
}

/// Status pembayaran MercadoPago
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Approved,
    Authorized,
    InProcess,
    InMediation,
    Rejected,
    Cancelled,
    Refunded,
    ChargedBack,
    Unknown,
}

impl PaymentStatus {
    pub fn parse(status: &str) -> Self {
        match status {
            "pending" => PaymentStatus::Pending,
            "approved" => PaymentStatus::Approved,
            "authorized" => PaymentStatus::Authorized,
            "in_process" => PaymentStatus::InProcess,
            "in_mediation" => PaymentStatus::InMediation,
            "rejected" => PaymentStatus::Rejected,
            "cancelled" => PaymentStatus::Cancelled,
            "refunded" => PaymentStatus::Refunded,
            "charged_back" => PaymentStatus::ChargedBack,
            _ => PaymentStatus::Unknown,
        }
    }

    pub fn is_approved(self) -> bool {
        matches!(self, PaymentStatus::Approved)
    }
}

impl PaymentInfo {
    pub fn payment_status(&self) -> PaymentStatus {
        PaymentStatus::parse(&self.status)
    }
}
