// /mp-checkout/services/checkout-service/src/core/mercadopago.rs

use std::time::Duration;
use hmac::{Hmac, Mac};
use reqwest::{Client, StatusCode};
use sha2::Sha256;
use uuid::Uuid;
use crate::{
    config::MercadoPagoConfig,
    models::*,
    utils::error::{AppError, AppResult},
};

type HmacSha256 = Hmac<Sha256>;

/// Client untuk integrasi dengan MercadoPago REST API
pub struct MercadoPagoClient {
    client: Client,
    access_token: String,
    api_url: String,
    webhook_secret: Option<String>,
    back_url_base: String,
}

impl MercadoPagoClient {
    /// Initialize MercadoPago client
    ///
    /// `back_url_base` is the main backend; success, failure and pending
    /// redirects hang off `{back_url_base}/payment/`.
    pub fn new(config: &MercadoPagoConfig, back_url_base: &str, timeout: Duration) -> AppResult<Self> {
        if config.access_token.trim().is_empty() {
            return Err(AppError::Configuration("MercadoPago access token is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            access_token: config.access_token.clone(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            webhook_secret: config.webhook_secret.clone(),
            back_url_base: back_url_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn verifies_signatures(&self) -> bool {
        self.webhook_secret.is_some()
    }

    /// Susun body preference
    pub fn build_preference_request(
        &self,
        items: Vec<PreferenceItem>,
        external_reference: &str,
        payer_email: Option<&str>,
        notification_url: Option<&str>,
    ) -> PreferenceRequest {
        PreferenceRequest {
            items,
            external_reference: external_reference.to_string(),
            back_urls: BackUrls {
                success: format!("{}/payment/success", self.back_url_base),
                failure: format!("{}/payment/failure", self.back_url_base),
                pending: format!("{}/payment/pending", self.back_url_base),
            },
            auto_return: "approved".to_string(),
            notification_url: notification_url.map(str::to_string),
            payer: payer_email.map(|email| Payer { email: email.to_string() }),
        }
    }

    /// Create payment preference
    pub async fn create_preference(
        &self,
        items: Vec<PreferenceItem>,
        external_reference: &str,
        payer_email: Option<&str>,
        notification_url: Option<&str>,
    ) -> AppResult<Preference> {
        let request = self.build_preference_request(items, external_reference, payer_email, notification_url);
        tracing::info!(
            "Creating preference for reference {} with {} items",
            request.external_reference,
            request.items.len()
        );

        let response = self.client
            .post(format!("{}/checkout/preferences", self.api_url))
            .bearer_auth(&self.access_token)
            .header("X-Idempotency-Key", Uuid::new_v4().to_string())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("Preference creation failed: {} - {}", status, error_text);
            return Err(AppError::ExternalService(format!("MercadoPago error {}: {}", status, error_text)));
        }

        let preference: Preference = response.json().await
            .map_err(|e| AppError::ExternalService(format!("Failed to parse preference response: {}", e)))?;

        tracing::info!("Preference {} created", preference.id);
        Ok(preference)
    }

    /// Get payment status
    pub async fn get_payment(&self, payment_id: &str) -> AppResult<PaymentInfo> {
        tracing::info!("Querying payment {}", payment_id);

        let response = self.client
            .get(format!("{}/v1/payments/{}", self.api_url, payment_id))
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => {
                return Err(AppError::NotFound(format!("Payment {} not found", payment_id)));
            }
            status => {
                tracing::error!("Payment query failed: {}", status);
                return Err(AppError::ExternalService(format!("MercadoPago payment query returned {}", status)));
            }
        }

        response.json().await
            .map_err(|e| AppError::ExternalService(format!("Failed to parse payment response: {}", e)))
    }

    /// Verify webhook `x-signature` header
    ///
    /// Without a configured secret every notification passes. The signed
    /// manifest is `id:{data_id};request-id:{x-request-id};ts:{ts};`, parts
    /// whose value is missing are left out.
    pub fn verify_webhook_signature(
        &self,
        x_signature: Option<&str>,
        x_request_id: Option<&str>,
        data_id: Option<&str>,
    ) -> AppResult<()> {
        let Some(secret) = self.webhook_secret.as_deref() else {
            return Ok(());
        };

        let header = x_signature
            .ok_or_else(|| AppError::Unauthorized("Missing webhook signature".to_string()))?;
        let (ts, v1) = parse_signature_header(header)
            .ok_or_else(|| AppError::Unauthorized("Malformed webhook signature".to_string()))?;

        let manifest = signature_manifest(data_id, x_request_id, ts);
        let expected = hex::decode(v1)
            .map_err(|_| AppError::Unauthorized("Malformed webhook signature".to_string()))?;

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| AppError::Configuration(format!("Invalid webhook secret: {}", e)))?;
        mac.update(manifest.as_bytes());
        mac.verify_slice(&expected)
            .map_err(|_| AppError::Unauthorized("Webhook signature mismatch".to_string()))
    }
}

/// Split `ts=...,v1=...` into its two values
fn parse_signature_header(header: &str) -> Option<(&str, &str)> {
    let mut ts = None;
    let mut v1 = None;
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("ts", value)) => ts = Some(value.trim()),
            Some(("v1", value)) => v1 = Some(value.trim()),
            _ => {}
        }
    }
    Some((ts?, v1?))
}

fn signature_manifest(data_id: Option<&str>, request_id: Option<&str>, ts: &str) -> String {
    let mut manifest = String::new();
    if let Some(id) = data_id.filter(|id| !id.is_empty()) {
        manifest.push_str(&format!("id:{};", id.to_lowercase()));
    }
    if let Some(request_id) = request_id.filter(|id| !id.is_empty()) {
        manifest.push_str(&format!("request-id:{};", request_id));
    }
    manifest.push_str(&format!("ts:{};", ts));
    manifest
}
