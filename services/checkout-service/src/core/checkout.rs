// /mp-checkout/services/checkout-service/src/core/checkout.rs

use std::sync::Arc;
use serde_json::Value;
use uuid::Uuid;
use crate::{
    core::{
        cart::{cart_to_items, CartClient},
        mercadopago::MercadoPagoClient,
    },
    models::*,
    utils::error::{AppError, AppResult},
};

/// Outcome of a processed webhook notification
#[derive(Debug, Clone)]
pub enum NotificationOutcome {
    Payment(PaymentInfo),
    Ignored { topic: Option<String> },
}

// Service untuk orchestrate cart backend dan MercadoPago
pub struct CheckoutService {
    cart_client: Arc<CartClient>,
    gateway: Arc<MercadoPagoClient>,
    notification_url: Option<String>,
    currency_id: String,
}

impl CheckoutService {
    pub fn new(
        cart_client: Arc<CartClient>,
        gateway: Arc<MercadoPagoClient>,
        notification_url: Option<String>,
        currency_id: String,
    ) -> Self {
        Self {
            cart_client,
            gateway,
            notification_url,
            currency_id,
        }
    }

    pub fn gateway(&self) -> &Arc<MercadoPagoClient> {
        &self.gateway
    }

    /// Create preference dari cart user
    pub async fn create_checkout(
        &self,
        user_token: &str,
        request: &CreatePreferenceRequest,
    ) -> AppResult<CheckoutSummary> {
        let cart = self.cart_client.get_cart(user_token).await?;
        let items = cart_to_items(&cart, &self.currency_id)?;

        if items.is_empty() {
            return Err(AppError::BadRequest("Cart is empty".to_string()));
        }

        let external_reference = request
            .external_reference
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let item_count = items.len();

        let preference = self.gateway
            .create_preference(
                items,
                &external_reference,
                request.payer_email.as_deref(),
                self.notification_url.as_deref(),
            )
            .await?;

        Ok(CheckoutSummary {
            preference_id: preference.id,
            init_point: preference.init_point,
            sandbox_init_point: preference.sandbox_init_point,
            external_reference,
            item_count,
        })
    }

    /// Status pembayaran dari MercadoPago
    pub async fn payment_status(&self, payment_id: &str) -> AppResult<PaymentInfo> {
        self.gateway.get_payment(payment_id).await
    }

    /// Confirm order di backend, hanya untuk payment yang approved
    pub async fn confirm_payment(&self, user_token: &str, payment_id: &str) -> AppResult<Value> {
        let payment = self.gateway.get_payment(payment_id).await?;

        if !payment.payment_status().is_approved() {
            tracing::warn!("Refusing to confirm payment {} with status {}", payment_id, payment.status);
            return Err(AppError::Conflict(format!(
                "Payment {} is {}, not approved",
                payment_id, payment.status
            )));
        }

        self.cart_client.confirm_order(user_token, payment_id).await
    }

    /// Process webhook notification
    pub async fn handle_notification(&self, notification: &WebhookNotification) -> AppResult<NotificationOutcome> {
        let topic = notification.topic().map(str::to_string);

        if topic.as_deref() != Some("payment") {
            tracing::info!("Ignoring webhook notification with topic {:?}", topic);
            return Ok(NotificationOutcome::Ignored { topic });
        }

        let payment_id = notification
            .resource_id()
            .ok_or_else(|| AppError::BadRequest("Notification without payment id".to_string()))?;

        let payment = self.gateway.get_payment(&payment_id).await?;
        tracing::info!(
            "Payment {} notified with status {} (reference {:?})",
            payment_id,
            payment.status,
            payment.external_reference
        );

        Ok(NotificationOutcome::Payment(payment))
    }
}
