// /mp-checkout/services/checkout-service/src/api/handlers.rs

use std::collections::HashMap;
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Json,
};
use validator::Validate;

use crate::{
    core::checkout::NotificationOutcome,
    models::*,
    AppState,
    utils::{
        error::AppResult,
        validator as utils_validator,
    },
};

// ========================= CHECKOUT HANDLERS =========================

/// Handler untuk membuat preference dari cart user
/// POST /api/payments/create-preference/
pub async fn create_preference(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreatePreferenceRequest>,
) -> AppResult<Json<PreferenceResponse>> {
    payload.validate()?;
    let user_token = utils_validator::extract_user_token(&headers)?;

    let summary = state.checkout_service
        .create_checkout(&user_token, &payload)
        .await?;

    tracing::info!(
        "Preference {} created for reference {}",
        summary.preference_id,
        summary.external_reference
    );

    Ok(Json(PreferenceResponse {
        success: true,
        message: "Preference created".to_string(),
        data: Some(summary),
    }))
}

/// Handler untuk status pembayaran
/// GET /api/payments/status/{payment_id}
pub async fn get_payment_status(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
) -> AppResult<Json<PaymentStatusResponse>> {
    utils_validator::validate_payment_id(&payment_id)?;

    let payment = state.checkout_service.payment_status(&payment_id).await?;

    Ok(Json(PaymentStatusResponse {
        success: true,
        message: format!("Payment is {}", payment.status),
        data: Some(payment),
    }))
}

/// Handler untuk konfirmasi order setelah payment approved
/// POST /api/payments/confirm-order/
pub async fn confirm_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ConfirmOrderRequest>,
) -> AppResult<Json<serde_json::Value>> {
    payload.validate()?;
    utils_validator::validate_payment_id(&payload.payment_id)?;
    let user_token = utils_validator::extract_user_token(&headers)?;

    let order = state.checkout_service
        .confirm_payment(&user_token, &payload.payment_id)
        .await?;

    tracing::info!("Order confirmed for payment {}", payload.payment_id);

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Order confirmed",
        "payment_id": payload.payment_id,
        "data": order,
    })))
}

// ========================= WEBHOOK HANDLERS =========================

/// Handler untuk webhook MercadoPago
/// POST /api/payments/webhook/
///
/// The resource id may come in the body or as `data.id` / `id` query
/// parameters, depending on the notification flavour.
pub async fn handle_webhook(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(mut notification): Json<WebhookNotification>,
) -> AppResult<Json<serde_json::Value>> {
    if notification.resource_id().is_none() {
        if let Some(id) = params.get("data.id").or_else(|| params.get("id")) {
            notification.data = Some(WebhookData {
                id: Some(serde_json::Value::String(id.clone())),
            });
        }
    }
    if notification.topic().is_none() {
        notification.topic = params.get("type").or_else(|| params.get("topic")).cloned();
    }

    let data_id = params.get("data.id").cloned().or_else(|| notification.resource_id());
    state.checkout_service.gateway().verify_webhook_signature(
        header_value(&headers, "x-signature"),
        header_value(&headers, "x-request-id"),
        data_id.as_deref(),
    )?;

    let outcome = state.checkout_service.handle_notification(&notification).await?;

    let body = match outcome {
        NotificationOutcome::Payment(payment) => serde_json::json!({
            "status": "processed",
            "payment_id": payment.id,
            "payment_status": payment.status,
            "external_reference": payment.external_reference,
            "processed_at": chrono::Utc::now(),
        }),
        NotificationOutcome::Ignored { topic } => serde_json::json!({
            "status": "ignored",
            "topic": topic,
            "processed_at": chrono::Utc::now(),
        }),
    };

    Ok(Json(body))
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|h| h.to_str().ok())
}

// ========================= HEALTH =========================

/// Health check endpoint
/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let limiter = state.admission.limiter();

    Json(serde_json::json!({
        "service": "checkout-service",
        "status": "healthy",
        "timestamp": chrono::Utc::now(),
        "version": env!("CARGO_PKG_VERSION"),
        "admission": {
            "mode": format!("{:?}", state.admission.mode()),
            "allowed_origins": state.admission.origins().as_slice(),
            "rate_limit": {
                "max_requests": limiter.max_requests(),
                "window_seconds": limiter.window_seconds(),
                "tracked_clients": limiter.tracked_clients().await,
            },
        },
        "scheduler": state.scheduler_metrics.get_status().await,
        "webhook_signatures": state.checkout_service.gateway().verifies_signatures(),
    }))
}
