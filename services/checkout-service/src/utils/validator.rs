// /mp-checkout/services/checkout-service/src/utils/validator.rs

use axum::http::{header, HeaderMap};
use crate::utils::error::{AppError, AppResult};

/// Validasi MercadoPago payment ID (numeric)
pub fn validate_payment_id(payment_id: &str) -> AppResult<()> {
    if payment_id.is_empty() {
        return Err(AppError::BadRequest("Payment ID tidak boleh kosong".to_string()));
    }

    if payment_id.len() > 32 {
        return Err(AppError::BadRequest("Payment ID terlalu panjang".to_string()));
    }

    if !payment_id.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::BadRequest("Payment ID harus numeric".to_string()));
    }

    Ok(())
}

/// Ambil user token dari Authorization header
///
/// Accepts `Token <key>` as issued by the main backend and `Bearer <key>`.
pub fn extract_user_token(headers: &HeaderMap) -> AppResult<String> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Authorization header diperlukan".to_string()))?;

    let token = value
        .strip_prefix("Token ")
        .or_else(|| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Format Authorization tidak valid".to_string()))?;

    if token.len() > 512 || token.chars().any(char::is_whitespace) {
        return Err(AppError::Unauthorized("Format Authorization tidak valid".to_string()));
    }

    Ok(token.to_string())
}
