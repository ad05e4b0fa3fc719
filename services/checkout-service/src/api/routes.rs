// /mp-checkout/services/checkout-service/src/api/routes.rs

use std::time::Duration;
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use crate::{
    middleware::{admission::admission_middleware, security::security_headers_middleware},
    AppState,
};
use super::handlers;

/// Create semua routes untuk checkout service
pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))

        // Checkout flow
        .route("/api/payments/create-preference/", post(handlers::create_preference))
        .route("/api/payments/status/{payment_id}", get(handlers::get_payment_status))
        .route("/api/payments/confirm-order/", post(handlers::confirm_order))

        // Webhook endpoint (public, no user token)
        .route("/api/payments/webhook/", post(handlers::handle_webhook))
}

/// Router lengkap dengan middleware stack
///
/// Outermost first: trace, timeout, CORS, admission, security headers.
/// Rejected requests never reach the security headers layer.
pub fn build_app(state: AppState, cors: CorsLayer) -> Router {
    let admission = state.admission.clone();

    Router::new()
        .merge(create_routes())
        .with_state(state)
        .layer(axum_middleware::from_fn(security_headers_middleware))
        .layer(axum_middleware::from_fn_with_state(admission, admission_middleware))
        .layer(
            ServiceBuilder::new()
                // Request tracing (paling luar)
                .layer(TraceLayer::new_for_http())
                // Timeout protection
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                // CORS handling
                .layer(cors),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;
    use crate::{
        config::{AdmissionMode, MercadoPagoConfig},
        core::services::*,
        middleware::{
            admission::{AdmissionFilter, AllowedOrigins},
            rate_limit::RateLimiter,
        },
        utils::scheduler::SchedulerMetrics,
    };

    const SHOP: &str = "https://ispcfood.netlify.app";

    fn test_app(mode: AdmissionMode, max_requests: usize) -> Router {
        let cart_client = CartClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let gateway = MercadoPagoClient::new(
            &MercadoPagoConfig {
                access_token: "TEST-token".to_string(),
                api_url: "http://127.0.0.1:9".to_string(),
                webhook_secret: None,
                notification_url: None,
                currency_id: "ARS".to_string(),
            },
            "http://127.0.0.1:9",
            Duration::from_secs(1),
        )
        .unwrap();

        let limiter = Arc::new(RateLimiter::new(max_requests, 60, 100));
        let state = AppState {
            checkout_service: Arc::new(CheckoutService::new(
                Arc::new(cart_client),
                Arc::new(gateway),
                None,
                "ARS".to_string(),
            )),
            admission: Arc::new(AdmissionFilter::new(mode, AllowedOrigins::new([SHOP]), limiter)),
            scheduler_metrics: SchedulerMetrics::new(),
        };

        build_app(state, CorsLayer::new())
    }

    fn webhook(origin: Option<&str>, client: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/payments/webhook/")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", client);
        if let Some(origin) = origin {
            builder = builder.header(header::ORIGIN, origin);
        }
        builder
            .body(Body::from(r#"{"topic":"merchant_order","id":"42"}"#))
            .unwrap()
    }

    #[tokio::test]
    async fn test_foreign_origin_gets_generic_forbidden() {
        let app = test_app(AdmissionMode::Strict, 100);
        let response = app
            .oneshot(webhook(Some("https://evil.example"), "198.51.100.1"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get(header::X_FRAME_OPTIONS).is_none());

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Forbidden");
    }

    #[tokio::test]
    async fn test_allowed_request_carries_security_headers() {
        let app = test_app(AdmissionMode::Strict, 100);
        let response = app
            .oneshot(webhook(Some(SHOP), "198.51.100.2"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::X_FRAME_OPTIONS], "DENY");
        assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(response.headers()[header::REFERRER_POLICY], "same-origin");

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ignored");
    }

    #[tokio::test]
    async fn test_health_is_not_origin_checked() {
        let app = test_app(AdmissionMode::Strict, 100);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(header::ORIGIN, "https://evil.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::CONTENT_SECURITY_POLICY).is_some());

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["admission"]["rate_limit"]["max_requests"], 100);
    }

    #[tokio::test]
    async fn test_rate_limit_per_client() {
        let app = test_app(AdmissionMode::Strict, 3);

        for _ in 0..3 {
            let response = app.clone().oneshot(webhook(None, "203.0.113.5")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let limited = app.clone().oneshot(webhook(None, "203.0.113.5")).await.unwrap();
        assert_eq!(limited.status(), StatusCode::FORBIDDEN);

        let other = app.clone().oneshot(webhook(None, "203.0.113.6")).await.unwrap();
        assert_eq!(other.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_permissive_mode_admits_everything() {
        let app = test_app(AdmissionMode::Permissive, 1);

        for _ in 0..5 {
            let response = app
                .clone()
                .oneshot(webhook(Some("https://evil.example"), "203.0.113.9"))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert!(response.headers().get(header::X_XSS_PROTECTION).is_some());
        }
    }

    #[tokio::test]
    async fn test_invalid_payment_id_is_bad_request() {
        let app = test_app(AdmissionMode::Strict, 100);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/payments/status/abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_preference_requires_token() {
        let app = test_app(AdmissionMode::Strict, 100);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/payments/create-preference/")
                    .header(header::ORIGIN, SHOP)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
