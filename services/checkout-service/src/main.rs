// /mp-checkout/services/checkout-service/src/main.rs

mod models;
mod config;
mod api;
mod core;
mod middleware;
mod utils;

use std::{net::SocketAddr, sync::Arc};
use tracing::info;
use crate::{
    api::routes,
    config::AppConfig,
    core::services::*,
    middleware::{
        admission::AdmissionFilter,
        rate_limit::RateLimiter,
    },
    utils::scheduler::{start_background_jobs, SchedulerMetrics},
};

#[derive(Clone)]
pub struct AppState {
    pub checkout_service: Arc<CheckoutService>,
    pub admission: Arc<AdmissionFilter>,
    pub scheduler_metrics: Arc<SchedulerMetrics>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    utils::logger::init_logger();

    let config = AppConfig::from_env()?;

    // Upstream clients
    let cart_client = Arc::new(CartClient::new(&config.main_backend_url, config.upstream_timeout)?);
    let gateway = Arc::new(MercadoPagoClient::new(
        &config.mercadopago,
        &config.main_backend_url,
        config.upstream_timeout,
    )?);
    if !gateway.verifies_signatures() {
        tracing::warn!("⚠️ MERCADOPAGO_WEBHOOK_SECRET not set, webhook signatures are not verified");
    }

    let checkout_service = Arc::new(CheckoutService::new(
        cart_client,
        gateway,
        config.mercadopago.notification_url.clone(),
        config.mercadopago.currency_id.clone(),
    ));

    // Admission filter dengan shared rate limiter
    let rate_limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));
    let admission = Arc::new(AdmissionFilter::from_config(&config, rate_limiter.clone()));
    info!(
        "✅ Admission filter ready: {:?} mode, origins {:?}, {} requests per {}s",
        admission.mode(),
        admission.origins().as_slice(),
        rate_limiter.max_requests(),
        rate_limiter.window_seconds()
    );

    // Start background jobs, scheduler harus tetap hidup selama server jalan
    let scheduler_metrics = SchedulerMetrics::new();
    let _scheduler = start_background_jobs(
        rate_limiter,
        scheduler_metrics.clone(),
        &config.rate_limit.sweep_cron,
    )
    .await?;

    let app_state = AppState {
        checkout_service,
        admission,
        scheduler_metrics,
    };

    let cors = utils::cors::create_cors_layer(&config);
    let app = routes::build_app(app_state, cors);

    let bind_address = config.bind_address();
    utils::banner::print_startup_banner(&bind_address, config.mode);

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("🚀 Checkout Service berjalan di {}", bind_address);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .map_err(|e| e.into())
}
