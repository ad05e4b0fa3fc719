// /mp-checkout/services/checkout-service/src/utils/banner.rs

use crate::config::AdmissionMode;

/// Print startup banner
pub fn print_startup_banner(bind_address: &str, mode: AdmissionMode) {
    println!(r#"
╔══════════════════════════════════════════════════════════╗
║                  CHECKOUT SERVICE v1.0.0                  ║
║                 MercadoPago checkout bridge               ║
╚══════════════════════════════════════════════════════════╝
    "#);

    tracing::info!("🚀 Checkout Service starting at {} ({:?} mode)", bind_address, mode);
    tracing::info!("📋 Available endpoints:");
    tracing::info!("    GET  /health                              - Liveness");
    tracing::info!("    POST /api/payments/create-preference/     - Create preference from cart");
    tracing::info!("    POST /api/payments/webhook/               - MercadoPago notifications");
    tracing::info!("    GET  /api/payments/status/{{payment_id}}    - Payment status");
    tracing::info!("    POST /api/payments/confirm-order/         - Confirm approved payment");
}
