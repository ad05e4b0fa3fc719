// /mp-checkout/services/checkout-service/src/utils/logger.rs

use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVES: &str = "checkout_service=debug,tower_http=debug";

/// Logger initialization, `LOG_FORMAT=json` untuk structured output
pub fn init_logger() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
