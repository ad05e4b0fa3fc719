// /mp-checkout/services/checkout-service/src/config.rs

use std::env;
use std::time::Duration;
use crate::{
    middleware::rate_limit::MAX_WINDOW_SECONDS,
    utils::error::{AppError, AppResult},
};

const DEFAULT_ALLOWED_ORIGINS: &str = "https://ispcfood.netlify.app,https://ispcfood.netlify.app/";

/// Deployment posture untuk admission filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionMode {
    /// Production: origin and rate-limit checks enforced
    Strict,
    /// Debug: every request admitted
    Permissive,
}

impl AdmissionMode {
    pub fn is_strict(self) -> bool {
        matches!(self, AdmissionMode::Strict)
    }
}

/// Sliding window rate limit settings
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window_seconds: i64,
    /// Upper bound on tracked clients before LRU eviction kicks in
    pub max_clients: usize,
    /// Cron expression untuk background sweep
    pub sweep_cron: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_seconds: 60,
            max_clients: 10_000,
            sweep_cron: "*/30 * * * * *".to_string(),
        }
    }
}

/// MercadoPago credentials and endpoints
#[derive(Debug, Clone)]
pub struct MercadoPagoConfig {
    pub access_token: String,
    pub api_url: String,
    pub webhook_secret: Option<String>,
    pub notification_url: Option<String>,
    pub currency_id: String,
}

/// Application configuration loaded dari environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mode: AdmissionMode,
    pub allowed_origins: Vec<String>,
    pub rate_limit: RateLimitConfig,
    pub main_backend_url: String,
    pub mercadopago: MercadoPagoConfig,
    pub upstream_timeout: Duration,
    pub port: u16,
}

impl AppConfig {
    /// Load configuration dari environment variables
    pub fn from_env() -> AppResult<Self> {
        let debug = parse_bool(&env_or("DEBUG", "false"));
        let mode = if debug {
            AdmissionMode::Permissive
        } else {
            AdmissionMode::Strict
        };

        let allowed_origins = parse_origin_list(&env_or("ALLOWED_ORIGINS", DEFAULT_ALLOWED_ORIGINS));
        if allowed_origins.is_empty() {
            return Err(AppError::Configuration("ALLOWED_ORIGINS is empty".to_string()));
        }

        let defaults = RateLimitConfig::default();
        let rate_limit = RateLimitConfig {
            max_requests: parse_number("RATE_LIMIT_MAX_REQUESTS", defaults.max_requests)?,
            window_seconds: parse_number("RATE_LIMIT_WINDOW_SECONDS", defaults.window_seconds)?,
            max_clients: parse_number("RATE_LIMIT_MAX_CLIENTS", defaults.max_clients)?,
            sweep_cron: env_or("RATE_LIMIT_SWEEP_CRON", &defaults.sweep_cron),
        };
        if rate_limit.max_requests == 0 || rate_limit.window_seconds <= 0 {
            return Err(AppError::Configuration(
                "Rate limit threshold and window must be positive".to_string(),
            ));
        }
        if rate_limit.window_seconds > MAX_WINDOW_SECONDS {
            return Err(AppError::Configuration(format!(
                "RATE_LIMIT_WINDOW_SECONDS must not exceed {}",
                MAX_WINDOW_SECONDS
            )));
        }

        let access_token = env::var("MERCADOPAGO_ACCESS_TOKEN")
            .map_err(|_| AppError::Configuration("MERCADOPAGO_ACCESS_TOKEN not set".to_string()))?;

        let mercadopago = MercadoPagoConfig {
            access_token,
            api_url: trim_url(&env_or("MERCADOPAGO_API_URL", "https://api.mercadopago.com")),
            webhook_secret: env::var("MERCADOPAGO_WEBHOOK_SECRET").ok().filter(|s| !s.is_empty()),
            notification_url: env::var("MERCADOPAGO_NOTIFICATION_URL").ok().filter(|s| !s.is_empty()),
            currency_id: env_or("CURRENCY_ID", "ARS"),
        };

        Ok(Self {
            mode,
            allowed_origins,
            rate_limit,
            main_backend_url: trim_url(&env_or("MAIN_BACKEND_URL", "http://localhost:8000")),
            mercadopago,
            upstream_timeout: Duration::from_secs(parse_number("UPSTREAM_TIMEOUT_SECONDS", 10u64)?),
            port: parse_number("SERVER_PORT", 8001u16)?,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn parse_number<T: std::str::FromStr>(key: &str, default: T) -> AppResult<T> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|_| {
            AppError::Configuration(format!("{} has invalid value '{}'", key, raw))
        }),
        Err(_) => Ok(default),
    }
}

/// Parse comma separated origins, empty entries dibuang
pub fn parse_origin_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

fn trim_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
