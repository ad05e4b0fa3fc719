// /mp-checkout/services/checkout-service/src/utils/cors.rs

use tower_http::cors::CorsLayer;
use axum::http::{header, Method, HeaderValue};
use crate::config::{AdmissionMode, AppConfig};

/// Setup CORS layer untuk checkout service
pub fn create_cors_layer(config: &AppConfig) -> CorsLayer {
    match config.mode {
        AdmissionMode::Strict => build_production_cors(&config.allowed_origins),
        AdmissionMode::Permissive => build_development_cors(&config.allowed_origins),
    }
}

/// Build CORS configuration untuk development environment
fn build_development_cors(origins: &[String]) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(parse_allowed_origins(origins))
        .allow_methods(get_allowed_methods())
        .allow_headers(get_allowed_headers())
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Build CORS configuration untuk production dengan security ketat
fn build_production_cors(origins: &[String]) -> CorsLayer {
    let https_only: Vec<String> = origins
        .iter()
        .filter(|origin| origin.starts_with("https://"))
        .cloned()
        .collect();

    CorsLayer::new()
        .allow_origin(parse_allowed_origins(&https_only))
        .allow_methods(get_allowed_methods())
        .allow_headers(get_allowed_headers())
        .allow_credentials(true)
        .expose_headers([header::CONTENT_LENGTH, header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(86400))
}

/// Parse origins menjadi header values
///
/// Browsers never send a trailing slash in `Origin`, so such entries are
/// normalized and duplicates dropped.
fn parse_allowed_origins(origins: &[String]) -> Vec<HeaderValue> {
    let mut values: Vec<HeaderValue> = Vec::new();
    for origin in origins {
        let trimmed = origin.trim().trim_end_matches('/');
        match trimmed.parse::<HeaderValue>() {
            Ok(value) if !values.contains(&value) => {
                tracing::debug!("CORS origin registered: {}", trimmed);
                values.push(value);
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Invalid origin format '{}': {}", trimmed, e),
        }
    }
    values
}

/// Daftar HTTP methods yang diperbolehkan
fn get_allowed_methods() -> Vec<Method> {
    vec![Method::GET, Method::POST, Method::OPTIONS]
}

/// Daftar headers yang diizinkan (explicit list required untuk credentials)
fn get_allowed_headers() -> Vec<header::HeaderName> {
    vec![
        header::AUTHORIZATION,
        header::CONTENT_TYPE,
        header::ACCEPT,
        header::ORIGIN,
        header::REFERER,
        header::ACCEPT_LANGUAGE,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins_normalizes_trailing_slash() {
        let origins = parse_allowed_origins(&[
            "https://ispcfood.netlify.app".to_string(),
            "https://ispcfood.netlify.app/".to_string(),
            "http://localhost:4200".to_string(),
        ]);
        assert_eq!(origins.len(), 2);
        assert_eq!(origins[0], "https://ispcfood.netlify.app");
    }

    #[test]
    fn test_invalid_origin_skipped() {
        let origins = parse_allowed_origins(&["https://bad\norigin".to_string()]);
        assert!(origins.is_empty());
    }
}
