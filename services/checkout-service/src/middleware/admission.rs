// /mp-checkout/services/checkout-service/src/middleware/admission.rs

use std::{fmt, net::SocketAddr, sync::Arc};
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, Method},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use crate::{
    config::{AdmissionMode, AppConfig},
    middleware::rate_limit::RateLimiter,
    utils::error::AppError,
};

const FORWARDED_FOR: &str = "x-forwarded-for";
const UNKNOWN_CLIENT: &str = "unknown";

/// Hasil evaluasi admission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Reject(RejectReason),
}

impl Decision {
    pub fn is_reject(&self) -> bool {
        matches!(self, Decision::Reject(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    OriginNotAllowed(String),
    RefererNotAllowed(String),
    RateLimited { limit: usize, window_seconds: i64 },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::OriginNotAllowed(origin) => write!(f, "Origin not allowed: {}", origin),
            RejectReason::RefererNotAllowed(referer) => write!(f, "Referer not allowed: {}", referer),
            RejectReason::RateLimited { limit, window_seconds } => {
                write!(f, "Rate limit exceeded ({} requests per {}s)", limit, window_seconds)
            }
        }
    }
}

/// Snapshot of the request fields the filter looks at
#[derive(Debug, Clone)]
pub struct AdmissionRequest {
    pub method: Method,
    pub origin: Option<String>,
    pub referer: Option<String>,
    pub client_id: String,
    pub timestamp: DateTime<Utc>,
}

impl AdmissionRequest {
    pub fn from_request(req: &Request, timestamp: DateTime<Utc>) -> Self {
        Self {
            method: req.method().clone(),
            origin: header_str(req.headers(), header::ORIGIN.as_str()),
            referer: header_str(req.headers(), header::REFERER.as_str()),
            client_id: resolve_client_id(req),
            timestamp,
        }
    }
}

/// Allow-list origin, exact match untuk Origin dan prefix match untuk Referer
#[derive(Debug, Clone, Default)]
pub struct AllowedOrigins {
    origins: Vec<String>,
}

impl AllowedOrigins {
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list: Vec<String> = Vec::new();
        for origin in origins {
            let origin = origin.into();
            if !origin.is_empty() && !list.contains(&origin) {
                list.push(origin);
            }
        }
        Self { origins: list }
    }

    pub fn contains(&self, origin: &str) -> bool {
        self.origins.iter().any(|allowed| allowed == origin)
    }

    pub fn is_prefix_of(&self, referer: &str) -> bool {
        self.origins.iter().any(|allowed| referer.starts_with(allowed.as_str()))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.origins
    }
}

/// Request admission filter: origin policy plus per-client rate limit
pub struct AdmissionFilter {
    mode: AdmissionMode,
    origins: AllowedOrigins,
    limiter: Arc<RateLimiter>,
}

impl AdmissionFilter {
    pub fn new(mode: AdmissionMode, origins: AllowedOrigins, limiter: Arc<RateLimiter>) -> Self {
        Self { mode, origins, limiter }
    }

    pub fn from_config(config: &AppConfig, limiter: Arc<RateLimiter>) -> Self {
        Self::new(config.mode, AllowedOrigins::new(config.allowed_origins.clone()), limiter)
    }

    pub fn mode(&self) -> AdmissionMode {
        self.mode
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn origins(&self) -> &AllowedOrigins {
        &self.origins
    }

    /// Origin / Referer check untuk mutating requests
    pub fn evaluate_origin(&self, request: &AdmissionRequest) -> Decision {
        if !self.mode.is_strict() || !is_mutating(&request.method) {
            return Decision::Allow;
        }

        if let Some(origin) = request.origin.as_deref() {
            if !self.origins.contains(origin) {
                tracing::warn!(
                    "Request rejected - origin not allowed: {} from client: {}",
                    origin,
                    request.client_id
                );
                return Decision::Reject(RejectReason::OriginNotAllowed(origin.to_string()));
            }
        }

        if let Some(referer) = request.referer.as_deref() {
            if !self.origins.is_prefix_of(referer) {
                tracing::warn!(
                    "Request rejected - referer not allowed: {} from client: {}",
                    referer,
                    request.client_id
                );
                return Decision::Reject(RejectReason::RefererNotAllowed(referer.to_string()));
            }
        }

        Decision::Allow
    }

    /// Sliding window rate limit per client
    pub async fn evaluate_rate_limit(&self, client_id: &str, now: DateTime<Utc>) -> Decision {
        if !self.mode.is_strict() {
            return Decision::Allow;
        }

        let decision = self.limiter.check(client_id, now).await;
        if decision.is_reject() {
            tracing::warn!("Rate limit exceeded for client: {}", client_id);
        }
        decision
    }

    /// Origin check first; a rejected origin does not consume rate limit quota
    pub async fn evaluate(&self, request: &AdmissionRequest) -> Decision {
        match self.evaluate_origin(request) {
            Decision::Allow => self.evaluate_rate_limit(&request.client_id, request.timestamp).await,
            rejected => rejected,
        }
    }
}

/// POST, PUT, PATCH dan DELETE
pub fn is_mutating(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE)
}

/// Resolve client identifier dari request
pub fn resolve_client_id(req: &Request) -> String {
    client_id_from_parts(req.headers(), peer_addr(req))
}

fn peer_addr(req: &Request) -> Option<SocketAddr> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}

/// First X-Forwarded-For hop, falling back to the peer address
pub fn client_id_from_parts(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get(FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty());

    match (forwarded, peer) {
        (Some(hop), _) => hop.to_string(),
        (None, Some(addr)) => addr.ip().to_string(),
        (None, None) => UNKNOWN_CLIENT.to_string(),
    }
}

/// Header value as text; non-ASCII bytes are replaced, never dropped
fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
}

/// Admission middleware, dipasang sebelum semua handler
pub async fn admission_middleware(
    State(filter): State<Arc<AdmissionFilter>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let request = AdmissionRequest::from_request(&req, Utc::now());

    match filter.evaluate(&request).await {
        Decision::Allow => Ok(next.run(req).await),
        Decision::Reject(reason) => Err(AppError::Forbidden(reason.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::{Duration, TimeZone};

    const SHOP: &str = "https://ispcfood.netlify.app";

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(seconds)
    }

    fn filter(mode: AdmissionMode) -> AdmissionFilter {
        AdmissionFilter::new(
            mode,
            AllowedOrigins::new([SHOP, "https://ispcfood.netlify.app/"]),
            Arc::new(RateLimiter::new(100, 60, 1000)),
        )
    }

    fn request(method: Method, origin: Option<&str>, referer: Option<&str>) -> AdmissionRequest {
        AdmissionRequest {
            method,
            origin: origin.map(str::to_string),
            referer: referer.map(str::to_string),
            client_id: "203.0.113.7".to_string(),
            timestamp: at(0),
        }
    }

    #[test]
    fn test_foreign_origin_rejected_for_mutating_methods() {
        let filter = filter(AdmissionMode::Strict);
        for method in [Method::POST, Method::PUT, Method::PATCH, Method::DELETE] {
            let decision = filter.evaluate_origin(&request(method, Some("https://evil.example"), None));
            assert_eq!(
                decision,
                Decision::Reject(RejectReason::OriginNotAllowed("https://evil.example".into()))
            );
        }
    }

    #[test]
    fn test_read_only_methods_bypass_origin_check() {
        let filter = filter(AdmissionMode::Strict);
        for method in [Method::GET, Method::HEAD, Method::OPTIONS] {
            let decision = filter.evaluate_origin(&request(method, Some("https://evil.example"), None));
            assert_eq!(decision, Decision::Allow);
        }
    }

    #[test]
    fn test_origin_must_match_exactly() {
        let filter = filter(AdmissionMode::Strict);
        let decision = filter.evaluate_origin(&request(Method::POST, Some("https://ispcfood.netlify.app.evil"), None));
        assert!(decision.is_reject());
        assert_eq!(filter.evaluate_origin(&request(Method::POST, Some(SHOP), None)), Decision::Allow);
    }

    #[test]
    fn test_referer_prefix_match() {
        let filter = filter(AdmissionMode::Strict);
        let allowed = request(Method::POST, None, Some("https://ispcfood.netlify.app/checkout?step=2"));
        assert_eq!(filter.evaluate_origin(&allowed), Decision::Allow);

        let rejected = request(Method::POST, None, Some("https://other.example/ispcfood"));
        assert_eq!(
            filter.evaluate_origin(&rejected),
            Decision::Reject(RejectReason::RefererNotAllowed("https://other.example/ispcfood".into()))
        );
    }

    #[test]
    fn test_allowed_origin_with_bad_referer_rejected() {
        let filter = filter(AdmissionMode::Strict);
        let decision = filter.evaluate_origin(&request(Method::POST, Some(SHOP), Some("https://evil.example/")));
        assert!(matches!(decision, Decision::Reject(RejectReason::RefererNotAllowed(_))));
    }

    #[test]
    fn test_missing_headers_are_allowed() {
        let filter = filter(AdmissionMode::Strict);
        assert_eq!(filter.evaluate_origin(&request(Method::POST, None, None)), Decision::Allow);
    }

    #[test]
    fn test_permissive_mode_never_rejects_origin() {
        let filter = filter(AdmissionMode::Permissive);
        let decision = filter.evaluate_origin(&request(
            Method::DELETE,
            Some("https://evil.example"),
            Some("https://evil.example/page"),
        ));
        assert_eq!(decision, Decision::Allow);
    }

    #[tokio::test]
    async fn test_permissive_mode_skips_rate_limit() {
        let filter = AdmissionFilter::new(
            AdmissionMode::Permissive,
            AllowedOrigins::new([SHOP]),
            Arc::new(RateLimiter::new(1, 60, 10)),
        );
        for _ in 0..5 {
            assert_eq!(filter.evaluate_rate_limit("client", at(0)).await, Decision::Allow);
        }
        assert_eq!(filter.limiter().tracked_clients().await, 0);
    }

    #[tokio::test]
    async fn test_origin_rejection_does_not_consume_quota() {
        let filter = filter(AdmissionMode::Strict);
        let bad = request(Method::POST, Some("https://evil.example"), None);
        assert!(filter.evaluate(&bad).await.is_reject());
        assert_eq!(filter.limiter().hits_in_window("203.0.113.7", at(0)).await, 0);

        let good = request(Method::POST, Some(SHOP), None);
        assert_eq!(filter.evaluate(&good).await, Decision::Allow);
        assert_eq!(filter.limiter().hits_in_window("203.0.113.7", at(0)).await, 1);
    }

    #[test]
    fn test_non_ascii_headers_are_not_treated_as_absent() {
        let filter = filter(AdmissionMode::Strict);

        let mut req = Request::builder()
            .method(Method::POST)
            .uri("/api/payments/create-preference/")
            .body(axum::body::Body::empty())
            .unwrap();
        req.headers_mut().insert(
            header::ORIGIN,
            HeaderValue::from_bytes(b"https://evil.example/\xe9").unwrap(),
        );
        let snapshot = AdmissionRequest::from_request(&req, at(0));
        assert!(snapshot.origin.is_some());
        assert!(matches!(
            filter.evaluate_origin(&snapshot),
            Decision::Reject(RejectReason::OriginNotAllowed(_))
        ));

        req.headers_mut().remove(header::ORIGIN);
        req.headers_mut().insert(
            header::REFERER,
            HeaderValue::from_bytes(b"https://evil.example/caf\xe9").unwrap(),
        );
        let snapshot = AdmissionRequest::from_request(&req, at(0));
        assert!(matches!(
            filter.evaluate_origin(&snapshot),
            Decision::Reject(RejectReason::RefererNotAllowed(_))
        ));
    }

    #[test]
    fn test_client_id_takes_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR, HeaderValue::from_static(" 198.51.100.4 , 10.0.0.1, 10.0.0.2"));
        let peer: SocketAddr = "127.0.0.1:4000".parse().unwrap();

        assert_eq!(client_id_from_parts(&headers, Some(peer)), "198.51.100.4");
        // deterministic across calls
        assert_eq!(client_id_from_parts(&headers, Some(peer)), "198.51.100.4");
    }

    #[test]
    fn test_client_id_falls_back_to_peer() {
        let peer: SocketAddr = "192.0.2.10:5555".parse().unwrap();
        assert_eq!(client_id_from_parts(&HeaderMap::new(), Some(peer)), "192.0.2.10");
        assert_eq!(client_id_from_parts(&HeaderMap::new(), None), "unknown");

        let mut blank = HeaderMap::new();
        blank.insert(FORWARDED_FOR, HeaderValue::from_static(" , 10.0.0.1"));
        assert_eq!(client_id_from_parts(&blank, Some(peer)), "192.0.2.10");
    }

    #[test]
    fn test_resolve_client_id_reads_connect_info() {
        let mut req = Request::builder()
            .uri("/api/payments/webhook/")
            .body(axum::body::Body::empty())
            .unwrap();
        let peer: SocketAddr = "192.0.2.99:8080".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(peer));
        assert_eq!(peer_addr(&req), Some(peer));
        assert_eq!(resolve_client_id(&req), "192.0.2.99");

        req.headers_mut().insert(FORWARDED_FOR, HeaderValue::from_static("198.51.100.20, 10.0.0.1"));
        req.headers_mut().insert(header::ORIGIN, HeaderValue::from_static(SHOP));
        let snapshot = AdmissionRequest::from_request(&req, at(0));
        assert_eq!(snapshot.client_id, "198.51.100.20");
        assert_eq!(snapshot.origin.as_deref(), Some(SHOP));
        assert!(snapshot.referer.is_none());
    }
}
