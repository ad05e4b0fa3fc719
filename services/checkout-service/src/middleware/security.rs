// /mp-checkout/services/checkout-service/src/middleware/security.rs

use axum::{
    extract::Request,
    http::{header, HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

/// Frame sources: MercadoPago checkout widgets and the translation widget
pub const CONTENT_SECURITY_POLICY: &str = "frame-src 'self' https://www.mercadopago.com https://www.mercadopago.com.ar \
https://www.mercadolibre.com https://mpago.la https://translate.google.com https://www.gstatic.com;";

/// Header tetap yang dipasang di setiap response
pub const SECURITY_HEADERS: [(HeaderName, &str); 5] = [
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::X_FRAME_OPTIONS, "DENY"),
    (header::X_XSS_PROTECTION, "1; mode=block"),
    (header::REFERRER_POLICY, "same-origin"),
    (header::CONTENT_SECURITY_POLICY, CONTENT_SECURITY_POLICY),
];

/// Set security headers, existing values are replaced
pub fn apply_security_headers(headers: &mut HeaderMap) {
    for (name, value) in SECURITY_HEADERS {
        headers.insert(name, HeaderValue::from_static(value));
    }
}

/// Security headers middleware
pub async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    apply_security_headers(response.headers_mut());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_applied() {
        let mut headers = HeaderMap::new();
        apply_security_headers(&mut headers);

        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert_eq!(headers["x-frame-options"], "DENY");
        assert_eq!(headers["x-xss-protection"], "1; mode=block");
        assert_eq!(headers["referrer-policy"], "same-origin");
        let csp = headers["content-security-policy"].to_str().unwrap();
        assert!(csp.starts_with("frame-src 'self' https://www.mercadopago.com "));
        assert!(csp.contains("https://mpago.la"));
        assert!(csp.ends_with("https://www.gstatic.com;"));
    }

    #[test]
    fn test_apply_twice_is_idempotent() {
        let mut once = HeaderMap::new();
        apply_security_headers(&mut once);

        let mut twice = HeaderMap::new();
        twice.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN"));
        apply_security_headers(&mut twice);
        apply_security_headers(&mut twice);

        assert_eq!(once, twice);
        assert_eq!(twice.get_all(header::X_FRAME_OPTIONS).iter().count(), 1);
    }
}
