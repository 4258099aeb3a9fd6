//! Security and caching headers added to every response.

use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, PRAGMA};
use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::config::AppConfig;

/// Conservative defaults (nosniff, frame/referrer/permissions policies,
/// same-origin COOP) plus optional HSTS and CSP from `[security]`.
///
/// JSON responses are marked `no-store`. Served images may be cached for a day;
/// uploads can overwrite a name, so they are not marked immutable.
pub async fn security_headers_middleware(
    State(cfg): State<Arc<AppConfig>>,
    req: Request,
    next: Next,
) -> Response {
    let mut res = next.run(req).await;
    let headers = res.headers_mut();

    let fixed = [
        ("x-content-type-options", "nosniff"),
        ("x-frame-options", "DENY"),
        ("referrer-policy", "no-referrer"),
        ("permissions-policy", "geolocation=(), microphone=(), camera=()"),
        ("cross-origin-opener-policy", "same-origin"),
    ];
    for (name, value) in fixed {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }

    if let Some(sec) = cfg.security.as_ref() {
        if sec.enable_hsts.unwrap_or(false) {
            let value = format!("max-age={}", sec.hsts_max_age.unwrap_or(31_536_000));
            if let Ok(v) = HeaderValue::from_str(&value) {
                headers.insert(HeaderName::from_static("strict-transport-security"), v);
            }
        }
        if let Some(csp) = sec.csp.as_deref().filter(|c| !c.trim().is_empty()) {
            match HeaderValue::from_str(csp) {
                Ok(v) => {
                    headers.insert(HeaderName::from_static("content-security-policy"), v);
                }
                Err(e) => tracing::warn!("Ignoring invalid security.csp: {}", e),
            }
        }
    }

    let content_type = headers.get(CONTENT_TYPE).and_then(|ct| ct.to_str().ok()).map(str::to_owned);
    match content_type.as_deref() {
        Some(ct) if ct.starts_with("application/json") => {
            headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
            headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        }
        Some(ct) if ct.starts_with("image/") => {
            headers.insert(CACHE_CONTROL, HeaderValue::from_static("public, max-age=86400"));
            headers.remove(PRAGMA);
        }
        _ => {}
    }

    res
}
