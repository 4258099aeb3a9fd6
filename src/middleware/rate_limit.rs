use axum::{
    extract::{connect_info::ConnectInfo, Request, State},
    http::{HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{
    collections::HashMap,
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;

use crate::error::AppError;

/// Endpoint key for image uploads.
pub const UPLOAD_ENDPOINT: &str = "/api/images/upload";
/// Shared key for every other mutating `/api` request.
pub const WRITE_ENDPOINT: &str = "/api:writes";

fn remote_ip(req: &Request, trusted_proxies: &[IpAddr]) -> IpAddr {
    let peer = req.extensions().get::<ConnectInfo<SocketAddr>>().map(|info| info.0.ip());
    client_ip(req.headers(), peer, trusted_proxies)
}

/// Client IP for rate limiting.
///
/// `X-Forwarded-For` and `X-Real-IP` are only honoured when the socket peer is one
/// of `trusted_proxies`; otherwise the peer address is used, then loopback.
pub fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>, trusted_proxies: &[IpAddr]) -> IpAddr {
    let fallback = peer.unwrap_or(IpAddr::from([127, 0, 0, 1]));
    if !peer.map(|p| trusted_proxies.contains(&p)).unwrap_or(false) {
        return fallback;
    }
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse::<IpAddr>().ok());
    let real_ip = || headers.get("x-real-ip").and_then(|v| v.to_str().ok()).and_then(|v| v.trim().parse().ok());
    forwarded.or_else(real_ip).unwrap_or(fallback)
}

/// Sliding-window limiter keyed by client IP.
#[derive(Clone)]
pub struct RateLimiter {
    requests: Arc<RwLock<HashMap<IpAddr, Vec<Instant>>>>,
    max_requests: usize,
    window: Duration,
    trusted_proxies: Arc<[IpAddr]>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window_seconds: u64) -> Self {
        Self {
            requests: Arc::new(RwLock::new(HashMap::new())),
            max_requests,
            window: Duration::from_secs(window_seconds),
            trusted_proxies: Arc::from(Vec::new()),
        }
    }

    /// Peers whose forwarding headers name the real client.
    pub fn trusting(mut self, proxies: &[IpAddr]) -> Self {
        self.trusted_proxies = Arc::from(proxies);
        self
    }

    /// Records the request if allowed, otherwise returns `RateLimited` with the wait time.
    pub async fn check(&self, ip: IpAddr) -> Result<(), AppError> {
        let now = Instant::now();
        let mut requests = self.requests.write().await;
        let timestamps = requests.entry(ip).or_default();

        // On clock skew keep the timestamp rather than letting requests through
        timestamps.retain(|&t| now.checked_duration_since(t).map(|d| d < self.window).unwrap_or(true));

        if timestamps.len() >= self.max_requests {
            let oldest = timestamps.first().copied().unwrap_or(now);
            let retry_after = now
                .checked_duration_since(oldest)
                .map(|elapsed| self.window.saturating_sub(elapsed))
                .unwrap_or(Duration::from_secs(1));
            return Err(AppError::RateLimited { retry_after_seconds: retry_after.as_secs().max(1) });
        }

        timestamps.push(now);
        Ok(())
    }

    /// Drops IPs with no requests left inside the window.
    pub async fn cleanup_old_entries(&self) {
        let now = Instant::now();
        let mut requests = self.requests.write().await;
        requests.retain(|_, timestamps| {
            timestamps.retain(|&t| now.checked_duration_since(t).map(|d| d < self.window).unwrap_or(true));
            !timestamps.is_empty()
        });
    }
}

/// Global per-IP limit applied to every request.
pub async fn rate_limit_middleware(State(limiter): State<RateLimiter>, req: Request, next: Next) -> Response {
    let ip = remote_ip(&req, &limiter.trusted_proxies);
    match limiter.check(ip).await {
        Ok(()) => next.run(req).await,
        Err(e) => {
            tracing::warn!(%ip, "Global rate limit exceeded");
            e.into_response()
        }
    }
}

/// Stricter limits for individual endpoints, on top of the global one.
#[derive(Clone, Default)]
pub struct EndpointRateLimiter {
    limiters: Arc<HashMap<&'static str, RateLimiter>>,
    trusted_proxies: Arc<[IpAddr]>,
}

impl EndpointRateLimiter {
    /// `(endpoint, max_requests, window_seconds)` triples.
    pub fn with_limits(limits: &[(&'static str, usize, u64)]) -> Self {
        let limiters: HashMap<&'static str, RateLimiter> =
            limits.iter().map(|&(endpoint, max, window)| (endpoint, RateLimiter::new(max, window))).collect();
        Self { limiters: Arc::new(limiters), trusted_proxies: Arc::from(Vec::new()) }
    }

    pub fn trusting(mut self, proxies: &[IpAddr]) -> Self {
        self.trusted_proxies = Arc::from(proxies);
        self
    }

    pub async fn check(&self, endpoint: &str, ip: IpAddr) -> Result<(), AppError> {
        match self.limiters.get(endpoint) {
            Some(limiter) => limiter.check(ip).await,
            None => Ok(()),
        }
    }

    pub async fn cleanup_all(&self) {
        for limiter in self.limiters.values() {
            limiter.cleanup_old_entries().await;
        }
    }
}

fn endpoint_key(method: &Method, path: &str) -> Option<&'static str> {
    if path == UPLOAD_ENDPOINT {
        return Some(UPLOAD_ENDPOINT);
    }
    let mutating = matches!(*method, Method::POST | Method::PUT | Method::DELETE | Method::PATCH);
    (mutating && path.starts_with("/api/")).then_some(WRITE_ENDPOINT)
}

/// Applies the endpoint limits to uploads and entity writes.
pub async fn endpoint_rate_limit_middleware(
    State(limiter): State<EndpointRateLimiter>,
    req: Request,
    next: Next,
) -> Response {
    if let Some(key) = endpoint_key(req.method(), req.uri().path()) {
        let ip = remote_ip(&req, &limiter.trusted_proxies);
        if let Err(e) = limiter.check(key, ip).await {
            tracing::warn!(%ip, endpoint = key, "Endpoint rate limit exceeded");
            return e.into_response();
        }
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn limits_per_ip_within_window() {
        let limiter = RateLimiter::new(2, 60);
        let ip1 = IpAddr::from([10, 0, 0, 1]);
        let ip2 = IpAddr::from([10, 0, 0, 2]);

        assert!(limiter.check(ip1).await.is_ok());
        assert!(limiter.check(ip1).await.is_ok());
        assert!(matches!(limiter.check(ip1).await, Err(AppError::RateLimited { .. })));
        assert!(limiter.check(ip2).await.is_ok());
    }

    #[tokio::test]
    async fn window_expiry_allows_again() {
        let limiter = RateLimiter::new(1, 1);
        let ip = IpAddr::from([127, 0, 0, 1]);
        assert!(limiter.check(ip).await.is_ok());
        assert!(limiter.check(ip).await.is_err());
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(limiter.check(ip).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_endpoint_is_unlimited() {
        let limiter = EndpointRateLimiter::with_limits(&[("/api/images/upload", 1, 60)]);
        let ip = IpAddr::from([127, 0, 0, 1]);
        assert!(limiter.check("/api/images/upload", ip).await.is_ok());
        assert!(limiter.check("/api/images/upload", ip).await.is_err());
        assert!(limiter.check("/api/walks", ip).await.is_ok());
    }

    #[test]
    fn endpoint_keys() {
        assert_eq!(endpoint_key(&Method::POST, "/api/images/upload"), Some(UPLOAD_ENDPOINT));
        assert_eq!(endpoint_key(&Method::PUT, "/api/regions/x"), Some(WRITE_ENDPOINT));
        assert_eq!(endpoint_key(&Method::DELETE, "/api/walks/x"), Some(WRITE_ENDPOINT));
        assert_eq!(endpoint_key(&Method::GET, "/api/walks"), None);
        assert_eq!(endpoint_key(&Method::POST, "/healthz"), None);
    }

    #[test]
    fn forwarded_headers_need_a_trusted_peer() {
        let proxy = IpAddr::from([10, 0, 0, 1]);
        let client = IpAddr::from([192, 0, 2, 1]);
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        headers.insert("x-real-ip", "198.51.100.2".parse().unwrap());

        assert_eq!(client_ip(&headers, Some(proxy), &[proxy]), IpAddr::from([203, 0, 113, 7]));
        // spoofed headers from an arbitrary client are ignored
        assert_eq!(client_ip(&headers, Some(client), &[proxy]), client);
        assert_eq!(client_ip(&headers, Some(client), &[]), client);
        assert_eq!(client_ip(&headers, None, &[proxy]), IpAddr::from([127, 0, 0, 1]));

        headers.remove("x-forwarded-for");
        assert_eq!(client_ip(&headers, Some(proxy), &[proxy]), IpAddr::from([198, 51, 100, 2]));
        assert_eq!(client_ip(&HeaderMap::new(), Some(proxy), &[proxy]), proxy);
    }

    #[tokio::test]
    async fn rotating_forwarded_for_does_not_reset_the_budget() {
        let limiter = RateLimiter::new(2, 60);
        let peer = SocketAddr::from(([192, 0, 2, 9], 50000));
        let request = |n: u8| {
            let mut req = Request::new(axum::body::Body::empty());
            req.headers_mut().insert("x-forwarded-for", format!("203.0.113.{}", n).parse().unwrap());
            req.extensions_mut().insert(ConnectInfo(peer));
            req
        };

        for n in 0..2 {
            let ip = remote_ip(&request(n), &limiter.trusted_proxies);
            assert!(limiter.check(ip).await.is_ok());
        }
        let ip = remote_ip(&request(2), &limiter.trusted_proxies);
        assert_eq!(ip, peer.ip());
        assert!(matches!(limiter.check(ip).await, Err(AppError::RateLimited { .. })));
    }
}
