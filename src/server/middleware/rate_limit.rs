//! Fixed-window rate limiting per client address
//!
//! Clients are identified by the peer address of the connection. The first
//! `X-Forwarded-For` hop is used instead only when
//! `rate_limit.trust_forwarded_for` is set, i.e. behind a proxy that
//! overwrites the header.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, Method},
    middleware::Next,
    response::Response,
};

use crate::config::RateLimitConfig;
use crate::core::error::WorkshopError;

struct Windows {
    counts: HashMap<String, (Instant, u32)>,
    last_sweep: Instant,
}

/// Counts requests per key inside fixed windows
///
/// Windows that have run out are swept at most once per window length, so
/// the map only holds clients seen recently.
pub struct FixedWindowLimiter {
    limit: u32,
    window: Duration,
    windows: Mutex<Windows>,
}

impl FixedWindowLimiter {
    /// A limit of zero disables the limiter
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            windows: Mutex::new(Windows {
                counts: HashMap::new(),
                last_sweep: Instant::now(),
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.limit > 0 && !self.window.is_zero()
    }

    /// Record one request for `key`; on rejection returns the seconds until
    /// the window resets
    pub fn check(&self, key: &str, now: Instant) -> Result<(), u64> {
        if !self.is_enabled() {
            return Ok(());
        }

        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        if now.saturating_duration_since(windows.last_sweep) >= self.window {
            let window = self.window;
            windows
                .counts
                .retain(|_, (started, _)| now.saturating_duration_since(*started) < window);
            windows.last_sweep = now;
        }

        let (started, count) = windows.counts.entry(key.to_string()).or_insert((now, 0));

        let elapsed = now.saturating_duration_since(*started);
        if elapsed >= self.window {
            *started = now;
            *count = 0;
        }

        if *count >= self.limit {
            let remaining = self.window.saturating_sub(elapsed);
            return Err(remaining.as_secs_f64().ceil().max(1.0) as u64);
        }
        *count += 1;
        Ok(())
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .counts
            .len()
    }
}

/// The general, login and create limiters with the client key source
#[derive(Clone)]
pub struct RateLimiters {
    pub general: Arc<FixedWindowLimiter>,
    pub login: Arc<FixedWindowLimiter>,
    pub create: Arc<FixedWindowLimiter>,
    /// Collection paths such as `/customers` whose `POST` creates a record
    collections: Arc<HashSet<String>>,
    trust_forwarded_for: bool,
}

impl RateLimiters {
    pub fn from_config(config: &RateLimitConfig, collections: HashSet<String>) -> Self {
        Self {
            general: Arc::new(FixedWindowLimiter::new(
                config.requests_per_window,
                Duration::from_secs(config.window_secs),
            )),
            login: Arc::new(FixedWindowLimiter::new(
                config.login_requests_per_window,
                Duration::from_secs(config.login_window_secs),
            )),
            create: Arc::new(FixedWindowLimiter::new(
                config.create_requests_per_window,
                Duration::from_secs(config.create_window_secs),
            )),
            collections: Arc::new(collections),
            trust_forwarded_for: config.trust_forwarded_for,
        }
    }

    fn enforce(&self, limiter: &FixedWindowLimiter, request: &Request) -> Result<(), WorkshopError> {
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        let key = client_key(request.headers(), peer, self.trust_forwarded_for);

        limiter.check(&key, Instant::now()).map_err(|retry_after_secs| {
            tracing::warn!(client = %key, path = %request.uri().path(), "rate limit exceeded");
            WorkshopError::RateLimited { retry_after_secs }
        })
    }

    fn is_create(&self, request: &Request) -> bool {
        request.method() == Method::POST && self.collections.contains(request.uri().path())
    }
}

/// The peer address, or the first `X-Forwarded-For` hop when trusted
///
/// Falls back to `local` when neither is known (in-process test clients).
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_forwarded_for: bool) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| trust_forwarded_for && !v.is_empty());

    match (forwarded, peer) {
        (Some(addr), _) => addr.to_string(),
        (None, Some(peer)) => peer.ip().to_string(),
        (None, None) => "local".to_string(),
    }
}

/// General limiter for every API request
pub async fn limit_requests(
    State(limiters): State<RateLimiters>,
    request: Request,
    next: Next,
) -> Result<Response, WorkshopError> {
    limiters.enforce(&limiters.general, &request)?;
    Ok(next.run(request).await)
}

/// Stricter limiter applied only to the login routes
pub async fn limit_logins(
    State(limiters): State<RateLimiters>,
    request: Request,
    next: Next,
) -> Result<Response, WorkshopError> {
    if request.uri().path().ends_with("/login") {
        limiters.enforce(&limiters.login, &request)?;
    }
    Ok(next.run(request).await)
}

/// Limiter for `POST` on a collection, i.e. record creation
pub async fn limit_creates(
    State(limiters): State<RateLimiters>,
    request: Request,
    next: Next,
) -> Result<Response, WorkshopError> {
    if limiters.is_create(&request) {
        limiters.enforce(&limiters.create, &request)?;
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::HeaderValue;

    #[test]
    fn test_limit_within_window() {
        let limiter = FixedWindowLimiter::new(2, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.check("a", now).is_ok());
        assert!(limiter.check("a", now).is_ok());
        let retry = limiter.check("a", now + Duration::from_secs(10)).unwrap_err();
        assert_eq!(retry, 50);
    }

    #[test]
    fn test_window_resets() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.check("a", now).is_ok());
        assert!(limiter.check("a", now).is_err());
        assert!(limiter.check("a", now + Duration::from_secs(60)).is_ok());
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.check("a", now).is_ok());
        assert!(limiter.check("b", now).is_ok());
    }

    #[test]
    fn test_zero_limit_disables() {
        let limiter = FixedWindowLimiter::new(0, Duration::from_secs(60));
        for _ in 0..100 {
            assert!(limiter.check("a", Instant::now()).is_ok());
        }
    }

    #[test]
    fn test_expired_windows_are_pruned() {
        let limiter = FixedWindowLimiter::new(5, Duration::from_secs(60));
        let now = Instant::now();
        for i in 0..50 {
            assert!(limiter.check(&format!("10.0.0.{i}"), now).is_ok());
        }
        assert_eq!(limiter.tracked_keys(), 50);

        assert!(limiter.check("10.0.1.1", now + Duration::from_secs(61)).is_ok());
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[test]
    fn test_client_key_ignores_forwarded_header_by_default() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        let peer: SocketAddr = "192.0.2.1:4000".parse().unwrap();

        assert_eq!(client_key(&headers, Some(peer), false), "192.0.2.1");
        assert_eq!(client_key(&headers, None, false), "local");
        assert_eq!(client_key(&HeaderMap::new(), None, false), "local");
    }

    #[test]
    fn test_client_key_uses_forwarded_header_when_trusted() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        let peer: SocketAddr = "192.0.2.1:4000".parse().unwrap();

        assert_eq!(client_key(&headers, Some(peer), true), "203.0.113.7");
        assert_eq!(client_key(&HeaderMap::new(), Some(peer), true), "192.0.2.1");
    }

    #[test]
    fn test_create_matches_collection_posts_only() {
        let collections = HashSet::from(["/customers".to_string()]);
        let limiters = RateLimiters::from_config(&RateLimitConfig::default(), collections);
        let request = |method: Method, path: &str| -> Request {
            axum::http::Request::builder()
                .method(method)
                .uri(path)
                .body(Body::empty())
                .unwrap()
        };

        assert!(limiters.is_create(&request(Method::POST, "/customers")));
        assert!(!limiters.is_create(&request(Method::GET, "/customers")));
        assert!(!limiters.is_create(&request(Method::POST, "/customers/login")));
        assert!(!limiters.is_create(&request(Method::POST, "/inventory")));
    }
}
