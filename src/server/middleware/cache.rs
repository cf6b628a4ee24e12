//! Short-lived cache for successful `GET` responses
//!
//! The bearer token is verified before any lookup, so an expired token or a
//! deleted account never gets a cached body. Entries are keyed by the
//! verified principal and the request URI; requests without a token share
//! the anonymous entries. A token that fails verification bypasses the cache
//! and reaches the handler, which reports the failure. Entries expire after
//! the configured TTL; writes do not invalidate them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{HeaderMap, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::core::auth::Authenticator;
use crate::core::error::WorkshopError;

/// `(owner, uri)`
type CacheKey = (String, String);

const ANONYMOUS: &str = "anonymous";

#[derive(Clone)]
struct CachedResponse {
    stored_at: Instant,
    headers: HeaderMap,
    body: Bytes,
}

/// In-process response cache
pub struct ResponseCache {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, CachedResponse>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// A zero TTL turns the cache off
    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    fn lookup(&self, key: &CacheKey, now: Instant) -> Option<CachedResponse> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(key) {
            Some(entry) if now.duration_since(entry.stored_at) < self.ttl => Some(entry.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn store(&self, key: CacheKey, headers: HeaderMap, body: Bytes, now: Instant) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, entry| now.duration_since(entry.stored_at) < self.ttl);
        entries.insert(
            key,
            CachedResponse {
                stored_at: now,
                headers,
                body,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Serve `GET` requests from the cache, filling it from `200` responses
pub async fn cache_responses(
    State((cache, authenticator)): State<(Arc<ResponseCache>, Authenticator)>,
    request: Request,
    next: Next,
) -> Response {
    if !cache.is_enabled() || request.method() != Method::GET {
        return next.run(request).await;
    }

    let owner = if request.headers().contains_key(header::AUTHORIZATION) {
        match authenticator.verify(request.headers()).await {
            Ok(principal) => format!("{}:{}", principal.role, principal.id),
            Err(_) => return next.run(request).await,
        }
    } else {
        ANONYMOUS.to_string()
    };
    let key = (owner, request.uri().to_string());
    if let Some(hit) = cache.lookup(&key, Instant::now()) {
        tracing::debug!(uri = %key.1, "cache hit");
        let mut response = Response::new(Body::from(hit.body));
        *response.headers_mut() = hit.headers;
        return response;
    }

    let response = next.run(request).await;
    if response.status() != StatusCode::OK {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(error = %e, "failed to buffer response body");
            return WorkshopError::Internal(e.to_string()).into_response();
        }
    };
    cache.store(key, parts.headers.clone(), bytes.clone(), Instant::now());
    Response::from_parts(parts, Body::from(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(uri: &str) -> CacheKey {
        ("mechanic:7f1c".to_string(), uri.to_string())
    }

    #[test]
    fn test_lookup_returns_fresh_entry() {
        let cache = ResponseCache::new(Duration::from_secs(30));
        let now = Instant::now();
        cache.store(key("/customers"), HeaderMap::new(), Bytes::from("[]"), now);

        let hit = cache.lookup(&key("/customers"), now + Duration::from_secs(5));
        assert_eq!(hit.map(|h| h.body), Some(Bytes::from("[]")));
    }

    #[test]
    fn test_lookup_drops_expired_entry() {
        let cache = ResponseCache::new(Duration::from_secs(30));
        let now = Instant::now();
        cache.store(key("/customers"), HeaderMap::new(), Bytes::from("[]"), now);

        assert!(cache.lookup(&key("/customers"), now + Duration::from_secs(31)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_entries_are_per_caller() {
        let cache = ResponseCache::new(Duration::from_secs(30));
        let now = Instant::now();
        cache.store(key("/customers"), HeaderMap::new(), Bytes::from("[]"), now);

        let other = (ANONYMOUS.to_string(), "/customers".to_string());
        assert!(cache.lookup(&other, now).is_none());
    }

    #[test]
    fn test_zero_ttl_disables() {
        assert!(!ResponseCache::new(Duration::ZERO).is_enabled());
        assert!(ResponseCache::new(Duration::from_secs(1)).is_enabled());
    }
}
