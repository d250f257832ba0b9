//! Per-client request rate limiting.
//!
//! Counters live in Redis keyed by `(client, minute bucket)` with a 60 second
//! expiry; the increment is atomic on the Redis side, so concurrent instances
//! share one window. The limiter fails open: if the cache is unreachable the
//! request is admitted and the failure is only logged.

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use redis::AsyncCommands;
use std::{net::SocketAddr, sync::Arc};
use tracing::{error, warn};

use super::state::AuthState;
use super::utils::extract_client_ip;

const WINDOW_SECONDS: u64 = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { count: u64, limit: u64 },
    Limited { limit: u64 },
}

#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn admit(&self, client: &str) -> RateLimitDecision;
}

/// Limiter used when no Redis URL is configured; admits everything.
#[derive(Clone, Debug)]
pub struct NoopRateLimiter;

#[async_trait]
impl RateLimiter for NoopRateLimiter {
    async fn admit(&self, _client: &str) -> RateLimitDecision {
        RateLimitDecision::Allowed { count: 0, limit: 0 }
    }
}

/// Counter operations the limiter needs from the shared cache.
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn increment(&self, key: &str) -> Result<u64>;
    async fn set_expiry(&self, key: &str, seconds: u64) -> Result<bool>;
}

/// Redis-backed [`CounterStore`] using a shared connection manager.
#[derive(Clone)]
pub struct RedisCounterStore {
    manager: redis::aio::ConnectionManager,
}

impl RedisCounterStore {
    /// # Errors
    /// Returns an error if the URL is invalid or the initial connection fails.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).context("invalid Redis URL")?;
        let manager = client
            .get_connection_manager()
            .await
            .context("failed to connect to Redis")?;
        Ok(Self { manager })
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment(&self, key: &str) -> Result<u64> {
        let mut conn = self.manager.clone();
        let count: u64 = conn.incr(key, 1_u64).await.context("INCR failed")?;
        Ok(count)
    }

    async fn set_expiry(&self, key: &str, seconds: u64) -> Result<bool> {
        let mut conn = self.manager.clone();
        let seconds = i64::try_from(seconds).unwrap_or(i64::MAX);
        let set: bool = conn.expire(key, seconds).await.context("EXPIRE failed")?;
        Ok(set)
    }
}

/// Fixed one-minute windows over a [`CounterStore`].
pub struct SlidingWindowLimiter<S> {
    store: S,
    limit: u64,
    burst: u64,
}

impl<S: CounterStore> SlidingWindowLimiter<S> {
    #[must_use]
    pub const fn new(store: S, limit: u64, burst: u64) -> Self {
        Self { store, limit, burst }
    }

    async fn admit_at(&self, client: &str, now_unix: i64) -> RateLimitDecision {
        let bucket = now_unix.div_euclid(60);
        let key = format!("ratelimit:{client}:{bucket}");

        let count = match self.store.increment(&key).await {
            Ok(count) => count,
            Err(err) => {
                log_store_failure(&err);
                return RateLimitDecision::Allowed {
                    count: 0,
                    limit: self.limit,
                };
            }
        };

        // First hit of the bucket owns setting the expiry; later hits reuse it.
        if count == 1 {
            if let Err(err) = self.store.set_expiry(&key, WINDOW_SECONDS).await {
                log_store_failure(&err);
            }
        }

        if count > self.limit + self.burst {
            RateLimitDecision::Limited { limit: self.limit }
        } else {
            RateLimitDecision::Allowed {
                count,
                limit: self.limit,
            }
        }
    }
}

#[async_trait]
impl<S: CounterStore> RateLimiter for SlidingWindowLimiter<S> {
    async fn admit(&self, client: &str) -> RateLimitDecision {
        self.admit_at(client, Utc::now().timestamp()).await
    }
}

/// Fail open, but keep the failure visible: connectivity problems are
/// expected and log at `warn`, anything else at `error`.
fn log_store_failure(err: &anyhow::Error) {
    match err.downcast_ref::<redis::RedisError>() {
        Some(redis_err)
            if redis_err.is_io_error()
                || redis_err.is_timeout()
                || redis_err.is_connection_refusal()
                || redis_err.is_connection_dropped() =>
        {
            warn!("rate limit cache unavailable, admitting request: {redis_err}");
        }
        _ => {
            error!("unexpected rate limit store failure, admitting request: {err}");
        }
    }
}

/// Middleware throttling every request by client address before routing.
pub async fn admit_request(
    State(auth_state): State<Arc<AuthState>>,
    request: Request,
    next: Next,
) -> Response {
    let client = extract_client_ip(request.headers()).unwrap_or_else(|| {
        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map_or_else(|| "unknown".to_string(), |info| info.0.ip().to_string())
    });

    match auth_state.rate_limiter().admit(&client).await {
        RateLimitDecision::Limited { limit } => {
            let mut response =
                (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded.").into_response();
            if let Ok(value) = HeaderValue::from_str(&limit.to_string()) {
                response.headers_mut().insert("x-ratelimit-limit", value);
            }
            response
        }
        RateLimitDecision::Allowed { count, limit } => {
            let mut response = next.run(request).await;
            // Noop limiter reports limit 0; no headers in that configuration.
            if limit > 0 {
                let headers = response.headers_mut();
                if let Ok(value) = HeaderValue::from_str(&limit.to_string()) {
                    headers.insert("x-ratelimit-limit", value);
                }
                let remaining = limit.saturating_sub(count);
                if let Ok(value) = HeaderValue::from_str(&remaining.to_string()) {
                    headers.insert("x-ratelimit-remaining", value);
                }
            }
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        counters: Mutex<HashMap<String, u64>>,
        expiries: Mutex<Vec<(String, u64)>>,
    }

    #[async_trait]
    impl CounterStore for MemoryStore {
        async fn increment(&self, key: &str) -> Result<u64> {
            let mut counters = self.counters.lock().await;
            let count = counters.entry(key.to_string()).or_insert(0);
            *count += 1;
            Ok(*count)
        }

        async fn set_expiry(&self, key: &str, seconds: u64) -> Result<bool> {
            self.expiries.lock().await.push((key.to_string(), seconds));
            Ok(true)
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl CounterStore for BrokenStore {
        async fn increment(&self, _key: &str) -> Result<u64> {
            Err(anyhow!("connection refused"))
        }

        async fn set_expiry(&self, _key: &str, _seconds: u64) -> Result<bool> {
            Err(anyhow!("connection refused"))
        }
    }

    #[tokio::test]
    async fn sixty_first_request_in_a_window_is_limited() {
        let limiter = SlidingWindowLimiter::new(MemoryStore::default(), 60, 0);
        let now = 1_700_000_000;

        for expected in 1..=60 {
            let decision = limiter.admit_at("203.0.113.7", now).await;
            assert_eq!(
                decision,
                RateLimitDecision::Allowed {
                    count: expected,
                    limit: 60
                }
            );
        }

        assert_eq!(
            limiter.admit_at("203.0.113.7", now).await,
            RateLimitDecision::Limited { limit: 60 }
        );
    }

    #[tokio::test]
    async fn window_rollover_admits_again() {
        let limiter = SlidingWindowLimiter::new(MemoryStore::default(), 60, 0);
        let now = 1_700_000_000;

        for _ in 0..61 {
            limiter.admit_at("203.0.113.7", now).await;
        }
        assert_eq!(
            limiter.admit_at("203.0.113.7", now).await,
            RateLimitDecision::Limited { limit: 60 }
        );

        // Next minute bucket starts a fresh counter.
        assert_eq!(
            limiter.admit_at("203.0.113.7", now + 60).await,
            RateLimitDecision::Allowed { count: 1, limit: 60 }
        );
    }

    #[tokio::test]
    async fn clients_are_throttled_independently() {
        let limiter = SlidingWindowLimiter::new(MemoryStore::default(), 1, 0);
        let now = 1_700_000_000;

        assert_eq!(
            limiter.admit_at("203.0.113.7", now).await,
            RateLimitDecision::Allowed { count: 1, limit: 1 }
        );
        assert_eq!(
            limiter.admit_at("203.0.113.7", now).await,
            RateLimitDecision::Limited { limit: 1 }
        );
        assert_eq!(
            limiter.admit_at("198.51.100.2", now).await,
            RateLimitDecision::Allowed { count: 1, limit: 1 }
        );
    }

    #[tokio::test]
    async fn burst_allowance_extends_the_threshold() {
        let limiter = SlidingWindowLimiter::new(MemoryStore::default(), 2, 2);
        let now = 1_700_000_000;

        for expected in 1..=4 {
            assert_eq!(
                limiter.admit_at("203.0.113.7", now).await,
                RateLimitDecision::Allowed {
                    count: expected,
                    limit: 2
                }
            );
        }
        assert_eq!(
            limiter.admit_at("203.0.113.7", now).await,
            RateLimitDecision::Limited { limit: 2 }
        );
    }

    #[tokio::test]
    async fn cache_outage_fails_open() {
        let limiter = SlidingWindowLimiter::new(BrokenStore, 60, 0);
        let decision = limiter.admit("203.0.113.7").await;
        assert_eq!(
            decision,
            RateLimitDecision::Allowed { count: 0, limit: 60 }
        );
    }

    #[tokio::test]
    async fn first_hit_sets_the_window_expiry() {
        let store = MemoryStore::default();
        let limiter = SlidingWindowLimiter::new(store, 60, 0);
        let now = 1_700_000_000;

        limiter.admit_at("203.0.113.7", now).await;
        limiter.admit_at("203.0.113.7", now).await;

        let expiries = limiter.store.expiries.lock().await;
        assert_eq!(expiries.len(), 1);
        assert_eq!(expiries[0].1, WINDOW_SECONDS);
    }

    #[tokio::test]
    async fn noop_rate_limiter_allows() {
        let limiter = NoopRateLimiter;
        assert_eq!(
            limiter.admit("203.0.113.7").await,
            RateLimitDecision::Allowed { count: 0, limit: 0 }
        );
    }
}
