//! Auth configuration and shared per-process state.

use chrono::Duration;
use jsonwebtoken::Algorithm;
use secrecy::SecretString;
use std::sync::Arc;

use super::rate_limit::RateLimiter;
use super::token::TokenCodec;

const DEFAULT_ACCESS_TTL_MINUTES: i64 = 30;
const DEFAULT_REFRESH_TTL_DAYS: i64 = 7;
const DEFAULT_RATE_LIMIT_PER_MINUTE: u64 = 60;
const DEFAULT_RATE_LIMIT_BURST: u64 = 0;

#[derive(Clone, Copy, Debug)]
pub struct AuthConfig {
    algorithm: Algorithm,
    access_ttl_minutes: i64,
    refresh_ttl_days: i64,
    rate_limit_per_minute: u64,
    rate_limit_burst: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            algorithm: Algorithm::HS256,
            access_ttl_minutes: DEFAULT_ACCESS_TTL_MINUTES,
            refresh_ttl_days: DEFAULT_REFRESH_TTL_DAYS,
            rate_limit_per_minute: DEFAULT_RATE_LIMIT_PER_MINUTE,
            rate_limit_burst: DEFAULT_RATE_LIMIT_BURST,
        }
    }

    #[must_use]
    pub const fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    #[must_use]
    pub const fn with_access_ttl_minutes(mut self, minutes: i64) -> Self {
        self.access_ttl_minutes = minutes;
        self
    }

    #[must_use]
    pub const fn with_refresh_ttl_days(mut self, days: i64) -> Self {
        self.refresh_ttl_days = days;
        self
    }

    #[must_use]
    pub const fn with_rate_limit_per_minute(mut self, limit: u64) -> Self {
        self.rate_limit_per_minute = limit;
        self
    }

    #[must_use]
    pub const fn with_rate_limit_burst(mut self, burst: u64) -> Self {
        self.rate_limit_burst = burst;
        self
    }

    #[must_use]
    pub const fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    #[must_use]
    pub const fn access_ttl_minutes(&self) -> i64 {
        self.access_ttl_minutes
    }

    #[must_use]
    pub const fn refresh_ttl_days(&self) -> i64 {
        self.refresh_ttl_days
    }

    #[must_use]
    pub const fn rate_limit_per_minute(&self) -> u64 {
        self.rate_limit_per_minute
    }

    #[must_use]
    pub const fn rate_limit_burst(&self) -> u64 {
        self.rate_limit_burst
    }
}

/// Shared state for the auth pipeline: token codec plus rate limiter.
///
/// The signing secret is consumed at construction; nothing here is mutable
/// after startup.
pub struct AuthState {
    config: AuthConfig,
    codec: TokenCodec,
    rate_limiter: Arc<dyn RateLimiter>,
}

impl AuthState {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        token_secret: &SecretString,
        rate_limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        let codec = TokenCodec::new(
            token_secret,
            config.algorithm(),
            Duration::minutes(config.access_ttl_minutes()),
            Duration::days(config.refresh_ttl_days()),
        );
        Self {
            config,
            codec,
            rate_limiter,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub const fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub(crate) fn rate_limiter(&self) -> &dyn RateLimiter {
        self.rate_limiter.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::super::rate_limit::NoopRateLimiter;
    use super::*;

    #[test]
    fn auth_config_defaults_and_overrides() {
        let config = AuthConfig::new();

        assert_eq!(config.algorithm(), Algorithm::HS256);
        assert_eq!(config.access_ttl_minutes(), DEFAULT_ACCESS_TTL_MINUTES);
        assert_eq!(config.refresh_ttl_days(), DEFAULT_REFRESH_TTL_DAYS);
        assert_eq!(
            config.rate_limit_per_minute(),
            DEFAULT_RATE_LIMIT_PER_MINUTE
        );
        assert_eq!(config.rate_limit_burst(), DEFAULT_RATE_LIMIT_BURST);

        let config = config
            .with_algorithm(Algorithm::HS384)
            .with_access_ttl_minutes(5)
            .with_refresh_ttl_days(1)
            .with_rate_limit_per_minute(120)
            .with_rate_limit_burst(20);

        assert_eq!(config.algorithm(), Algorithm::HS384);
        assert_eq!(config.access_ttl_minutes(), 5);
        assert_eq!(config.refresh_ttl_days(), 1);
        assert_eq!(config.rate_limit_per_minute(), 120);
        assert_eq!(config.rate_limit_burst(), 20);
    }

    #[test]
    fn auth_state_exposes_a_working_codec() {
        let state = AuthState::new(
            AuthConfig::new(),
            &SecretString::from("signing-secret".to_string()),
            Arc::new(NoopRateLimiter),
        );
        assert_eq!(state.codec().access_ttl(), Duration::minutes(30));
        assert_eq!(state.codec().refresh_ttl(), Duration::days(7));
        assert_eq!(state.config().rate_limit_per_minute(), 60);
    }
}
