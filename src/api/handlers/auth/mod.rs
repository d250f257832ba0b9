//! Auth handlers and supporting modules.
//!
//! This module coordinates credential registration/login, stateless token
//! issuance and verification, role-gated authorization, and request rate
//! limiting.
//!
//! ## Token Model
//!
//! Logins issue a short-lived `access` token and a long-lived `refresh`
//! token, both HS256-signed with the process-wide secret. The type tag is
//! inside the signed claims, so the refresh endpoint is the only place a
//! refresh token is worth anything.
//!
//! ## Failure Policy
//!
//! Identity resolution fails closed: a database outage is a 500, never a
//! silent pass. Rate limiting fails open: a cache outage admits traffic and
//! logs. See `rate_limit` and `principal` for the details.

pub(crate) mod login;
mod password;
pub(crate) mod principal;
pub(crate) mod rate_limit;
pub(crate) mod refresh;
pub(crate) mod register;
pub(crate) mod roles;
mod state;
pub(crate) mod storage;
mod token;
pub(crate) mod types;
pub(crate) mod utils;

pub use principal::{authorize, optional_auth, require_auth, AuthError, Principal};
pub use rate_limit::{
    admit_request, CounterStore, NoopRateLimiter, RateLimitDecision, RateLimiter,
    RedisCounterStore, SlidingWindowLimiter,
};
pub use roles::Role;
pub use state::{AuthConfig, AuthState};
pub use token::{Claims, TokenCodec, TokenError, TokenKind};

#[cfg(test)]
mod tests;
