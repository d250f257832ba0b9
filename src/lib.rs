//! # Ingresso (Venue Services & Access API)
//!
//! `ingresso` is a multi-tenant venue-services backend: authentication,
//! parking, ticketing, concierge commerce, and partner opportunities exposed
//! as a REST API over `PostgreSQL`, with Redis-backed request rate limiting.
//!
//! ## Authentication (tokens)
//!
//! Authentication is password-based (argon2id digests; plaintext never stored)
//! and issues two stateless, signed bearer tokens per login:
//!
//! - **access** tokens, short-lived (minutes), accepted by API endpoints;
//! - **refresh** tokens, long-lived (days), accepted only by the refresh
//!   endpoint.
//!
//! The token type is embedded in the signed claims, so a refresh token can
//! never be replayed as an access token even by misbehaving client code.
//! There is no server-side token storage or revocation list; lifecycle is
//! entirely the embedded expiry.
//!
//! ## Authorization & Roles
//!
//! Access is controlled by a hierarchical role on each user
//! (`customer` < `venue_staff` < `venue_admin` < `super_admin`). A higher
//! role satisfies any requirement expressed at a lower one; unknown role
//! strings are treated as the lowest rank. Authentication failures return a
//! uniform `401` body to prevent account and token-state enumeration.
//!
//! ## Rate Limiting
//!
//! Requests are throttled per client address with a per-minute counter in
//! Redis. The limiter fails open: a cache outage never blocks traffic.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
