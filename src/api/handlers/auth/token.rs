//! Signed bearer token issuance and verification.
//!
//! Tokens are stateless HS256 JWTs carrying `{sub, typ, iat, exp}`. The type
//! tag (`access` or `refresh`) is part of the signed claims and checked inside
//! [`TokenCodec::verify`], so the two kinds are never interchangeable no
//! matter what the caller does. The signing secret is injected at
//! construction and immutable afterwards.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

/// Claims embedded in every token the service issues.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id the token was issued for.
    pub sub: Uuid,
    /// Token type tag; verified against the caller's expectation.
    pub typ: TokenKind,
    /// Issued-at (Unix timestamp, seconds).
    pub iat: i64,
    /// Expiry (Unix timestamp, seconds). The boundary is exclusive: a token
    /// checked at exactly `exp` is already expired.
    pub exp: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("unexpected token type")]
    TypeMismatch,
    #[error("failed to sign token")]
    Signing,
}

/// Issues and verifies access/refresh tokens with a process-wide secret.
///
/// Only the HMAC family makes sense here (one shared secret for both
/// directions); the CLI restricts the configured algorithm accordingly.
pub struct TokenCodec {
    header: Header,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenCodec {
    #[must_use]
    pub fn new(
        secret: &SecretString,
        algorithm: Algorithm,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        let mut validation = Validation::new(algorithm);
        // Expiry is checked by `verify` against a single clock read, with an
        // exclusive boundary and no leeway; the built-in check has both.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            header: Header::new(algorithm),
            encoding: EncodingKey::from_secret(secret.expose_secret().as_bytes()),
            decoding: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            validation,
            access_ttl,
            refresh_ttl,
        }
    }

    #[must_use]
    pub const fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    #[must_use]
    pub const fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Issue a token of the given kind with its configured lifetime.
    ///
    /// # Errors
    /// Returns `TokenError::Signing` if encoding fails.
    pub fn issue(&self, subject: Uuid, kind: TokenKind) -> Result<String, TokenError> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        self.issue_with_ttl(subject, kind, ttl)
    }

    /// Issue a token with an explicit lifetime; negative lifetimes produce
    /// already-expired tokens.
    ///
    /// # Errors
    /// Returns `TokenError::Signing` if encoding fails.
    pub fn issue_with_ttl(
        &self,
        subject: Uuid,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let iat = Utc::now().timestamp();
        let claims = Claims {
            sub: subject,
            typ: kind,
            iat,
            exp: iat + ttl.num_seconds(),
        };
        encode(&self.header, &claims, &self.encoding).map_err(|_| TokenError::Signing)
    }

    /// Verify signature, expiry, and type tag, in that order.
    ///
    /// # Errors
    /// `InvalidSignature` for tampered tokens or a different secret,
    /// `Malformed` for anything that does not parse as a token,
    /// `Expired` once the current time reaches `exp`,
    /// `TypeMismatch` when the embedded type differs from `expected`.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|err| {
            match err.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            }
        })?;

        let claims = data.claims;
        if Utc::now().timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }
        if claims.typ != expected {
            return Err(TokenError::TypeMismatch);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> TokenCodec {
        TokenCodec::new(
            &SecretString::from("test-signing-secret".to_string()),
            Algorithm::HS256,
            Duration::minutes(30),
            Duration::days(7),
        )
    }

    #[test]
    fn issue_and_verify_round_trips_subject() -> Result<(), TokenError> {
        let codec = codec();
        let subject = Uuid::new_v4();
        let token = codec.issue(subject, TokenKind::Access)?;
        let claims = codec.verify(&token, TokenKind::Access)?;
        assert_eq!(claims.sub, subject);
        assert_eq!(claims.typ, TokenKind::Access);
        assert!(claims.exp > claims.iat);
        Ok(())
    }

    #[test]
    fn refresh_token_is_not_an_access_token() -> Result<(), TokenError> {
        let codec = codec();
        let subject = Uuid::new_v4();
        let refresh = codec.issue(subject, TokenKind::Refresh)?;
        assert_eq!(
            codec.verify(&refresh, TokenKind::Access),
            Err(TokenError::TypeMismatch)
        );
        let access = codec.issue(subject, TokenKind::Access)?;
        assert_eq!(
            codec.verify(&access, TokenKind::Refresh),
            Err(TokenError::TypeMismatch)
        );
        Ok(())
    }

    #[test]
    fn expired_token_is_rejected() -> Result<(), TokenError> {
        let codec = codec();
        let token = codec.issue_with_ttl(Uuid::new_v4(), TokenKind::Access, Duration::seconds(-1))?;
        assert_eq!(
            codec.verify(&token, TokenKind::Access),
            Err(TokenError::Expired)
        );
        Ok(())
    }

    #[test]
    fn expiry_boundary_is_exclusive() -> Result<(), TokenError> {
        let codec = codec();
        // exp == now: `now >= exp` means expired, no off-by-one accept window.
        let token = codec.issue_with_ttl(Uuid::new_v4(), TokenKind::Access, Duration::zero())?;
        assert_eq!(
            codec.verify(&token, TokenKind::Access),
            Err(TokenError::Expired)
        );
        Ok(())
    }

    #[test]
    fn garbage_tokens_never_panic() {
        let codec = codec();
        for garbage in ["", "not-a-real-token", "a.b", "a.b.c", "....."] {
            let err = codec.verify(garbage, TokenKind::Access).unwrap_err();
            assert!(
                matches!(err, TokenError::Malformed | TokenError::InvalidSignature),
                "unexpected error for {garbage:?}: {err:?}"
            );
        }
    }

    #[test]
    fn wrong_secret_fails_signature_check() -> Result<(), TokenError> {
        let codec = codec();
        let other = TokenCodec::new(
            &SecretString::from("another-secret".to_string()),
            Algorithm::HS256,
            Duration::minutes(30),
            Duration::days(7),
        );
        let token = codec.issue(Uuid::new_v4(), TokenKind::Access)?;
        assert_eq!(
            other.verify(&token, TokenKind::Access),
            Err(TokenError::InvalidSignature)
        );
        Ok(())
    }

    #[test]
    fn token_kind_serializes_lowercase() {
        assert_eq!(TokenKind::Access.as_str(), "access");
        assert_eq!(TokenKind::Refresh.as_str(), "refresh");
        let json = serde_json::to_string(&TokenKind::Refresh).expect("serialize");
        assert_eq!(json, "\"refresh\"");
    }
}
