use secrecy::SecretString;

/// Runtime configuration shared across the server, resolved once at startup.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub token_secret: SecretString,
    pub token_algorithm: String,
    pub redis_url: Option<String>,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
    pub rate_limit_per_minute: u64,
    pub rate_limit_burst: u64,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(token_secret: SecretString) -> Self {
        Self {
            token_secret,
            token_algorithm: "HS256".to_string(),
            redis_url: None,
            access_ttl_minutes: 30,
            refresh_ttl_days: 7,
            rate_limit_per_minute: 60,
            rate_limit_burst: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_global_args() {
        let args = GlobalArgs::new(SecretString::from("signing-secret".to_string()));
        assert_eq!(args.token_secret.expose_secret(), "signing-secret");
        assert_eq!(args.token_algorithm, "HS256");
        assert_eq!(args.redis_url, None);
        assert_eq!(args.access_ttl_minutes, 30);
        assert_eq!(args.refresh_ttl_days, 7);
        assert_eq!(args.rate_limit_per_minute, 60);
        assert_eq!(args.rate_limit_burst, 0);
    }
}
