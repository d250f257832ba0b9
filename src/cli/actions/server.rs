use crate::api;
use crate::cli::{actions::Action, globals::GlobalArgs};
use anyhow::{anyhow, Result};
use url::Url;

/// Handle the server action
pub async fn handle(action: Action, globals: &GlobalArgs) -> Result<()> {
    match action {
        Action::Server { port, dsn } => {
            // Fail fast on a malformed DSN instead of at first pool acquire.
            let parsed = Url::parse(&dsn)?;
            if parsed.scheme() != "postgres" && parsed.scheme() != "postgresql" {
                return Err(anyhow!("DSN must be a postgres:// URL"));
            }

            api::new(port, dsn, globals).await?;
        }
    }

    Ok(())
}
