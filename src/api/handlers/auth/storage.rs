//! Database helpers for user records.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::utils::is_unique_violation;

/// Outcome when attempting to create a new user.
#[derive(Debug)]
pub(crate) enum SignupOutcome {
    Created(Uuid),
    Conflict,
}

/// Full user row as stored; only the auth handlers see `password_hash`.
pub(crate) struct UserRecord {
    pub(crate) id: Uuid,
    pub(crate) email: String,
    pub(crate) phone: Option<String>,
    pub(crate) password_hash: String,
    pub(crate) role: String,
    pub(crate) full_name: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) email_verified: bool,
    pub(crate) phone_verified: bool,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) last_login_at: Option<DateTime<Utc>>,
}

const USER_COLUMNS: &str = "id, email, phone, password_hash, role, full_name, \
     is_active, email_verified, phone_verified, created_at, last_login_at";

fn user_from_row(row: &sqlx::postgres::PgRow) -> UserRecord {
    UserRecord {
        id: row.get("id"),
        email: row.get("email"),
        phone: row.get("phone"),
        password_hash: row.get("password_hash"),
        role: row.get("role"),
        full_name: row.get("full_name"),
        is_active: row.get("is_active"),
        email_verified: row.get("email_verified"),
        phone_verified: row.get("phone_verified"),
        created_at: row.get("created_at"),
        last_login_at: row.get("last_login_at"),
    }
}

pub(crate) async fn find_user_by_id(pool: &PgPool, id: Uuid) -> Result<Option<UserRecord>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by id")?;

    Ok(row.map(|row| user_from_row(&row)))
}

pub(crate) async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRecord>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by email")?;

    Ok(row.map(|row| user_from_row(&row)))
}

/// Insert a new customer; duplicate email or phone reports a conflict
/// instead of an error.
pub(crate) async fn insert_user(
    pool: &PgPool,
    email: &str,
    password_hash: &str,
    full_name: Option<&str>,
    phone: Option<&str>,
) -> Result<SignupOutcome> {
    let query = r"
        INSERT INTO users
            (email, password_hash, full_name, phone)
        VALUES ($1, $2, $3, $4)
        RETURNING id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .bind(password_hash)
        .bind(full_name)
        .bind(phone)
        .fetch_one(pool)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(SignupOutcome::Created(row.get("id"))),
        Err(err) => {
            if is_unique_violation(&err) {
                return Ok(SignupOutcome::Conflict);
            }
            Err(err).context("failed to insert user")
        }
    }
}

/// Stamp a successful login.
pub(crate) async fn touch_last_login(pool: &PgPool, id: Uuid) -> Result<()> {
    let query = "UPDATE users SET last_login_at = NOW() WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update last login timestamp")?;
    Ok(())
}

/// Apply allow-listed profile updates and return the fresh row.
pub(crate) async fn update_profile(
    pool: &PgPool,
    id: Uuid,
    full_name: Option<&str>,
    phone: Option<&str>,
) -> Result<Option<UserRecord>> {
    let query = format!(
        r"
        UPDATE users SET
            full_name = COALESCE($2, full_name),
            phone = COALESCE($3, phone),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {USER_COLUMNS}
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(id)
        .bind(full_name)
        .bind(phone)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to update profile")?;

    Ok(row.map(|row| user_from_row(&row)))
}
