// src/auth/sessions.rs
use crate::auth::token::{generate_session_token, hash_token};
use crate::errors::ServerError;
use chrono::Duration;
use rusqlite::{params, Connection, OptionalExtension};

/// The authenticated consultant behind a request.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub consultant_id: String,
    pub consultant_name: String,
    pub expires_at: i64,
}

/// Issue a session for a consultant. Returns the raw token; only its hash is
/// stored.
pub fn create_session(
    conn: &Connection,
    consultant_id: &str,
    now: i64,
    ttl: Duration,
) -> Result<String, ServerError> {
    let raw_token = generate_session_token();
    let hash = hash_token(&raw_token);
    let expires_at = now + ttl.num_milliseconds();

    conn.execute(
        r#"
        insert into sessions (consultant_id, token_hash, created_at, expires_at)
        values (?, ?, ?, ?)
        "#,
        params![consultant_id, hash.as_slice(), now, expires_at],
    )
    .map_err(|e| ServerError::DbError(format!("create session failed: {e}")))?;

    tracing::info!(consultant_id, "session issued");
    Ok(raw_token)
}

/// Resolve a raw token to its live session. Unknown, expired and revoked
/// tokens are all `Unauthenticated`.
pub fn get_current_session(
    conn: &Connection,
    raw_token: &str,
    now: i64,
) -> Result<Session, ServerError> {
    let hash = hash_token(raw_token);

    conn.query_row(
        r#"
        select k.id, k.name, s.expires_at
        from sessions s
        join consultants k on k.id = s.consultant_id
        where s.token_hash = ?
          and s.expires_at > ?
          and s.revoked_at is null
        "#,
        params![hash.as_slice(), now],
        |row| {
            Ok(Session {
                consultant_id: row.get(0)?,
                consultant_name: row.get(1)?,
                expires_at: row.get(2)?,
            })
        },
    )
    .optional()
    .map_err(|e| ServerError::DbError(format!("session lookup failed: {e}")))?
    .ok_or(ServerError::Unauthenticated)
}

pub fn revoke_session(conn: &Connection, raw_token: &str, now: i64) -> Result<(), ServerError> {
    let hash = hash_token(raw_token);
    conn.execute(
        "update sessions set revoked_at = ? where token_hash = ? and revoked_at is null",
        params![now, hash.as_slice()],
    )
    .map_err(|e| ServerError::DbError(format!("revoke session failed: {e}")))?;
    Ok(())
}
