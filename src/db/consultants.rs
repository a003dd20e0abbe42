// src/db/consultants.rs
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::new_id;
use crate::domain::ConsultantSummary;
use crate::errors::ServerError;

/// Insert a consultant and return its new id.
pub fn create_consultant(
    conn: &Connection,
    name: &str,
    avatar_url: Option<&str>,
    now: i64,
) -> Result<String, ServerError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServerError::BadRequest("consultant name is required".into()));
    }

    let id = new_id();
    conn.execute(
        "insert into consultants (id, name, avatar_url, created_at) values (?, ?, ?, ?)",
        params![id, name, avatar_url, now],
    )
    .map_err(|e| ServerError::DbError(format!("insert consultant failed: {e}")))?;

    Ok(id)
}

pub fn get_consultant(
    conn: &Connection,
    id: &str,
) -> Result<Option<ConsultantSummary>, ServerError> {
    conn.query_row(
        "select id, name, avatar_url from consultants where id = ?",
        params![id],
        |row| {
            Ok(ConsultantSummary {
                id: row.get(0)?,
                name: row.get(1)?,
                avatar: row.get(2)?,
            })
        },
    )
    .optional()
    .map_err(|e| ServerError::DbError(format!("consultant lookup failed: {e}")))
}
