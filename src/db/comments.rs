// src/db/comments.rs
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;

use crate::db::{millis_to_utc, new_id};
use crate::errors::ServerError;

pub const MAX_COMMENT_CHARS: usize = 2000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub id: String,
    pub customer_id: String,
    pub consultant_id: String,
    pub consultant_name: Option<String>,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

pub fn add_comment(
    conn: &Connection,
    customer_id: &str,
    consultant_id: &str,
    body: &str,
    now: i64,
) -> Result<String, ServerError> {
    let body = body.trim();
    if body.is_empty() {
        return Err(ServerError::BadRequest("comment body is empty".into()));
    }
    if body.chars().count() > MAX_COMMENT_CHARS {
        return Err(ServerError::BadRequest(format!(
            "comment is longer than {MAX_COMMENT_CHARS} characters"
        )));
    }

    let id = new_id();
    conn.execute(
        "insert into comments (id, customer_id, consultant_id, body, created_at) values (?, ?, ?, ?, ?)",
        params![id, customer_id, consultant_id, body, now],
    )
    .map_err(|e| ServerError::DbError(format!("insert comment failed: {e}")))?;

    Ok(id)
}

/// Comments on a customer, newest first.
pub fn list_comments(conn: &Connection, customer_id: &str) -> Result<Vec<Comment>, ServerError> {
    let mut stmt = conn
        .prepare(
            r#"
            select m.id, m.customer_id, m.consultant_id, k.name, m.body, m.created_at
            from comments m
            left join consultants k on k.id = m.consultant_id
            where m.customer_id = ?
            order by m.created_at desc, m.rowid desc
            "#,
        )
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let rows = stmt
        .query_map(params![customer_id], |row| {
            Ok(Comment {
                id: row.get(0)?,
                customer_id: row.get(1)?,
                consultant_id: row.get(2)?,
                consultant_name: row.get(3)?,
                body: row.get(4)?,
                created_at: millis_to_utc(5, row.get(5)?)?,
            })
        })
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r.map_err(|e| ServerError::DbError(e.to_string()))?);
    }
    Ok(out)
}
