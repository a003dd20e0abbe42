// src/db/scans.rs
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Deserialize;

use crate::db::new_id;
use crate::domain::{InterestStatus, InterestedIn};
use crate::errors::ServerError;

/// A scan about to be written. Created on QR capture and on manual
/// assignment.
#[derive(Debug, Clone, Deserialize)]
pub struct NewScan {
    pub customer_id: String,
    #[serde(default)]
    pub consultant_id: Option<String>,
    #[serde(default)]
    pub interest_status: Option<InterestStatus>,
    #[serde(default)]
    pub interested_in: Option<InterestedIn>,
    #[serde(default)]
    pub follow_up_date: Option<DateTime<Utc>>,
}

/// Partial edit of a scan's interest metadata. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusUpdate {
    #[serde(default)]
    pub interest_status: Option<InterestStatus>,
    #[serde(default)]
    pub interested_in: Option<InterestedIn>,
    #[serde(default)]
    pub follow_up_date: Option<DateTime<Utc>>,
}

impl StatusUpdate {
    pub fn is_empty(&self) -> bool {
        self.interest_status.is_none()
            && self.interested_in.is_none()
            && self.follow_up_date.is_none()
    }
}

/// Minimal projection used when carrying state between scans.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanState {
    pub id: String,
    pub customer_id: String,
    pub consultant_id: Option<String>,
    pub interest_status: Option<InterestStatus>,
    pub interested_in: Option<InterestedIn>,
}

pub fn insert_scan(conn: &Connection, scan: &NewScan, now: i64) -> Result<String, ServerError> {
    let id = new_id();
    conn.execute(
        r#"
        insert into scans (
            id, customer_id, consultant_id,
            interest_status, interested_in, follow_up_date, created_at
        ) values (?, ?, ?, ?, ?, ?, ?)
        "#,
        params![
            id,
            scan.customer_id,
            scan.consultant_id,
            scan.interest_status.map(|s| s.label()),
            scan.interested_in.map(|i| i.label()),
            scan.follow_up_date.map(|d| d.timestamp_millis()),
            now
        ],
    )
    .map_err(|e| ServerError::DbError(format!("insert scan failed: {e}")))?;

    Ok(id)
}

fn state_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ScanState> {
    Ok(ScanState {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        consultant_id: row.get(2)?,
        interest_status: row
            .get::<_, Option<String>>(3)?
            .and_then(|s| s.parse().ok()),
        interested_in: row
            .get::<_, Option<String>>(4)?
            .and_then(|s| s.parse().ok()),
    })
}

pub fn get_scan(conn: &Connection, id: &str) -> Result<Option<ScanState>, ServerError> {
    conn.query_row(
        "select id, customer_id, consultant_id, interest_status, interested_in from scans where id = ?",
        params![id],
        state_from_row,
    )
    .optional()
    .map_err(|e| ServerError::DbError(format!("scan lookup failed: {e}")))
}

/// Most recent scan for a customer (ingestion order breaks timestamp ties).
pub fn latest_scan_for_customer(
    conn: &Connection,
    customer_id: &str,
) -> Result<Option<ScanState>, ServerError> {
    conn.query_row(
        r#"
        select id, customer_id, consultant_id, interest_status, interested_in
        from scans
        where customer_id = ?
        order by created_at desc, rowid desc
        limit 1
        "#,
        params![customer_id],
        state_from_row,
    )
    .optional()
    .map_err(|e| ServerError::DbError(format!("latest scan lookup failed: {e}")))
}

/// Applies a status edit. Returns `false` when no scan has that id.
pub fn update_scan_status(
    conn: &Connection,
    id: &str,
    update: &StatusUpdate,
) -> Result<bool, ServerError> {
    let changed = conn
        .execute(
            r#"
            update scans set
                interest_status = coalesce(?2, interest_status),
                interested_in   = coalesce(?3, interested_in),
                follow_up_date  = coalesce(?4, follow_up_date)
            where id = ?1
            "#,
            params![
                id,
                update.interest_status.map(|s| s.label()),
                update.interested_in.map(|i| i.label()),
                update.follow_up_date.map(|d| d.timestamp_millis()),
            ],
        )
        .map_err(|e| ServerError::DbError(format!("update scan failed: {e}")))?;

    Ok(changed > 0)
}
