pub mod comments;
pub mod connection;
pub mod consultants;
pub mod customers;
pub mod scans;
pub mod store;

pub use connection::{init_db, Database};
pub use store::{ListFilter, ScanOrder, ScanStore};

use crate::auth::token::generate_token;
use chrono::{DateTime, Utc};

/// Opaque, URL-safe record id.
pub fn new_id() -> String {
    generate_token(&mut rand::rngs::OsRng, 12)
}

/// Read a unix-millis column as a UTC timestamp.
pub(crate) fn millis_to_utc(idx: usize, ms: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, ms))
}
