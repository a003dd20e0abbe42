// src/db/store.rs
use rusqlite::{params, Row};

use crate::db::connection::Database;
use crate::db::millis_to_utc;
use crate::domain::{
    ConsultantRef, ConsultantSummary, CustomerRef, CustomerSummary, ScanRecord,
};
use crate::errors::ServerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanOrder {
    /// Oldest first.
    #[default]
    CreatedAsc,
    CreatedDesc,
}

/// Server-side narrowing for [`ScanStore::list_records`].
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub customer_id: Option<String>,
    pub consultant_id: Option<String>,
    pub order: ScanOrder,
    /// Embed customer/consultant summaries instead of bare ids.
    pub expand: bool,
}

impl ListFilter {
    pub fn for_customer(customer_id: impl Into<String>) -> Self {
        Self {
            customer_id: Some(customer_id.into()),
            ..Default::default()
        }
    }

    pub fn expanded(mut self) -> Self {
        self.expand = true;
        self
    }
}

/// Read access to scan documents. Callers get fully materialized records;
/// the pure reducers in `domain` never talk to a store themselves.
pub trait ScanStore {
    fn list_records(&self, filter: &ListFilter) -> Result<Vec<ScanRecord>, ServerError>;
}

const SQL_LIST_SCANS: &str = r#"
    select
        s.id,                 -- 0
        s.created_at,         -- 1
        s.customer_id,        -- 2
        c.name,               -- 3
        c.phone,              -- 4
        c.email,              -- 5
        (select count(*) from scans s2 where s2.customer_id = s.customer_id), -- 6
        s.consultant_id,      -- 7
        k.name,               -- 8
        k.avatar_url,         -- 9
        s.interest_status,    -- 10
        s.interested_in,      -- 11
        s.follow_up_date      -- 12
    from scans s
    left join customers c on c.id = s.customer_id
    left join consultants k on k.id = s.consultant_id
    where (?1 is null or s.customer_id = ?1)
      and (?2 is null or s.consultant_id = ?2)
"#;

fn scan_from_row(row: &Row<'_>, expand: bool) -> rusqlite::Result<ScanRecord> {
    let customer_id: String = row.get(2)?;
    let customer = if expand {
        CustomerRef::Expanded(CustomerSummary {
            id: customer_id,
            name: row.get(3)?,
            phone: row.get(4)?,
            email: row.get(5)?,
            scan_count: row.get(6)?,
        })
    } else {
        CustomerRef::Id(customer_id)
    };

    let consultant_id: Option<String> = row.get(7)?;
    let consultant_name: Option<String> = row.get(8)?;
    let assigned_consultant = match (consultant_id, consultant_name) {
        (Some(id), Some(name)) if expand => Some(ConsultantRef::Expanded(ConsultantSummary {
            id,
            name,
            avatar: row.get(9)?,
        })),
        // Dangling consultant ids fall back to the bare shape.
        (Some(id), _) => Some(ConsultantRef::Id(id)),
        (None, _) => None,
    };

    let follow_up_date = match row.get::<_, Option<i64>>(12)? {
        Some(ms) => Some(millis_to_utc(12, ms)?),
        None => None,
    };

    Ok(ScanRecord {
        id: row.get(0)?,
        created_at: millis_to_utc(1, row.get(1)?)?,
        customer,
        assigned_consultant,
        interest_status: row
            .get::<_, Option<String>>(10)?
            .and_then(|s| s.parse().ok()),
        interested_in: row
            .get::<_, Option<String>>(11)?
            .and_then(|s| s.parse().ok()),
        follow_up_date,
    })
}

impl ScanStore for Database {
    fn list_records(&self, filter: &ListFilter) -> Result<Vec<ScanRecord>, ServerError> {
        // rowid keeps ingestion order among equal timestamps in both directions.
        let order = match filter.order {
            ScanOrder::CreatedAsc => "order by s.created_at asc, s.rowid asc",
            ScanOrder::CreatedDesc => "order by s.created_at desc, s.rowid asc",
        };
        let sql = format!("{SQL_LIST_SCANS} {order}");

        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| ServerError::DbError(e.to_string()))?;

            let rows = stmt
                .query_map(
                    params![filter.customer_id, filter.consultant_id],
                    |row| scan_from_row(row, filter.expand),
                )
                .map_err(|e| ServerError::DbError(e.to_string()))?;

            let mut out = Vec::new();
            for r in rows {
                out.push(r.map_err(|e| ServerError::DbError(e.to_string()))?);
            }
            Ok(out)
        })
    }
}
