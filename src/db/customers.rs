// src/db/customers.rs
use rusqlite::{params, Connection, OptionalExtension};
use serde::Deserialize;

use crate::db::new_id;
use crate::domain::CustomerSummary;
use crate::errors::ServerError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewCustomer {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

fn clean(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

pub fn create_customer(
    conn: &Connection,
    customer: &NewCustomer,
    now: i64,
) -> Result<String, ServerError> {
    let id = new_id();
    conn.execute(
        "insert into customers (id, name, phone, email, created_at) values (?, ?, ?, ?, ?)",
        params![
            id,
            clean(&customer.name),
            clean(&customer.phone),
            clean(&customer.email).map(str::to_lowercase),
            now
        ],
    )
    .map_err(|e| ServerError::DbError(format!("insert customer failed: {e}")))?;

    Ok(id)
}

/// Customer with its total scan count.
pub fn get_customer(conn: &Connection, id: &str) -> Result<Option<CustomerSummary>, ServerError> {
    conn.query_row(
        r#"
        select c.id, c.name, c.phone, c.email,
               (select count(*) from scans s where s.customer_id = c.id)
        from customers c
        where c.id = ?
        "#,
        params![id],
        |row| {
            Ok(CustomerSummary {
                id: row.get(0)?,
                name: row.get(1)?,
                phone: row.get(2)?,
                email: row.get(3)?,
                scan_count: row.get(4)?,
            })
        },
    )
    .optional()
    .map_err(|e| ServerError::DbError(format!("customer lookup failed: {e}")))
}
