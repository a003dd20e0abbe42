use crate::domain::{extract_consultant_id, ScanRecord};
use crate::errors::ServerError;
use crate::responses::xlsx_response;
use crate::responses::ResultResp;
use rust_xlsxwriter::{Workbook, XlsxError};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

const HEADERS: [&str; 9] = [
    "Scanned At (UTC)",
    "Customer",
    "Phone",
    "Email",
    "Consultant",
    "Interest Status",
    "Interested In",
    "Follow Up (UTC)",
    "Total Scans",
];

fn xlsx_err(what: &'static str) -> impl Fn(XlsxError) -> ServerError {
    move |e| ServerError::XlsxError(format!("Failed to write {what}: {e}"))
}

/// Builds the activity sheet in memory, one row per scan in the given order.
pub fn activity_workbook(records: &[ScanRecord]) -> Result<Vec<u8>, ServerError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, header) in HEADERS.iter().enumerate() {
        worksheet
            .write_string(0, col as u16, *header)
            .map_err(xlsx_err("header"))?;
    }

    for (i, record) in records.iter().enumerate() {
        let r = (i + 1) as u32;

        worksheet
            .write_string(r, 0, record.created_at.format(DATE_FORMAT).to_string())
            .map_err(xlsx_err("scan date"))?;

        let customer = &record.customer;
        worksheet
            .write_string(r, 1, customer.name().unwrap_or(customer.id()))
            .map_err(xlsx_err("customer"))?;
        worksheet
            .write_string(r, 2, customer.phone().unwrap_or(""))
            .map_err(xlsx_err("phone"))?;
        worksheet
            .write_string(r, 3, customer.email().unwrap_or(""))
            .map_err(xlsx_err("email"))?;

        let consultant = record
            .assigned_consultant
            .as_ref()
            .and_then(|c| c.name())
            .or_else(|| extract_consultant_id(record))
            .unwrap_or("");
        worksheet
            .write_string(r, 4, consultant)
            .map_err(xlsx_err("consultant"))?;

        worksheet
            .write_string(r, 5, record.interest_status.map_or("", |s| s.label()))
            .map_err(xlsx_err("interest status"))?;
        worksheet
            .write_string(r, 6, record.interested_in.map_or("", |i| i.label()))
            .map_err(xlsx_err("interested in"))?;

        let follow_up = record
            .follow_up_date
            .map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_default();
        worksheet
            .write_string(r, 7, follow_up)
            .map_err(xlsx_err("follow up"))?;

        if let Some(count) = customer.scan_count() {
            worksheet
                .write_number(r, 8, count as f64)
                .map_err(xlsx_err("scan count"))?;
        }
    }

    workbook
        .save_to_buffer()
        .map_err(|e| ServerError::XlsxError(format!("Failed to save workbook: {e}")))
}

pub fn export_activity_xlsx(records: &[ScanRecord], filename: &str) -> ResultResp {
    let buffer = activity_workbook(records)?;
    xlsx_response(buffer, filename)
}
