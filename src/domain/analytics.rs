// src/domain/analytics.rs

use crate::domain::scan::{extract_consultant_id, ScanRecord};
use chrono::{DateTime, TimeZone};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

pub const UNSPECIFIED: &str = "Unspecified";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsultantActivity {
    pub consultant_id: String,
    pub consultant_name: Option<String>,
    pub scans: usize,
}

/// Headline numbers for a set of scans (usually the output of
/// [`crate::domain::activity::filter_and_sort`]).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivitySummary {
    pub total_scans: usize,
    pub unique_customers: usize,
    pub by_interest_status: BTreeMap<String, usize>,
    pub by_interested_in: BTreeMap<String, usize>,
    /// Busiest consultant first; ties by id.
    pub by_consultant: Vec<ConsultantActivity>,
    /// Scans whose follow-up date falls on or before today.
    pub follow_ups_due: usize,
}

pub fn summarize<Tz: TimeZone>(records: &[ScanRecord], now: &DateTime<Tz>) -> ActivitySummary {
    let tz = now.timezone();
    let today = now.date_naive();

    let mut customers = HashSet::new();
    let mut by_interest_status = BTreeMap::new();
    let mut by_interested_in = BTreeMap::new();
    let mut consultants: HashMap<&str, ConsultantActivity> = HashMap::new();
    let mut follow_ups_due = 0;

    for record in records {
        customers.insert(record.customer.id());

        let status = record.interest_status.map_or(UNSPECIFIED, |s| s.label());
        *by_interest_status.entry(status.to_string()).or_insert(0) += 1;

        let interested = record.interested_in.map_or(UNSPECIFIED, |i| i.label());
        *by_interested_in.entry(interested.to_string()).or_insert(0) += 1;

        if let Some(id) = extract_consultant_id(record) {
            let entry = consultants.entry(id).or_insert_with(|| ConsultantActivity {
                consultant_id: id.to_string(),
                consultant_name: None,
                scans: 0,
            });
            entry.scans += 1;
            if entry.consultant_name.is_none() {
                entry.consultant_name = record
                    .assigned_consultant
                    .as_ref()
                    .and_then(|c| c.name())
                    .map(str::to_string);
            }
        }

        let due = record
            .follow_up_date
            .is_some_and(|d| d.with_timezone(&tz).date_naive() <= today);
        if due {
            follow_ups_due += 1;
        }
    }

    let mut by_consultant: Vec<ConsultantActivity> = consultants.into_values().collect();
    by_consultant.sort_by(|a, b| {
        b.scans
            .cmp(&a.scans)
            .then_with(|| a.consultant_id.cmp(&b.consultant_id))
    });

    ActivitySummary {
        total_scans: records.len(),
        unique_customers: customers.len(),
        by_interest_status,
        by_interested_in,
        by_consultant,
        follow_ups_due,
    }
}
