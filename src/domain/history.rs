// src/domain/history.rs

use crate::domain::scan::{extract_consultant_id, ScanRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A contiguous period during which one consultant held a customer.
/// Derived from scans, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentEvent {
    /// `created_at` of the earliest scan in the run.
    pub date: DateTime<Utc>,
    pub consultant_id: String,
    pub consultant_name: Option<String>,
    pub consultant_avatar: Option<String>,
}

/// Rebuilds the assignment timeline for one customer, newest first.
///
/// Scans are walked oldest first (stable, so equal timestamps keep their
/// input order). Consecutive scans for the same consultant collapse into a
/// single event anchored at the first scan of the run. Scans without a
/// consultant are ignored entirely: they neither end nor extend a run.
pub fn assignment_history(scans: &[ScanRecord]) -> Vec<AssignmentEvent> {
    let mut ordered: Vec<&ScanRecord> = scans.iter().collect();
    ordered.sort_by_key(|s| s.created_at);

    let mut events: Vec<AssignmentEvent> = Vec::new();
    let mut last_consultant: Option<&str> = None;

    for scan in ordered {
        let Some(consultant_id) = extract_consultant_id(scan) else {
            continue;
        };

        if last_consultant == Some(consultant_id) {
            continue;
        }

        let consultant = scan.assigned_consultant.as_ref();
        events.push(AssignmentEvent {
            date: scan.created_at,
            consultant_id: consultant_id.to_string(),
            consultant_name: consultant.and_then(|c| c.name()).map(str::to_string),
            consultant_avatar: consultant.and_then(|c| c.avatar()).map(str::to_string),
        });
        last_consultant = Some(consultant_id);
    }

    events.reverse();
    events
}
