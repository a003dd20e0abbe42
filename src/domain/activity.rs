// src/domain/activity.rs

use crate::domain::scan::{InterestStatus, InterestedIn, ScanRecord};
use chrono::{DateTime, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

/// Ordering applied after filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortBy {
    AlphaAsc,
    AlphaDesc,
    ScansAsc,
    ScansDesc,
    #[default]
    DateDesc,
    DateAsc,
}

impl FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "alpha-asc" | "a-z" => Ok(SortBy::AlphaAsc),
            "alpha-desc" | "z-a" => Ok(SortBy::AlphaDesc),
            "scans-asc" => Ok(SortBy::ScansAsc),
            "scans-desc" => Ok(SortBy::ScansDesc),
            "date-desc" | "newest" => Ok(SortBy::DateDesc),
            "date-asc" | "oldest" => Ok(SortBy::DateAsc),
            other => Err(format!("unknown sort '{other}'")),
        }
    }
}

/// Filter and sort settings for the activity list.
///
/// Every field is optional. Leaving both date bounds unset does *not* mean
/// "all dates": the list then only shows scans created today.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityQuery {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub search_text: Option<String>,
    pub interested_in: Vec<InterestedIn>,
    pub interest_status: Vec<InterestStatus>,
    pub sort_by: Option<SortBy>,
}

impl ActivityQuery {
    fn matches_dates(&self, day: NaiveDate, today: NaiveDate) -> bool {
        match (self.date_from, self.date_to) {
            (None, None) => day == today,
            (from, to) => from.map_or(true, |f| day >= f) && to.map_or(true, |t| day <= t),
        }
    }

    fn matches_search(&self, record: &ScanRecord) -> bool {
        let Some(needle) = self
            .search_text
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        else {
            return true;
        };
        let needle = needle.to_lowercase();

        let status = record.interest_status.map(|s| s.label());
        let interested = record.interested_in.map(|i| i.label());

        [
            record.customer.name(),
            record.customer.phone(),
            record.customer.email(),
            status,
            interested,
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
    }

    fn matches_interested_in(&self, record: &ScanRecord) -> bool {
        self.interested_in.is_empty()
            || record
                .interested_in
                .is_some_and(|v| self.interested_in.contains(&v))
    }

    fn matches_status(&self, record: &ScanRecord) -> bool {
        self.interest_status.is_empty()
            || record
                .interest_status
                .is_some_and(|v| self.interest_status.contains(&v))
    }
}

fn name_key(record: &ScanRecord) -> Option<String> {
    record.customer.name().map(str::to_lowercase)
}

/// Ascending comparator for the chosen sort. `None` keys order first, so
/// reversing puts them last.
fn compare(sort: SortBy, a: &ScanRecord, b: &ScanRecord) -> Ordering {
    match sort {
        SortBy::AlphaAsc => name_key(a).cmp(&name_key(b)),
        SortBy::AlphaDesc => name_key(b).cmp(&name_key(a)),
        SortBy::ScansAsc => a.customer.scan_count().cmp(&b.customer.scan_count()),
        SortBy::ScansDesc => b.customer.scan_count().cmp(&a.customer.scan_count()),
        SortBy::DateAsc => a.created_at.cmp(&b.created_at),
        SortBy::DateDesc => b.created_at.cmp(&a.created_at),
    }
}

/// Applies the date window (or today), search text, interested-in set and
/// status set, in that order, then a single stable sort.
///
/// `now` fixes both "today" and the time zone in which day boundaries are
/// evaluated.
pub fn filter_and_sort<Tz: TimeZone>(
    records: &[ScanRecord],
    query: &ActivityQuery,
    now: &DateTime<Tz>,
) -> Vec<ScanRecord> {
    let tz = now.timezone();
    let today = now.date_naive();

    let mut out: Vec<ScanRecord> = records
        .iter()
        .filter(|r| query.matches_dates(r.created_at.with_timezone(&tz).date_naive(), today))
        .filter(|r| query.matches_search(r))
        .filter(|r| query.matches_interested_in(r))
        .filter(|r| query.matches_status(r))
        .cloned()
        .collect();

    let sort = query.sort_by.unwrap_or_default();
    out.sort_by(|a, b| compare(sort, a, b));
    out
}
