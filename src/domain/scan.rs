// src/domain/scan.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sales-funnel stage of a customer at the time of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum InterestStatus {
    Hot,
    Warm,
    Cold,
    #[serde(rename = "Not Interested")]
    NotInterested,
    Bought,
}

impl InterestStatus {
    pub const ALL: [InterestStatus; 5] = [
        InterestStatus::Hot,
        InterestStatus::Warm,
        InterestStatus::Cold,
        InterestStatus::NotInterested,
        InterestStatus::Bought,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            InterestStatus::Hot => "Hot",
            InterestStatus::Warm => "Warm",
            InterestStatus::Cold => "Cold",
            InterestStatus::NotInterested => "Not Interested",
            InterestStatus::Bought => "Bought",
        }
    }
}

/// Transaction type the customer is interested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum InterestedIn {
    Buying,
    Selling,
    Financing,
    Purchased,
}

impl InterestedIn {
    pub const ALL: [InterestedIn; 4] = [
        InterestedIn::Buying,
        InterestedIn::Selling,
        InterestedIn::Financing,
        InterestedIn::Purchased,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            InterestedIn::Buying => "Buying",
            InterestedIn::Selling => "Selling",
            InterestedIn::Financing => "Financing",
            InterestedIn::Purchased => "Purchased",
        }
    }
}

/// Lowercase and collapse separators so "Not Interested", "not-interested"
/// and "not_interested" all compare equal.
fn slug(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

impl FromStr for InterestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = slug(s);
        InterestStatus::ALL
            .into_iter()
            .find(|v| slug(v.label()) == wanted)
            .ok_or_else(|| format!("unknown interest status '{s}'"))
    }
}

impl FromStr for InterestedIn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = slug(s);
        InterestedIn::ALL
            .into_iter()
            .find(|v| slug(v.label()) == wanted)
            .ok_or_else(|| format!("unknown interested-in value '{s}'"))
    }
}

impl fmt::Display for InterestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for InterestedIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsultantSummary {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// A consultant reference as returned by the store: either a bare id or,
/// when the query asked for expansion, an embedded summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConsultantRef {
    Id(String),
    Expanded(ConsultantSummary),
}

impl ConsultantRef {
    /// The consultant id, or `None` when it is blank.
    pub fn id(&self) -> Option<&str> {
        let id = match self {
            ConsultantRef::Id(id) => id.as_str(),
            ConsultantRef::Expanded(c) => c.id.as_str(),
        };
        let id = id.trim();
        (!id.is_empty()).then_some(id)
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            ConsultantRef::Id(_) => None,
            ConsultantRef::Expanded(c) => Some(c.name.as_str()),
        }
    }

    pub fn avatar(&self) -> Option<&str> {
        match self {
            ConsultantRef::Id(_) => None,
            ConsultantRef::Expanded(c) => c.avatar.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerSummary {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Total scans recorded for this customer, when the store computed it.
    #[serde(default)]
    pub scan_count: Option<u32>,
}

/// Customer reference, same two shapes as [`ConsultantRef`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CustomerRef {
    Id(String),
    Expanded(CustomerSummary),
}

impl CustomerRef {
    pub fn id(&self) -> &str {
        match self {
            CustomerRef::Id(id) => id,
            CustomerRef::Expanded(c) => &c.id,
        }
    }

    fn summary(&self) -> Option<&CustomerSummary> {
        match self {
            CustomerRef::Id(_) => None,
            CustomerRef::Expanded(c) => Some(c),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.summary().and_then(|c| c.name.as_deref())
    }

    pub fn phone(&self) -> Option<&str> {
        self.summary().and_then(|c| c.phone.as_deref())
    }

    pub fn email(&self) -> Option<&str> {
        self.summary().and_then(|c| c.email.as_deref())
    }

    pub fn scan_count(&self) -> Option<u32> {
        self.summary().and_then(|c| c.scan_count)
    }
}

/// One scan event: a consultant engaged with a customer at `created_at`.
/// Read-only snapshot of what the store holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub customer: CustomerRef,
    #[serde(default)]
    pub assigned_consultant: Option<ConsultantRef>,
    #[serde(default)]
    pub interest_status: Option<InterestStatus>,
    #[serde(default)]
    pub interested_in: Option<InterestedIn>,
    #[serde(default)]
    pub follow_up_date: Option<DateTime<Utc>>,
}

/// Consultant id of a scan regardless of how the reference was loaded.
/// Missing, null, or blank ids are all `None`.
pub fn extract_consultant_id(scan: &ScanRecord) -> Option<&str> {
    scan.assigned_consultant.as_ref().and_then(ConsultantRef::id)
}
