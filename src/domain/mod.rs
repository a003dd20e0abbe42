pub mod activity;
pub mod analytics;
pub mod history;
pub mod scan;

pub use activity::{filter_and_sort, ActivityQuery, SortBy};
pub use analytics::summarize;
pub use history::assignment_history;
pub use scan::{
    extract_consultant_id, ConsultantRef, ConsultantSummary, CustomerRef, CustomerSummary,
    InterestStatus, InterestedIn, ScanRecord,
};
