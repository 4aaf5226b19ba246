//! Pure report-building primitives: reference joining, group-by aggregation
//! and time-range filtering. Every function here is total over arbitrary
//! input; malformed records degrade to zero counts or placeholder labels.

pub mod aggregate;
pub mod join;
pub mod timerange;

pub use aggregate::{
    activations_by_branch, activations_by_code, activations_by_user, audit_details,
    average_duration, average_resolution_time, dashboard_summary, status_tally, timeline,
    AuditDetail, BranchActivation, CodeActivation, CodeStatusCounts, DashboardSummary,
    RecentRecord, StatusTally, TimelinePoint, UserActivation,
};
pub use join::{build_index, unknown_label, FALLBACK_COLOR};
pub use timerange::TimeRange;
