//! Group-by and summary aggregation over filtered event snapshots.
//!
//! Counts partition their input: every event lands in exactly one bucket of
//! a grouping, with unmatched foreign keys collected under an "Unknown"
//! bucket. The one sanctioned exception is status tallies, which exclude
//! unrecognized status strings from the fixed counters and surface them
//! through `dropped`/`seen` instead.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::Serialize;
use tracing::warn;
use vconnect_core_types::{
    Branch, CallStatus, Code, CodeMapping, EventRecord, MappedCode, User,
};

use crate::join::{build_index, unknown_label, FALLBACK_COLOR};
use crate::timerange::TimeRange;

const UNKNOWN_KEY: &str = "unknown";

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
const WEEKDAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const DAYPART_LABELS: [&str; 3] = ["Morning", "Afternoon", "Evening"];
const WEEK_OF_MONTH_LABELS: [&str; 4] = ["Week 1", "Week 2", "Week 3", "Week 4"];

/// Fixed-key status counters plus the side channel for unrecognized values.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatusTally {
    pub active: usize,
    pub deactivated: usize,
    pub inactive: usize,
    /// Events whose status matched no recognized value (or was missing);
    /// excluded from the counters above.
    pub dropped: usize,
    /// Raw unrecognized status strings observed, for data-quality review.
    pub seen: BTreeSet<String>,
}

impl StatusTally {
    /// Sum of the fixed counters; equals the input length only when every
    /// status was recognized.
    pub fn total(&self) -> usize {
        self.active + self.deactivated + self.inactive
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CodeActivation {
    pub id: String,
    pub name: String,
    pub color: String,
    pub purpose: String,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UserActivation {
    pub id: String,
    pub name: String,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BranchActivation {
    pub id: String,
    pub name: String,
    pub location: String,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimelinePoint {
    pub label: String,
    pub count: usize,
}

/// Secondary-join row: event matched to a mapping via `conf_id` ->
/// `tsl_code_id`, carrying the event's own timestamp and duration.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AuditDetail {
    pub branch_id: Option<String>,
    pub tsl_code_name: String,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
    pub resolution_secs: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CodeStatusCounts {
    pub code_id: String,
    pub name: String,
    pub color: String,
    pub alert: String,
    pub active: usize,
    pub deactivated: usize,
    pub inactive: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecentRecord {
    pub code_name: String,
    pub status: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub color: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub by_code: Vec<CodeStatusCounts>,
    pub recent: Vec<RecentRecord>,
    pub seen_codes: Vec<String>,
}

/// Single-pass status tally. Unrecognized statuses are logged and counted
/// in `dropped` rather than silently vanishing.
pub fn status_tally(events: &[EventRecord]) -> StatusTally {
    let mut tally = StatusTally::default();
    for event in events {
        match event.parsed_status() {
            Some(CallStatus::Active) => tally.active += 1,
            Some(CallStatus::Deactivated) => tally.deactivated += 1,
            Some(CallStatus::Inactive) => tally.inactive += 1,
            None => {
                tally.dropped += 1;
                if let Some(raw) = event.status.as_deref() {
                    let raw = raw.trim().to_uppercase();
                    if !raw.is_empty() {
                        warn!(status = %raw, "unrecognized event status excluded from tally");
                        tally.seen.insert(raw);
                    }
                }
            }
        }
    }
    tally
}

/// First-seen-order group counts keyed by an optional foreign key; events
/// without a key collect under [`UNKNOWN_KEY`].
fn count_groups<F>(events: &[EventRecord], key: F) -> Vec<(String, usize)>
where
    F: Fn(&EventRecord) -> Option<&str>,
{
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for event in events {
        let id = key(event).unwrap_or(UNKNOWN_KEY).to_string();
        match counts.get_mut(&id) {
            Some(count) => *count += 1,
            None => {
                counts.insert(id.clone(), 1);
                order.push(id);
            }
        }
    }
    order
        .into_iter()
        .map(|id| {
            let count = counts[&id];
            (id, count)
        })
        .collect()
}

fn placeholder_name(id: &str) -> String {
    if id == UNKNOWN_KEY {
        "Unknown".to_string()
    } else {
        unknown_label(id)
    }
}

/// Activation counts grouped by code, resolved against the code table.
/// Sorted descending by count; ties keep first-seen order (stable sort).
pub fn activations_by_code(events: &[EventRecord], codes: &[Code]) -> Vec<CodeActivation> {
    let index = build_index(codes, |code| code.id.as_deref());
    let mut rows: Vec<CodeActivation> = count_groups(events, |e| e.code_id.as_deref())
        .into_iter()
        .map(|(id, count)| match index.get(&id) {
            Some(code) => CodeActivation {
                name: code
                    .code_name
                    .clone()
                    .unwrap_or_else(|| placeholder_name(&id)),
                color: code
                    .code_color
                    .clone()
                    .unwrap_or_else(|| FALLBACK_COLOR.to_string()),
                purpose: code.code_purpose.clone().unwrap_or_else(|| "Unknown".to_string()),
                id,
                count,
            },
            None => CodeActivation {
                name: placeholder_name(&id),
                color: FALLBACK_COLOR.to_string(),
                purpose: "Unknown".to_string(),
                id,
                count,
            },
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count));
    rows
}

/// Activation counts grouped by acting user.
pub fn activations_by_user(events: &[EventRecord], users: &[User]) -> Vec<UserActivation> {
    let index = build_index(users, |user| user.id.as_deref());
    let mut rows: Vec<UserActivation> =
        count_groups(events, |e| e.performed_by_user_id.as_deref())
            .into_iter()
            .map(|(id, count)| UserActivation {
                name: index
                    .get(&id)
                    .and_then(|user| user.display_name())
                    .unwrap_or_else(|| placeholder_name(&id)),
                id,
                count,
            })
            .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count));
    rows
}

/// Activation counts grouped by branch, attributed through the code-mapping
/// projection (event `code_id` -> mapping -> `branch_id`). Events with no
/// mapping have no branch attribution and are skipped, mirroring the
/// mapping table's role as the source of truth for branch ownership.
pub fn activations_by_branch(
    events: &[EventRecord],
    mapped: &[MappedCode],
    branches: &[Branch],
) -> Vec<BranchActivation> {
    let mut code_to_branch: HashMap<&str, &str> = HashMap::new();
    for mapping in mapped {
        if let (Some(code_id), Some(branch_id)) =
            (mapping.code_id.as_deref(), mapping.branch_id.as_deref())
        {
            code_to_branch.entry(code_id).or_insert(branch_id);
        }
    }
    let branch_index = build_index(branches, |branch| branch.id.as_deref());

    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for event in events {
        let Some(branch_id) = event
            .code_id
            .as_deref()
            .and_then(|code_id| code_to_branch.get(code_id))
        else {
            continue;
        };
        let branch_id = branch_id.to_string();
        match counts.get_mut(&branch_id) {
            Some(count) => *count += 1,
            None => {
                counts.insert(branch_id.clone(), 1);
                order.push(branch_id);
            }
        }
    }

    let mut rows: Vec<BranchActivation> = order
        .into_iter()
        .map(|id| {
            let count = counts[&id];
            match branch_index.get(&id) {
                Some(branch) => BranchActivation {
                    name: branch.name.clone().unwrap_or_else(|| unknown_label(&id)),
                    location: branch.location.clone().unwrap_or_else(|| "Unknown".to_string()),
                    id,
                    count,
                },
                None => BranchActivation {
                    name: unknown_label(&id),
                    location: "Unknown".to_string(),
                    id,
                    count,
                },
            }
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count));
    rows
}

/// Per-code fixed status counters, the five most recent joined records, and
/// the set of code ids observed — the home-screen summary.
pub fn dashboard_summary(events: &[EventRecord], codes: &[Code]) -> DashboardSummary {
    let index = build_index(codes, |code| code.id.as_deref());

    let mut recent: Vec<&EventRecord> = events.iter().collect();
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let recent = recent
        .into_iter()
        .take(5)
        .map(|event| {
            let code = event.code_id.as_deref().and_then(|id| index.get(id));
            RecentRecord {
                code_name: code
                    .and_then(|c| c.code_name.as_deref())
                    .map(|name| name.to_uppercase())
                    .unwrap_or_else(|| "Unknown Code".to_string()),
                status: event.status.clone(),
                created_at: event.created_at,
                color: code.and_then(|c| c.code_color.clone()),
            }
        })
        .collect();

    let mut by_code: Vec<CodeStatusCounts> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut seen_codes: Vec<String> = Vec::new();
    for event in events {
        let (Some(code_id), Some(status)) = (event.code_id.as_deref(), event.parsed_status())
        else {
            continue;
        };
        let slot = match slots.get(code_id) {
            Some(slot) => *slot,
            None => {
                let code = index.get(code_id);
                by_code.push(CodeStatusCounts {
                    code_id: code_id.to_string(),
                    name: code
                        .and_then(|c| c.code_purpose.clone())
                        .unwrap_or_else(|| format!("Code {code_id}")),
                    color: code
                        .and_then(|c| c.code_color.clone())
                        .unwrap_or_else(|| FALLBACK_COLOR.to_string()),
                    alert: code
                        .and_then(|c| c.code_name.clone())
                        .unwrap_or_else(|| "Code Empty".to_string()),
                    active: 0,
                    deactivated: 0,
                    inactive: 0,
                });
                seen_codes.push(code_id.to_string());
                slots.insert(code_id.to_string(), by_code.len() - 1);
                by_code.len() - 1
            }
        };
        match status {
            CallStatus::Active => by_code[slot].active += 1,
            CallStatus::Deactivated => by_code[slot].deactivated += 1,
            CallStatus::Inactive => by_code[slot].inactive += 1,
        }
    }

    DashboardSummary {
        by_code,
        recent,
        seen_codes,
    }
}

/// Time-bucketed counts with a fixed axis per named range: every bucket is
/// present even at zero so charts keep their full axis.
pub fn timeline(events: &[EventRecord], range: &TimeRange) -> Vec<TimelinePoint> {
    match range {
        TimeRange::Today => {
            let mut buckets = [0usize; 3];
            for ts in events.iter().filter_map(|e| e.created_at) {
                let hour = ts.hour();
                if hour < 12 {
                    buckets[0] += 1;
                } else if hour < 17 {
                    buckets[1] += 1;
                } else {
                    buckets[2] += 1;
                }
            }
            labelled(&DAYPART_LABELS, &buckets)
        }
        TimeRange::ThisWeek => {
            let mut buckets = [0usize; 7];
            for ts in events.iter().filter_map(|e| e.created_at) {
                buckets[ts.weekday().num_days_from_monday() as usize] += 1;
            }
            labelled(&WEEKDAY_LABELS, &buckets)
        }
        TimeRange::ThisMonth => {
            let mut buckets = [0usize; 4];
            for ts in events.iter().filter_map(|e| e.created_at) {
                // Days 29-31 fold into Week 4 so month-end events are never
                // dropped from the fixed four-week axis.
                let week = ((ts.day() as usize + 6) / 7).min(4);
                buckets[week - 1] += 1;
            }
            labelled(&WEEK_OF_MONTH_LABELS, &buckets)
        }
        TimeRange::ThisYear => {
            let mut buckets = [0usize; 12];
            for ts in events.iter().filter_map(|e| e.created_at) {
                buckets[ts.month0() as usize] += 1;
            }
            labelled(&MONTH_LABELS, &buckets)
        }
        TimeRange::Custom { .. } | TimeRange::All => {
            let mut months: BTreeMap<(i32, u32), usize> = BTreeMap::new();
            for ts in events.iter().filter_map(|e| e.created_at) {
                *months.entry((ts.year(), ts.month())).or_insert(0) += 1;
            }
            months
                .into_iter()
                .map(|((year, month), count)| TimelinePoint {
                    label: format!("{}/{:02}", month, year.rem_euclid(100)),
                    count,
                })
                .collect()
        }
    }
}

fn labelled(labels: &[&str], buckets: &[usize]) -> Vec<TimelinePoint> {
    labels
        .iter()
        .zip(buckets)
        .map(|(label, count)| TimelinePoint {
            label: (*label).to_string(),
            count: *count,
        })
        .collect()
}

/// Mean duration in seconds. Missing or non-numeric durations count as
/// zero; an empty input yields 0.0, never NaN.
pub fn average_duration(events: &[EventRecord]) -> f64 {
    if events.is_empty() {
        return 0.0;
    }
    let total: f64 = events.iter().map(EventRecord::duration_secs).sum();
    total / events.len() as f64
}

/// Average resolution time for one branch: events whose secondary join key
/// matches a `tsl_code_id` mapped to the branch, whose duration parses
/// finite, and whose timestamp falls inside the active range.
pub fn average_resolution_time(
    branch_id: &str,
    mapped: &[MappedCode],
    events: &[EventRecord],
    range: &TimeRange,
    now: DateTime<Utc>,
) -> f64 {
    let tsl_ids: HashSet<&str> = mapped
        .iter()
        .filter(|m| m.branch_id.as_deref() == Some(branch_id))
        .filter_map(|m| m.tsl_code_id.as_deref())
        .collect();
    if tsl_ids.is_empty() {
        return 0.0;
    }

    let durations: Vec<f64> = events
        .iter()
        .filter(|event| {
            event
                .conf_id
                .as_deref()
                .is_some_and(|conf| tsl_ids.contains(conf))
        })
        .filter(|event| event.duration.is_some_and(f64::is_finite))
        .filter(|event| range.contains(event.created_at, now))
        .map(EventRecord::duration_secs)
        .collect();

    if durations.is_empty() {
        0.0
    } else {
        durations.iter().sum::<f64>() / durations.len() as f64
    }
}

/// Secondary join of events to mapping rows (`conf_id` -> `tsl_code_id`),
/// newest first. Events with no matching mapping are omitted — this report
/// family only covers the alternate naming scheme.
pub fn audit_details(events: &[EventRecord], mappings: &[CodeMapping]) -> Vec<AuditDetail> {
    let index = build_index(mappings, |m| m.tsl_code_id.as_deref());
    let mut rows: Vec<AuditDetail> = events
        .iter()
        .filter_map(|event| {
            let mapping = event.conf_id.as_deref().and_then(|conf| index.get(conf))?;
            Some(AuditDetail {
                branch_id: mapping.branch_id.clone(),
                tsl_code_name: mapping.tsl_code_name.clone().unwrap_or_default(),
                status: mapping.status.clone().unwrap_or_default(),
                created_at: event.created_at,
                resolution_secs: event.duration_secs(),
            })
        })
        .collect();
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    rows
}
