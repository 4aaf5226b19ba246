//! Canonical record shapes shared across the data layer.
//!
//! These are the normalized forms produced at the remote boundary; every
//! field the backend sends inconsistently is coerced during decode and the
//! rest of the system only ever sees these types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::de;

/// One activation/deactivation occurrence (a "call" / user-audit row).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(default, deserialize_with = "de::lenient_id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_id")]
    pub code_id: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_id")]
    pub performed_by_user_id: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_id")]
    pub branch_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    /// Seconds; the backend sends numbers, numeric strings, or nothing.
    #[serde(default, deserialize_with = "de::lenient_f64")]
    pub duration: Option<f64>,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub device_info: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    /// Secondary join key into the code-mapping table (matched on `tsl_code_id`).
    #[serde(default, deserialize_with = "de::lenient_id")]
    pub conf_id: Option<String>,
    #[serde(
        default,
        alias = "fileName",
        alias = "filename",
        deserialize_with = "de::lenient_string"
    )]
    pub file_name: Option<String>,
}

impl EventRecord {
    /// Coerced duration for summing; missing or non-finite values count as zero.
    pub fn duration_secs(&self) -> f64 {
        self.duration.filter(|d| d.is_finite()).unwrap_or(0.0)
    }

    pub fn parsed_status(&self) -> Option<CallStatus> {
        self.status.as_deref().and_then(CallStatus::parse)
    }
}

/// Recognized event statuses. Anything else is an unrecognized raw value.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum CallStatus {
    Active,
    Deactivated,
    Inactive,
}

impl CallStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "ACTIVE" => Some(Self::Active),
            "DEACTIVATED" => Some(Self::Deactivated),
            "INACTIVE" => Some(Self::Inactive),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Deactivated => "DEACTIVATED",
            Self::Inactive => "INACTIVE",
        }
    }
}

/// A named incident/emergency type (e.g. "Code Blue").
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Code {
    #[serde(default, deserialize_with = "de::lenient_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub code_name: Option<String>,
    #[serde(default)]
    pub code_purpose: Option<String>,
    #[serde(default)]
    pub code_color: Option<String>,
    #[serde(default)]
    pub code_icon: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// Alternate naming scheme joined through the code-mapping table.
    #[serde(default, deserialize_with = "de::lenient_id")]
    pub tsl_code_id: Option<String>,
    #[serde(default)]
    pub tsl_code_name: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_datetime")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    #[serde(default, deserialize_with = "de::lenient_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, deserialize_with = "de::lenient_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_id")]
    pub branch_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl User {
    pub fn display_name(&self) -> Option<String> {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (None, None) => None,
            (first, last) => Some(
                format!("{} {}", first.unwrap_or_default(), last.unwrap_or_default())
                    .trim()
                    .to_string(),
            ),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(default, deserialize_with = "de::lenient_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

/// Join-table row associating a branch and a code under two naming schemes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeMapping {
    #[serde(default, deserialize_with = "de::lenient_id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_id")]
    pub branch_id: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_id")]
    pub vconnect_code_id: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_id")]
    pub tsl_code_id: Option<String>,
    #[serde(default)]
    pub tsl_code_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_datetime")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Projection of a mapping row used by the branch-attribution joins.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MappedCode {
    pub branch_id: Option<String>,
    pub code_id: Option<String>,
    pub tsl_code_id: Option<String>,
}

/// The `codeMappings` dataset: raw rows plus the named-mapping projection.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingBundle {
    pub rows: Vec<CodeMapping>,
    pub mapped: Vec<MappedCode>,
}

impl MappingBundle {
    /// Keeps only rows carrying a `tsl_code_name`, mirroring the backend's
    /// contract that unnamed mappings are placeholders.
    pub fn from_rows(rows: Vec<CodeMapping>) -> Self {
        let mapped = rows
            .iter()
            .filter(|row| {
                row.tsl_code_name
                    .as_deref()
                    .is_some_and(|name| !name.trim().is_empty())
            })
            .map(|row| MappedCode {
                branch_id: row.branch_id.clone(),
                code_id: row.vconnect_code_id.clone(),
                tsl_code_id: row.tsl_code_id.clone(),
            })
            .collect();
        Self { rows, mapped }
    }
}

/// Derived audio-attachment row with resolved code display fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AudioAudit {
    pub id: Option<String>,
    pub display_name: String,
    pub duration: Option<f64>,
    pub status: Option<String>,
    pub link: String,
    pub created_at: Option<DateTime<Utc>>,
    pub code_id: Option<String>,
    pub code_color: String,
    pub code_purpose: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BranchChartRow {
    pub branch_id: Option<String>,
    pub branch_name: String,
    pub branch_location: Option<String>,
}

/// Derived chart dataset: named branches projected for axis labelling.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartSummary {
    pub branches: Vec<BranchChartRow>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_record_decodes_loose_payload() {
        let record: EventRecord = serde_json::from_value(json!({
            "id": 12,
            "code_id": "3",
            "performed_by_user_id": 7,
            "status": " active ",
            "created_at": "2024-06-01 08:15:00",
            "duration": "42.5",
            "conf_id": 900,
            "fileName": "rec-12.mp3"
        }))
        .unwrap();

        assert_eq!(record.id.as_deref(), Some("12"));
        assert_eq!(record.code_id.as_deref(), Some("3"));
        assert_eq!(record.performed_by_user_id.as_deref(), Some("7"));
        assert_eq!(record.parsed_status(), Some(CallStatus::Active));
        assert_eq!(record.duration_secs(), 42.5);
        assert_eq!(record.conf_id.as_deref(), Some("900"));
        assert_eq!(record.file_name.as_deref(), Some("rec-12.mp3"));
        assert!(record.created_at.is_some());
    }

    #[test]
    fn event_record_tolerates_missing_everything() {
        let record: EventRecord = serde_json::from_value(json!({})).unwrap();
        assert_eq!(record.duration_secs(), 0.0);
        assert!(record.parsed_status().is_none());
        assert!(record.created_at.is_none());
    }

    #[test]
    fn file_name_variants_normalize() {
        for key in ["file_name", "fileName", "filename"] {
            let record: EventRecord =
                serde_json::from_value(json!({ key: "a.mp3" })).unwrap();
            assert_eq!(record.file_name.as_deref(), Some("a.mp3"), "variant {key}");
        }
    }

    #[test]
    fn status_parse_is_case_and_whitespace_insensitive() {
        assert_eq!(CallStatus::parse("  deactivated "), Some(CallStatus::Deactivated));
        assert_eq!(CallStatus::parse("WEIRD"), None);
    }

    #[test]
    fn mapping_bundle_keeps_named_rows_only() {
        let rows = vec![
            CodeMapping {
                branch_id: Some("1".into()),
                vconnect_code_id: Some("10".into()),
                tsl_code_id: Some("900".into()),
                tsl_code_name: Some("TSL Blue".into()),
                ..Default::default()
            },
            CodeMapping {
                branch_id: Some("2".into()),
                tsl_code_name: Some("  ".into()),
                ..Default::default()
            },
            CodeMapping::default(),
        ];
        let bundle = MappingBundle::from_rows(rows);
        assert_eq!(bundle.rows.len(), 3);
        assert_eq!(bundle.mapped.len(), 1);
        assert_eq!(bundle.mapped[0].code_id.as_deref(), Some("10"));
    }

    #[test]
    fn user_display_name_trims_partial_names() {
        let user = User {
            first_name: Some("Ada".into()),
            ..Default::default()
        };
        assert_eq!(user.display_name().as_deref(), Some("Ada"));
        assert!(User::default().display_name().is_none());
    }
}
