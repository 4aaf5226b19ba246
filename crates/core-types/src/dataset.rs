//! Dataset addressing: the closed set of logical keys the cache and fetch
//! layers operate on, and the matching sum type of cached values.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::records::{
    Branch, ChartSummary, Code, CodeMapping, Customer, EventRecord, MappingBundle, User,
};

/// Logical name of one cached dataset.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum DatasetKey {
    Users,
    Calls,
    Codes,
    Branches,
    Customers,
    /// Mapping rows plus the named-mapping projection.
    CodeMappings,
    /// Raw mapping rows used by the audit-detail secondary join.
    CodeAuditMappings,
    AudioAudits,
    ChartData,
    /// Per-branch code lookup; one cache slot per branch id.
    BranchCodes(String),
}

impl DatasetKey {
    /// Every fixed key, in the order bulk initialization loads them.
    pub fn all_fixed() -> [DatasetKey; 9] {
        [
            Self::Users,
            Self::Calls,
            Self::Codes,
            Self::Branches,
            Self::Customers,
            Self::CodeMappings,
            Self::CodeAuditMappings,
            Self::AudioAudits,
            Self::ChartData,
        ]
    }

    /// The per-key default served when nothing was ever fetched or a fetch
    /// failed: empty collections, or `None` for the chart singleton.
    pub fn empty_value(&self) -> DatasetValue {
        match self {
            Self::Users => DatasetValue::Users(Vec::new()),
            Self::Calls => DatasetValue::Calls(Vec::new()),
            Self::Codes => DatasetValue::Codes(Vec::new()),
            Self::Branches => DatasetValue::Branches(Vec::new()),
            Self::Customers => DatasetValue::Customers(Vec::new()),
            Self::CodeMappings => DatasetValue::CodeMappings(MappingBundle::default()),
            Self::CodeAuditMappings => DatasetValue::CodeAuditMappings(Vec::new()),
            Self::AudioAudits => DatasetValue::AudioAudits(Vec::new()),
            Self::ChartData => DatasetValue::ChartData(None),
            Self::BranchCodes(_) => DatasetValue::BranchCodes(Vec::new()),
        }
    }
}

impl fmt::Display for DatasetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Users => write!(f, "users"),
            Self::Calls => write!(f, "calls"),
            Self::Codes => write!(f, "codes"),
            Self::Branches => write!(f, "branches"),
            Self::Customers => write!(f, "customers"),
            Self::CodeMappings => write!(f, "codeMappings"),
            Self::CodeAuditMappings => write!(f, "codeAuditMappings"),
            Self::AudioAudits => write!(f, "audioAudits"),
            Self::ChartData => write!(f, "chartData"),
            Self::BranchCodes(id) => write!(f, "branch-codes-{id}"),
        }
    }
}

/// One cached value; the variant always matches its key.
#[derive(Clone, Debug, PartialEq)]
pub enum DatasetValue {
    Users(Vec<User>),
    Calls(Vec<EventRecord>),
    Codes(Vec<Code>),
    Branches(Vec<Branch>),
    Customers(Vec<Customer>),
    CodeMappings(MappingBundle),
    CodeAuditMappings(Vec<CodeMapping>),
    AudioAudits(Vec<crate::records::AudioAudit>),
    ChartData(Option<ChartSummary>),
    BranchCodes(Vec<Code>),
}

impl DatasetValue {
    /// Number of records held, for status reporting. The chart singleton
    /// counts its projected rows.
    pub fn len(&self) -> usize {
        match self {
            Self::Users(v) => v.len(),
            Self::Calls(v) => v.len(),
            Self::Codes(v) | Self::BranchCodes(v) => v.len(),
            Self::Branches(v) => v.len(),
            Self::Customers(v) => v.len(),
            Self::CodeMappings(bundle) => bundle.rows.len(),
            Self::CodeAuditMappings(v) => v.len(),
            Self::AudioAudits(v) => v.len(),
            Self::ChartData(summary) => summary.as_ref().map_or(0, |s| s.branches.len()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_users(self) -> Vec<User> {
        match self {
            Self::Users(v) => v,
            _ => Vec::new(),
        }
    }

    pub fn into_calls(self) -> Vec<EventRecord> {
        match self {
            Self::Calls(v) => v,
            _ => Vec::new(),
        }
    }

    pub fn into_codes(self) -> Vec<Code> {
        match self {
            Self::Codes(v) | Self::BranchCodes(v) => v,
            _ => Vec::new(),
        }
    }

    pub fn into_branches(self) -> Vec<Branch> {
        match self {
            Self::Branches(v) => v,
            _ => Vec::new(),
        }
    }

    pub fn into_customers(self) -> Vec<Customer> {
        match self {
            Self::Customers(v) => v,
            _ => Vec::new(),
        }
    }

    pub fn into_mapping_bundle(self) -> MappingBundle {
        match self {
            Self::CodeMappings(bundle) => bundle,
            _ => MappingBundle::default(),
        }
    }

    pub fn into_audit_mappings(self) -> Vec<CodeMapping> {
        match self {
            Self::CodeAuditMappings(v) => v,
            _ => Vec::new(),
        }
    }

    pub fn into_audio_audits(self) -> Vec<crate::records::AudioAudit> {
        match self {
            Self::AudioAudits(v) => v,
            _ => Vec::new(),
        }
    }

    pub fn into_chart_data(self) -> Option<ChartSummary> {
        match self {
            Self::ChartData(summary) => summary,
            _ => None,
        }
    }
}
