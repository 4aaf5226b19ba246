pub mod dataset;
pub mod de;
pub mod error;
pub mod records;

pub use dataset::{DatasetKey, DatasetValue};
pub use error::InsightError;
pub use records::{
    AudioAudit, Branch, BranchChartRow, CallStatus, ChartSummary, Code, CodeMapping, Customer,
    EventRecord, MappedCode, MappingBundle, User,
};
