pub mod property;
pub mod renovation;
pub mod report;
pub mod submission;

pub use property::{Field, FieldKind, FieldValue, PropertyRecord, Provenance};
pub use renovation::{
    ComparableProperty, Contractor, FinancialSummary, ProjectReturn, QuickInsights,
    RenovationProject, RenovationSuggestion,
};
pub use report::{Report, ReportStatus, Stage};
pub use submission::Submission;
