//! Batch auditing: plans, orchestration and reporting.

mod batch;
mod plan;
mod report;

pub use batch::{BatchAuditor, Document};
pub use plan::{Plan, Quota, BASIC_QUOTA, DEMO_QUOTA};
pub use report::{
    summarize, AuditReport, AuditRow, Cell, FailedDocument, ReportTable, Summary, FIXED_HEADERS,
    UNSTAMPED,
};
