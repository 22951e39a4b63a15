//! Core library for auditing batches of CFDI 4.0 invoices.
//!
//! This crate provides:
//! - A streaming CFDI XML parser
//! - EFOS blacklist loading from the published taxpayer list
//! - A fixed catalog of fiscal validation rules
//! - Parallel batch orchestration with plan quotas
//! - Aggregate metrics and a tabular report view

pub mod audit;
pub mod error;
pub mod invoice;
pub mod models;
pub mod reference;

#[cfg(test)]
mod test_support;

pub use audit::{AuditReport, AuditRow, BatchAuditor, Document, Plan, Quota, Summary};
pub use error::{AuditError, ParseError, ReferenceError, Result};
pub use invoice::rules::{RuleId, RuleSet, Severity, Verdict, WarningKind};
pub use invoice::{CfdiParser, DocumentParser};
pub use models::{AuditConfig, Invoice, Party, Stamp};
pub use reference::Blacklist;
