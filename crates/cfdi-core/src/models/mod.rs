//! Data models for invoices and configuration.

pub mod config;
pub mod invoice;

pub use config::{AuditConfig, BatchConfig, ReferenceConfig, RulesConfig};
pub use invoice::{Invoice, Party, Stamp, TaxSource};
