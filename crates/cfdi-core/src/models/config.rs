//! Configuration structures for the audit pipeline.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::invoice::rules::RuleId;

/// Main configuration for the cfdi audit pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Rule engine configuration.
    pub rules: RulesConfig,

    /// Blacklist reference data configuration.
    pub reference: ReferenceConfig,

    /// Batch processing configuration.
    pub batch: BatchConfig,
}

/// Rule engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Rules enabled when the caller does not pick a subset.
    pub enabled: Vec<RuleId>,

    /// Home currency; documents in it must use an exchange rate of 1.
    pub home_currency: String,

    /// Absolute tolerance for `subtotal + tax - total`, in currency units.
    pub arithmetic_tolerance: Decimal,

    /// Maximum document age in days before it is flagged.
    pub max_age_days: i64,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            enabled: RuleId::ALL.to_vec(),
            home_currency: "MXN".to_string(),
            arithmetic_tolerance: Decimal::ONE,
            max_age_days: 365,
        }
    }
}

/// Blacklist (EFOS list) loading configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
    /// Path to the published taxpayer list (CSV).
    pub path: PathBuf,

    /// Substring identifying the tax ID column header.
    pub tax_id_marker: String,

    /// Substring identifying the legal-situation column header.
    pub status_marker: String,

    /// Substring marking a row as definitively listed.
    pub listed_marker: String,

    /// Maximum number of title rows that may precede the header.
    pub max_skipped_rows: usize,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("lista_negra_sat.csv"),
            tax_id_marker: "RFC".to_string(),
            status_marker: "SITUACI".to_string(),
            listed_marker: "DEFINITIVO".to_string(),
            max_skipped_rows: 2,
        }
    }
}

/// Batch processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Plan tier name (DEMO, BASIC, PRO).
    pub plan: String,

    /// Explicit document ceiling, overriding the tier's default.
    pub quota: Option<usize>,

    /// Number of parallel workers.
    pub workers: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            plan: "PRO".to_string(),
            quota: None,
            workers: 4,
        }
    }
}

impl AuditConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}
