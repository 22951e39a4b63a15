//! In-memory EFOS blacklist.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Set of definitively listed taxpayer RFCs, plus load status.
///
/// Built once per run and shared read-only between workers.
#[derive(Debug, Clone, Serialize)]
pub struct Blacklist {
    #[serde(skip)]
    rfcs: HashSet<String>,
    valid: bool,
    status: String,
    source: Option<PathBuf>,
}

impl Blacklist {
    /// A list that could not be loaded. Lookups against it are inconclusive.
    pub fn unavailable(status: impl Into<String>) -> Self {
        Self {
            rfcs: HashSet::new(),
            valid: false,
            status: status.into(),
            source: None,
        }
    }

    /// Build a list from RFCs; entries are trimmed and uppercased, blanks dropped.
    pub fn from_rfcs<I, S>(rfcs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rfcs: HashSet<String> = rfcs
            .into_iter()
            .map(|rfc| normalize(rfc.as_ref()))
            .filter(|rfc| !rfc.is_empty())
            .collect();

        let status = if rfcs.is_empty() {
            "reference list has no definitive entries".to_string()
        } else {
            format!("reference list active: {} taxpayers", rfcs.len())
        };

        Self {
            rfcs,
            valid: true,
            status,
            source: None,
        }
    }

    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    /// Whether `rfc` (normalized) is listed.
    pub fn contains(&self, rfc: &str) -> bool {
        self.rfcs.contains(&normalize(rfc))
    }

    pub fn len(&self) -> usize {
        self.rfcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rfcs.is_empty()
    }

    /// The source was read and understood.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Lookups are meaningful: the list loaded and is not empty.
    pub fn is_usable(&self) -> bool {
        self.valid && !self.rfcs.is_empty()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

fn normalize(rfc: &str) -> String {
    rfc.trim().to_uppercase()
}
