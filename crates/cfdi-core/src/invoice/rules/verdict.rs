//! Rule outcomes and their severity mapping.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of one rule applied to one invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Verdict {
    /// The rule passed.
    Ok,
    /// The rule could not pass cleanly but did not find a hard violation.
    Warning { kind: WarningKind, detail: String },
    /// The rule found a violation.
    Violation { detail: String },
}

/// Why a rule returned a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Input was missing or malformed, so the rule could not evaluate.
    Anomaly,
    /// Reference data was unavailable; the result is unknown.
    Inconclusive,
    /// The rule evaluated and found a suspicious condition.
    Flagged,
}

/// Three-tier severity shared by every report view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Clean,
    Warning,
    Violation,
}

impl Verdict {
    pub fn anomaly(detail: impl Into<String>) -> Self {
        Verdict::Warning {
            kind: WarningKind::Anomaly,
            detail: detail.into(),
        }
    }

    pub fn inconclusive(detail: impl Into<String>) -> Self {
        Verdict::Warning {
            kind: WarningKind::Inconclusive,
            detail: detail.into(),
        }
    }

    pub fn flagged(detail: impl Into<String>) -> Self {
        Verdict::Warning {
            kind: WarningKind::Flagged,
            detail: detail.into(),
        }
    }

    pub fn violation(detail: impl Into<String>) -> Self {
        Verdict::Violation {
            detail: detail.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Verdict::Ok)
    }

    /// Whether this verdict counts toward a rule's issue tally:
    /// any violation, or a warning the rule itself flagged.
    pub fn is_issue(&self) -> bool {
        matches!(
            self,
            Verdict::Violation { .. }
                | Verdict::Warning {
                    kind: WarningKind::Flagged,
                    ..
                }
        )
    }

    pub fn severity(&self) -> Severity {
        match self {
            Verdict::Ok => Severity::Clean,
            Verdict::Warning { .. } => Severity::Warning,
            Verdict::Violation { .. } => Severity::Violation,
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            Verdict::Ok => None,
            Verdict::Warning { detail, .. } | Verdict::Violation { detail } => Some(detail),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Ok => write!(f, "OK"),
            Verdict::Warning { kind, detail } => match kind {
                WarningKind::Inconclusive => write!(f, "UNVERIFIED: {}", detail),
                _ => write!(f, "WARNING: {}", detail),
            },
            Verdict::Violation { detail } => write!(f, "VIOLATION: {}", detail),
        }
    }
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Clean => "clean",
            Severity::Warning => "warning",
            Severity::Violation => "violation",
        }
    }
}
