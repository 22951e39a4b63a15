//! Subscription plans and their document quotas.

use std::fmt;

use serde::Serialize;

use crate::error::{AuditError, Result};

/// Documents per run on the DEMO tier.
pub const DEMO_QUOTA: usize = 5;

/// Documents per run on the BASIC tier.
pub const BASIC_QUOTA: usize = 20;

/// Maximum number of documents processed in one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Quota {
    Unlimited,
    Capped(usize),
}

impl Quota {
    pub fn limit(self) -> Option<usize> {
        match self {
            Quota::Unlimited => None,
            Quota::Capped(n) => Some(n),
        }
    }

    /// Keep the first items within the quota; returns them with the dropped count.
    pub fn apply<T>(self, mut items: Vec<T>) -> (Vec<T>, usize) {
        match self {
            Quota::Unlimited => (items, 0),
            Quota::Capped(n) => {
                let dropped = items.len().saturating_sub(n);
                items.truncate(n);
                (items, dropped)
            }
        }
    }
}

/// A plan tier with its quota.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    tier: String,
    quota: Quota,
}

impl Plan {
    pub fn demo() -> Self {
        Self::new("DEMO", Quota::Capped(DEMO_QUOTA))
    }

    pub fn basic() -> Self {
        Self::new("BASIC", Quota::Capped(BASIC_QUOTA))
    }

    pub fn pro() -> Self {
        Self::new("PRO", Quota::Unlimited)
    }

    fn new(tier: &str, quota: Quota) -> Self {
        Self {
            tier: tier.to_string(),
            quota,
        }
    }

    /// Look up a known tier by name, case-insensitively.
    pub fn from_tier(tier: &str) -> Option<Self> {
        match tier.trim().to_uppercase().as_str() {
            "DEMO" => Some(Self::demo()),
            "BASIC" => Some(Self::basic()),
            "PRO" => Some(Self::pro()),
            _ => None,
        }
    }

    /// Replace the tier's default ceiling.
    pub fn with_quota(mut self, limit: usize) -> Self {
        self.quota = Quota::Capped(limit);
        self
    }

    /// Resolve a tier name and optional ceiling override into a plan.
    pub fn resolve(tier: &str, quota: Option<usize>) -> Result<Self> {
        let plan = Self::from_tier(tier).ok_or_else(|| {
            AuditError::Config(format!("unknown plan {:?} (expected DEMO, BASIC or PRO)", tier))
        })?;

        match quota {
            Some(0) => Err(AuditError::Config("quota must be at least 1".to_string())),
            Some(limit) => Ok(plan.with_quota(limit)),
            None => Ok(plan),
        }
    }

    pub fn tier(&self) -> &str {
        &self.tier
    }

    pub fn quota(&self) -> Quota {
        self.quota
    }
}

impl Default for Plan {
    fn default() -> Self {
        Self::pro()
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.quota {
            Quota::Unlimited => write!(f, "{} (unlimited)", self.tier),
            Quota::Capped(n) => write!(f, "{} ({} documents)", self.tier, n),
        }
    }
}
