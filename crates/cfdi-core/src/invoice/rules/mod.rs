//! Business-rule validators for CFDI invoices.
//!
//! The catalog is fixed: each [`RuleId`] is bound to one pure validator.
//! Validators are total. Missing or malformed input yields a warning verdict,
//! never a panic or an error, so one rule's data gap cannot abort a batch.

pub mod arithmetic;
pub mod currency;
pub mod dates;
pub mod efos;
pub mod patterns;
pub mod payment;
pub mod rfc;
pub mod stamp;
mod verdict;

pub use rfc::{validate_rfc, RfcKind};
pub use verdict::{Severity, Verdict, WarningKind};

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::config::RulesConfig;
use crate::models::invoice::Invoice;
use crate::reference::Blacklist;

/// Identifier of a rule in the fixed catalog. Ordering is catalog order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleId {
    /// Issuer RFC on the definitive EFOS list.
    Blacklist,
    /// Digital stamp (TimbreFiscalDigital) present with a UUID.
    Stamp,
    /// `subtotal + tax` matches `total`.
    Arithmetic,
    /// Issuer RFC is structurally valid.
    TaxIdFormat,
    /// Currency and exchange rate agree.
    CurrencyExchange,
    /// PUE/PPD payment method agrees with the payment form.
    PaymentMethod,
    /// Document is not older than the configured window.
    DocumentAge,
}

impl RuleId {
    /// Every rule, in catalog order.
    pub const ALL: [RuleId; 7] = [
        RuleId::Blacklist,
        RuleId::Stamp,
        RuleId::Arithmetic,
        RuleId::TaxIdFormat,
        RuleId::CurrencyExchange,
        RuleId::PaymentMethod,
        RuleId::DocumentAge,
    ];

    /// Machine name, as accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            RuleId::Blacklist => "blacklist",
            RuleId::Stamp => "stamp",
            RuleId::Arithmetic => "arithmetic",
            RuleId::TaxIdFormat => "tax-id-format",
            RuleId::CurrencyExchange => "currency-exchange",
            RuleId::PaymentMethod => "payment-method",
            RuleId::DocumentAge => "document-age",
        }
    }

    /// Column title used in reports.
    pub fn title(self) -> &'static str {
        match self {
            RuleId::Blacklist => "EFOS",
            RuleId::Stamp => "Stamp",
            RuleId::Arithmetic => "Arithmetic",
            RuleId::TaxIdFormat => "RFC",
            RuleId::CurrencyExchange => "Currency",
            RuleId::PaymentMethod => "Payment",
            RuleId::DocumentAge => "Age",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            RuleId::Blacklist => "Issuer RFC is not on the definitive EFOS list",
            RuleId::Stamp => "Document carries a TimbreFiscalDigital with a UUID",
            RuleId::Arithmetic => "Subtotal plus transferred taxes matches the total",
            RuleId::TaxIdFormat => "Issuer RFC matches the 12/13 character RFC structure",
            RuleId::CurrencyExchange => "Exchange rate is 1 for the home currency and set otherwise",
            RuleId::PaymentMethod => "PPD uses payment form 99 and PUE does not",
            RuleId::DocumentAge => "Document was issued within the configured window",
        }
    }

    /// Whether the rule consults the blacklist.
    pub fn needs_blacklist(self) -> bool {
        matches!(self, RuleId::Blacklist)
    }

    /// Run this rule against an invoice.
    pub fn validate(self, invoice: &Invoice, ctx: &RuleContext<'_>) -> Verdict {
        match self {
            RuleId::Blacklist => efos::check(invoice, ctx.blacklist),
            RuleId::Stamp => stamp::check(invoice),
            RuleId::Arithmetic => arithmetic::check(invoice, ctx.config.arithmetic_tolerance),
            RuleId::TaxIdFormat => rfc::check(invoice),
            RuleId::CurrencyExchange => currency::check(invoice, &ctx.config.home_currency),
            RuleId::PaymentMethod => payment::check(invoice),
            RuleId::DocumentAge => dates::check(invoice, ctx.today, ctx.config.max_age_days),
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned for an unrecognised rule name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown rule {0:?} (expected one of: {names})", names = RuleId::ALL.map(RuleId::name).join(", "))]
pub struct UnknownRule(pub String);

impl FromStr for RuleId {
    type Err = UnknownRule;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['_', ' '], "-");

        match normalized.as_str() {
            "blacklist" | "efos" => Ok(RuleId::Blacklist),
            "stamp" | "timbre" => Ok(RuleId::Stamp),
            "arithmetic" | "math" => Ok(RuleId::Arithmetic),
            "tax-id-format" | "rfc" => Ok(RuleId::TaxIdFormat),
            "currency-exchange" | "currency" => Ok(RuleId::CurrencyExchange),
            "payment-method" | "payment" => Ok(RuleId::PaymentMethod),
            "document-age" | "age" => Ok(RuleId::DocumentAge),
            _ => Err(UnknownRule(s.to_string())),
        }
    }
}

/// Inputs shared by every rule during one run.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    /// Loaded EFOS reference list.
    pub blacklist: &'a Blacklist,
    /// Rule thresholds.
    pub config: &'a RulesConfig,
    /// Processing date.
    pub today: NaiveDate,
}

/// The subset of rules active for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet(BTreeSet<RuleId>);

impl RuleSet {
    /// Every rule in the catalog.
    pub fn all() -> Self {
        RuleId::ALL.into_iter().collect()
    }

    pub fn contains(&self, rule: RuleId) -> bool {
        self.0.contains(&rule)
    }

    pub fn insert(&mut self, rule: RuleId) -> bool {
        self.0.insert(rule)
    }

    pub fn remove(&mut self, rule: RuleId) -> bool {
        self.0.remove(&rule)
    }

    /// Active rules in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = RuleId> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse a comma-separated list of rule names; `all` selects the catalog.
    pub fn parse_list(list: &str) -> Result<Self, UnknownRule> {
        let mut set = RuleSet::default();
        for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            if name.eq_ignore_ascii_case("all") {
                return Ok(RuleSet::all());
            }
            set.insert(name.parse()?);
        }
        Ok(set)
    }

    /// Run every active rule, producing exactly one verdict per rule.
    pub fn evaluate(&self, invoice: &Invoice, ctx: &RuleContext<'_>) -> BTreeMap<RuleId, Verdict> {
        self.iter()
            .map(|rule| (rule, rule.validate(invoice, ctx)))
            .collect()
    }
}

impl FromIterator<RuleId> for RuleSet {
    fn from_iter<I: IntoIterator<Item = RuleId>>(iter: I) -> Self {
        RuleSet(iter.into_iter().collect())
    }
}

impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(RuleId::name).collect();
        f.write_str(&names.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_rule_names() {
        assert_eq!("efos".parse::<RuleId>(), Ok(RuleId::Blacklist));
        assert_eq!("Tax_Id_Format".parse::<RuleId>(), Ok(RuleId::TaxIdFormat));
        assert_eq!(" payment ".parse::<RuleId>(), Ok(RuleId::PaymentMethod));
        assert!("vigencia".parse::<RuleId>().is_err());
    }

    #[test]
    fn test_names_round_trip_through_from_str() {
        for rule in RuleId::ALL {
            assert_eq!(rule.name().parse::<RuleId>(), Ok(rule));
        }
    }

    #[test]
    fn test_parse_list_keeps_catalog_order() {
        let set = RuleSet::parse_list("age, arithmetic,efos").unwrap();
        let rules: Vec<RuleId> = set.iter().collect();
        assert_eq!(rules, vec![RuleId::Blacklist, RuleId::Arithmetic, RuleId::DocumentAge]);
        assert_eq!(set.to_string(), "blacklist,arithmetic,document-age");
    }

    #[test]
    fn test_parse_list_all_and_errors() {
        assert_eq!(RuleSet::parse_list("all").unwrap(), RuleSet::all());
        assert_eq!(
            RuleSet::parse_list("stamp,bogus"),
            Err(UnknownRule("bogus".to_string()))
        );
    }

    #[test]
    fn test_evaluate_one_verdict_per_active_rule() {
        let blacklist = Blacklist::from_rfcs(["ZZZ010101ZZ1"]);
        let config = RulesConfig::default();
        let ctx = RuleContext {
            blacklist: &blacklist,
            config: &config,
            today: test_support::today(),
        };

        let rules = RuleSet::parse_list("stamp,arithmetic,rfc").unwrap();
        let verdicts = rules.evaluate(&test_support::invoice(), &ctx);

        assert_eq!(verdicts.len(), 3);
        assert!(verdicts.values().all(Verdict::is_ok));

        let all = RuleSet::all().evaluate(&test_support::invoice(), &ctx);
        assert_eq!(all.len(), RuleId::ALL.len());
        assert!(all.values().all(Verdict::is_ok), "{:?}", all);
    }
}
