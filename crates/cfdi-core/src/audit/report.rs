//! Audit results, aggregate metrics and the tabular report view.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::invoice::rules::{RuleId, RuleSet, Severity, Verdict};
use crate::models::invoice::Invoice;

/// Label shown in place of a missing stamp UUID.
pub const UNSTAMPED: &str = "UNSTAMPED";

/// Invoice columns of the tabular view; rule columns follow them.
pub const FIXED_HEADERS: [&str; 10] = [
    "File",
    "UUID",
    "Date",
    "Issuer RFC",
    "Issuer name",
    "Receiver RFC",
    "Currency",
    "Subtotal",
    "Tax",
    "Total",
];

/// One successfully parsed document and its verdicts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRow {
    pub source: String,
    pub invoice: Invoice,
    /// Exactly one verdict per active rule, in catalog order.
    pub verdicts: BTreeMap<RuleId, Verdict>,
}

impl AuditRow {
    pub fn new(invoice: Invoice, verdicts: BTreeMap<RuleId, Verdict>) -> Self {
        Self {
            source: invoice.source.clone(),
            invoice,
            verdicts,
        }
    }

    /// Worst severity across all verdicts; `Clean` when no rule ran.
    pub fn worst_severity(&self) -> Severity {
        self.verdicts
            .values()
            .map(Verdict::severity)
            .max()
            .unwrap_or(Severity::Clean)
    }
}

/// A document that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedDocument {
    pub source: String,
    pub reason: String,
}

/// Result of one batch run. Read-only once built.
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    rows: Vec<AuditRow>,
    failures: Vec<FailedDocument>,
    submitted: usize,
    dropped: usize,
    rules: RuleSet,
    plan: String,
    reference_status: String,
}

impl AuditReport {
    pub(crate) fn new(
        rows: Vec<AuditRow>,
        failures: Vec<FailedDocument>,
        submitted: usize,
        dropped: usize,
        rules: RuleSet,
        plan: String,
        reference_status: String,
    ) -> Self {
        Self {
            rows,
            failures,
            submitted,
            dropped,
            rules,
            plan,
            reference_status,
        }
    }

    /// Audited documents, in input order.
    pub fn rows(&self) -> &[AuditRow] {
        &self.rows
    }

    /// Documents that failed to parse, in input order.
    pub fn failures(&self) -> &[FailedDocument] {
        &self.failures
    }

    /// Documents handed to the run, before the quota.
    pub fn submitted(&self) -> usize {
        self.submitted
    }

    /// Documents cut by the plan quota.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn plan(&self) -> &str {
        &self.plan
    }

    pub fn reference_status(&self) -> &str {
        &self.reference_status
    }

    pub fn summary(&self) -> Summary {
        summarize(self)
    }

    /// Build the tabular view: fixed invoice columns, then one per active rule.
    pub fn table(&self) -> ReportTable {
        let mut headers: Vec<String> = FIXED_HEADERS.iter().map(|h| h.to_string()).collect();
        headers.extend(self.rules.iter().map(|rule| rule.title().to_string()));

        let rows = self
            .rows
            .iter()
            .map(|row| {
                let invoice = &row.invoice;
                let mut cells = vec![
                    Cell::text(&row.source),
                    Cell::text(invoice.uuid().unwrap_or(UNSTAMPED)),
                    Cell::text(invoice.issued_at.get(..10).unwrap_or(&invoice.issued_at)),
                    Cell::text(&invoice.issuer.rfc),
                    Cell::text(&invoice.issuer.name),
                    Cell::text(&invoice.receiver.rfc),
                    Cell::text(&invoice.currency),
                    Cell::amount(invoice.subtotal),
                    Cell::amount(invoice.tax_total),
                    Cell::amount(invoice.total),
                ];
                cells.extend(
                    row.verdicts
                        .iter()
                        .map(|(rule, verdict)| Cell::verdict(*rule, verdict)),
                );
                cells
            })
            .collect();

        ReportTable { headers, rows }
    }
}

/// Aggregate metrics over a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub processed: usize,
    pub failed: usize,
    pub dropped: usize,
    /// Sum of declared totals across audited documents, capped at `Decimal::MAX`.
    pub total_amount: Decimal,
    pub unique_issuers: usize,
    /// Rows where every rule returned `Ok`.
    pub clean_rows: usize,
    /// Per rule: violations plus flagged warnings.
    pub issues: BTreeMap<RuleId, usize>,
    /// Per rule: warnings of any kind.
    pub warnings: BTreeMap<RuleId, usize>,
}

impl Summary {
    pub fn issue_count(&self, rule: RuleId) -> usize {
        self.issues.get(&rule).copied().unwrap_or(0)
    }

    pub fn warning_count(&self, rule: RuleId) -> usize {
        self.warnings.get(&rule).copied().unwrap_or(0)
    }
}

/// Compute aggregate metrics. Pure; the same report always yields the same summary.
pub fn summarize(report: &AuditReport) -> Summary {
    let mut issues: BTreeMap<RuleId, usize> = report.rules.iter().map(|r| (r, 0)).collect();
    let mut warnings = issues.clone();
    let mut issuers = BTreeSet::new();
    let mut total_amount = Decimal::ZERO;
    let mut clean_rows = 0;

    for row in &report.rows {
        total_amount = total_amount.saturating_add(row.invoice.total);
        if !row.invoice.issuer.rfc.is_empty() {
            issuers.insert(row.invoice.issuer.rfc.as_str());
        }
        if row.verdicts.values().all(Verdict::is_ok) {
            clean_rows += 1;
        }

        for (rule, verdict) in &row.verdicts {
            if verdict.is_issue() {
                *issues.entry(*rule).or_default() += 1;
            }
            if verdict.severity() == Severity::Warning {
                *warnings.entry(*rule).or_default() += 1;
            }
        }
    }

    Summary {
        processed: report.rows.len(),
        failed: report.failures.len(),
        dropped: report.dropped,
        total_amount,
        unique_issuers: issuers.len(),
        clean_rows,
        issues,
        warnings,
    }
}

/// Tabular view of a report, shared by every export format.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl ReportTable {
    /// Column indices holding rule verdicts.
    pub fn rule_columns(&self) -> Range<usize> {
        FIXED_HEADERS.len().min(self.headers.len())..self.headers.len()
    }
}

/// A rendered cell with the severity that drives highlighting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cell {
    pub text: String,
    pub severity: Severity,
    /// Rule that produced the cell, for verdict columns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<RuleId>,
    /// Numeric value, for amount columns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
}

impl Cell {
    fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            severity: Severity::Clean,
            rule: None,
            amount: None,
        }
    }

    fn amount(value: Decimal) -> Self {
        Self {
            text: format!("{:.2}", value),
            severity: Severity::Clean,
            rule: None,
            amount: Some(value),
        }
    }

    fn verdict(rule: RuleId, verdict: &Verdict) -> Self {
        Self {
            text: verdict.to_string(),
            severity: verdict.severity(),
            rule: Some(rule),
            amount: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use pretty_assertions::assert_eq;

    fn row(source: &str, rfc: &str, verdicts: Vec<(RuleId, Verdict)>) -> AuditRow {
        let mut invoice = test_support::invoice();
        invoice.source = source.to_string();
        invoice.issuer.rfc = rfc.to_string();
        AuditRow::new(invoice, verdicts.into_iter().collect())
    }

    fn report() -> AuditReport {
        let rules: RuleSet = [RuleId::Blacklist, RuleId::Arithmetic, RuleId::DocumentAge]
            .into_iter()
            .collect();

        let rows = vec![
            row(
                "a.xml",
                "AAA010101AAA",
                vec![
                    (RuleId::Blacklist, Verdict::Ok),
                    (RuleId::Arithmetic, Verdict::Ok),
                    (RuleId::DocumentAge, Verdict::Ok),
                ],
            ),
            row(
                "b.xml",
                "ZZZ010101ZZ1",
                vec![
                    (RuleId::Blacklist, Verdict::violation("listed")),
                    (RuleId::Arithmetic, Verdict::violation("totals differ by $5.00")),
                    (RuleId::DocumentAge, Verdict::flagged("issued 400 days ago")),
                ],
            ),
            row(
                "c.xml",
                "AAA010101AAA",
                vec![
                    (RuleId::Blacklist, Verdict::inconclusive("not verified")),
                    (RuleId::Arithmetic, Verdict::Ok),
                    (RuleId::DocumentAge, Verdict::anomaly("issue date missing")),
                ],
            ),
        ];

        let failures = vec![FailedDocument {
            source: "d.xml".to_string(),
            reason: "malformed XML".to_string(),
        }];

        AuditReport::new(rows, failures, 6, 2, rules, "PRO".to_string(), "ok".to_string())
    }

    #[test]
    fn test_summary_counts() {
        let summary = summarize(&report());

        assert_eq!(summary.processed, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.dropped, 2);
        assert_eq!(summary.total_amount, Decimal::new(348000, 2));
        assert_eq!(summary.unique_issuers, 2);
        assert_eq!(summary.clean_rows, 1);

        assert_eq!(summary.issue_count(RuleId::Blacklist), 1);
        assert_eq!(summary.issue_count(RuleId::Arithmetic), 1);
        assert_eq!(summary.issue_count(RuleId::DocumentAge), 1);
        assert_eq!(summary.warning_count(RuleId::Blacklist), 1);
        assert_eq!(summary.warning_count(RuleId::DocumentAge), 2);
        assert_eq!(summary.warning_count(RuleId::Arithmetic), 0);
    }

    #[test]
    fn test_summary_is_idempotent() {
        let report = report();
        assert_eq!(summarize(&report), summarize(&report));
        assert_eq!(report.summary(), summarize(&report));
    }

    #[test]
    fn test_total_amount_saturates() {
        let mut report = report();
        for row in &mut report.rows {
            row.invoice.total = Decimal::from_i128_with_scale(50_000_000_000_000_000_000_000_000_000, 0);
        }

        assert_eq!(summarize(&report).total_amount, Decimal::MAX);
    }

    #[test]
    fn test_inactive_rules_are_absent_from_counts() {
        let summary = summarize(&report());
        assert!(!summary.issues.contains_key(&RuleId::Stamp));
        assert_eq!(summary.issue_count(RuleId::Stamp), 0);
    }

    #[test]
    fn test_worst_severity() {
        let report = report();
        let worst: Vec<Severity> = report.rows().iter().map(AuditRow::worst_severity).collect();
        assert_eq!(
            worst,
            vec![Severity::Clean, Severity::Violation, Severity::Warning]
        );
    }

    #[test]
    fn test_table_layout() {
        let mut report = report();
        report.rows[2].invoice.stamp = None;
        let table = report.table();

        assert_eq!(table.headers.len(), 13);
        assert_eq!(table.rule_columns(), 10..13);
        assert_eq!(&table.headers[10..], &["EFOS", "Arithmetic", "Age"]);
        assert_eq!(table.rows.len(), 3);

        let first = &table.rows[0];
        assert_eq!(first[0].text, "a.xml");
        assert_eq!(first[2].text, "2025-06-01");
        assert_eq!(first[9].text, "1160.00");
        assert_eq!(first[9].amount, Some(Decimal::new(116000, 2)));

        let second = &table.rows[1];
        assert_eq!(second[10].severity, Severity::Violation);
        assert_eq!(second[10].rule, Some(RuleId::Blacklist));
        assert_eq!(second[12].severity, Severity::Warning);

        assert_eq!(table.rows[2][1].text, UNSTAMPED);
    }
}
