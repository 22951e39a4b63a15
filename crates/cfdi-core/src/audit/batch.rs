//! Batch orchestration: quota, parse, validate, collect.

use std::path::Path;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{AuditError, Result};
use crate::invoice::rules::{RuleContext, RuleSet};
use crate::invoice::{CfdiParser, DocumentParser};
use crate::models::config::{AuditConfig, RulesConfig};
use crate::reference::Blacklist;

use super::plan::Plan;
use super::report::{AuditReport, AuditRow, FailedDocument};

type Outcome = std::result::Result<AuditRow, FailedDocument>;

/// A raw document awaiting audit.
#[derive(Debug, Clone)]
pub struct Document {
    /// File name or other handle used in reports.
    pub source: String,
    pub bytes: Vec<u8>,
    /// Set when the bytes could not be obtained; the run reports it as a failure.
    pub read_error: Option<String>,
}

impl Document {
    pub fn new(source: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            source: source.into(),
            bytes: bytes.into(),
            read_error: None,
        }
    }

    /// A document whose contents could not be read.
    pub fn unreadable(source: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            bytes: Vec::new(),
            read_error: Some(reason.into()),
        }
    }

    /// Read a document from disk, naming it after the file.
    pub fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(Self::new(source_name(path), bytes))
    }

    /// Like [`Document::read`], but a read error becomes an unreadable document.
    pub fn load(path: &Path) -> Self {
        match std::fs::read(path) {
            Ok(bytes) => Self::new(source_name(path), bytes),
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                Self::unreadable(source_name(path), format!("unreadable file: {}", e))
            }
        }
    }
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Runs the rule engine over a batch of documents.
pub struct BatchAuditor {
    parser: CfdiParser,
    rules: RuleSet,
    config: RulesConfig,
    blacklist: Arc<Blacklist>,
    workers: usize,
    today: Option<NaiveDate>,
}

impl BatchAuditor {
    /// Auditor with every rule and default thresholds.
    pub fn new(blacklist: Arc<Blacklist>) -> Self {
        Self {
            parser: CfdiParser::new(),
            rules: RuleSet::all(),
            config: RulesConfig::default(),
            blacklist,
            workers: 1,
            today: None,
        }
    }

    /// Auditor configured from the `rules` and `batch` sections.
    pub fn from_config(config: &AuditConfig, blacklist: Arc<Blacklist>) -> Self {
        Self::new(blacklist)
            .with_rules(config.rules.enabled.iter().copied().collect())
            .with_rules_config(config.rules.clone())
            .with_workers(config.batch.workers)
    }

    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_rules_config(mut self, config: RulesConfig) -> Self {
        self.parser = CfdiParser::new().with_default_currency(config.home_currency.clone());
        self.config = config;
        self
    }

    /// Parallel workers; 0 or 1 runs sequentially.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Fix the processing date instead of using the local clock.
    pub fn with_clock(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn blacklist(&self) -> &Blacklist {
        &self.blacklist
    }

    /// Audit a batch under the given plan.
    pub fn run(&self, documents: Vec<Document>, plan: &Plan) -> Result<AuditReport> {
        self.run_with_progress(documents, plan, |_| {})
    }

    /// Audit a batch, calling `progress` with each document's source once it is done.
    pub fn run_with_progress<F>(
        &self,
        documents: Vec<Document>,
        plan: &Plan,
        progress: F,
    ) -> Result<AuditReport>
    where
        F: Fn(&str) + Sync,
    {
        if documents.is_empty() {
            return Err(AuditError::EmptyBatch);
        }

        let submitted = documents.len();
        let (documents, dropped) = plan.quota().apply(documents);
        if dropped > 0 {
            warn!(
                "Plan {} allows {} documents; {} of {} were not processed",
                plan.tier(),
                documents.len(),
                dropped,
                submitted
            );
        }

        let today = self.today.unwrap_or_else(|| Local::now().date_naive());
        let ctx = RuleContext {
            blacklist: &self.blacklist,
            config: &self.config,
            today,
        };

        info!(
            "Auditing {} documents with {} rules ({} workers)",
            documents.len(),
            self.rules.len(),
            self.workers.max(1)
        );

        let outcomes = self.process_all(&documents, &ctx, &progress);

        let mut rows = Vec::new();
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(row) => rows.push(row),
                Err(failure) => failures.push(failure),
            }
        }

        if rows.is_empty() {
            return Err(AuditError::NoValidDocuments { failures });
        }

        info!(
            "Audited {} documents, {} failed to parse",
            rows.len(),
            failures.len()
        );

        Ok(AuditReport::new(
            rows,
            failures,
            submitted,
            dropped,
            self.rules.clone(),
            plan.tier().to_string(),
            self.blacklist.status().to_string(),
        ))
    }

    fn process_all<F>(
        &self,
        documents: &[Document],
        ctx: &RuleContext<'_>,
        progress: &F,
    ) -> Vec<Outcome>
    where
        F: Fn(&str) + Sync,
    {
        let sequential = || -> Vec<Outcome> {
            documents
                .iter()
                .map(|doc| self.process_one(doc, ctx, progress))
                .collect()
        };

        if self.workers <= 1 || documents.len() <= 1 {
            return sequential();
        }

        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
        {
            Ok(pool) => pool.install(|| {
                documents
                    .par_iter()
                    .map(|doc| self.process_one(doc, ctx, progress))
                    .collect()
            }),
            Err(e) => {
                warn!("Failed to start worker pool, running sequentially: {}", e);
                sequential()
            }
        }
    }

    fn process_one<F>(
        &self,
        document: &Document,
        ctx: &RuleContext<'_>,
        progress: &F,
    ) -> Outcome
    where
        F: Fn(&str) + Sync,
    {
        let parsed = match &document.read_error {
            Some(reason) => Err(reason.clone()),
            None => self
                .parser
                .parse(&document.bytes, &document.source)
                .map_err(|e| e.to_string()),
        };

        let outcome = match parsed {
            Ok(invoice) => {
                let verdicts = self.rules.evaluate(&invoice, ctx);
                debug!(
                    "{}: {} verdicts, {} not OK",
                    document.source,
                    verdicts.len(),
                    verdicts.values().filter(|v| !v.is_ok()).count()
                );
                Ok(AuditRow::new(invoice, verdicts))
            }
            Err(reason) => {
                debug!("{}: {}", document.source, reason);
                Err(FailedDocument {
                    source: document.source.clone(),
                    reason,
                })
            }
        };

        progress(&document.source);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::rules::{RuleId, Verdict};
    use crate::test_support::{self, XmlFixture};
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn auditor(workers: usize) -> BatchAuditor {
        BatchAuditor::new(Arc::new(Blacklist::from_rfcs(["ZZZ010101ZZ1"])))
            .with_workers(workers)
            .with_clock(test_support::today())
    }

    fn valid(n: usize) -> Document {
        Document::new(format!("factura_{}.xml", n), XmlFixture::default().build())
    }

    #[test]
    fn test_malformed_document_does_not_abort() {
        let documents: Vec<Document> = (1..=10)
            .map(|n| {
                if n == 4 {
                    Document::new("factura_4.xml", "<cfdi:Comprobante><cfdi:Emisor")
                } else {
                    valid(n)
                }
            })
            .collect();

        let report = auditor(1).run(documents, &Plan::pro()).unwrap();

        assert_eq!(report.rows().len(), 9);
        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.failures()[0].source, "factura_4.xml");
        assert_eq!(report.submitted(), 10);
        assert!(report.rows().iter().all(|row| row.verdicts.len() == RuleId::ALL.len()));
    }

    #[test]
    fn test_quota_truncates_in_input_order() {
        let documents: Vec<Document> = (1..=8).map(valid).collect();
        let plan = Plan::resolve("PRO", Some(5)).unwrap();

        let report = auditor(1).run(documents, &plan).unwrap();

        let sources: Vec<&str> = report.rows().iter().map(|r| r.source.as_str()).collect();
        assert_eq!(
            sources,
            vec![
                "factura_1.xml",
                "factura_2.xml",
                "factura_3.xml",
                "factura_4.xml",
                "factura_5.xml"
            ]
        );
        assert_eq!(report.dropped(), 3);
        assert_eq!(report.summary().dropped, 3);
    }

    #[test]
    fn test_parallel_run_preserves_order() {
        let documents: Vec<Document> = (1..=40).map(valid).collect();
        let report = auditor(4).run(documents, &Plan::pro()).unwrap();

        let expected: Vec<String> = (1..=40).map(|n| format!("factura_{}.xml", n)).collect();
        let sources: Vec<String> = report.rows().iter().map(|r| r.source.clone()).collect();
        assert_eq!(sources, expected);
    }

    #[test]
    fn test_extreme_amounts_do_not_abort() {
        let huge = XmlFixture {
            subtotal: "79228162514264337593543950335",
            total: "79228162514264337593543950335",
            declared_tax: Some("100"),
            ..XmlFixture::default()
        };
        let overflowing_lines = XmlFixture {
            declared_tax: None,
            line_taxes: vec!["79228162514264337593543950335", "79228162514264337593543950335"],
            ..XmlFixture::default()
        };
        let documents = vec![
            valid(1),
            Document::new("huge.xml", huge.build()),
            Document::new("lines.xml", overflowing_lines.build()),
        ];

        let report = auditor(2).run(documents, &Plan::pro()).unwrap();

        assert_eq!(report.rows().len(), 2);
        assert_eq!(
            report.rows()[1].verdicts[&RuleId::Arithmetic],
            Verdict::anomaly("amounts overflow")
        );
        assert_eq!(report.failures()[0].source, "lines.xml");
        assert_eq!(report.summary().total_amount, Decimal::MAX);
    }

    #[test]
    fn test_unreadable_document_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let missing = Document::load(&dir.path().join("gone.xml"));
        assert_eq!(missing.source, "gone.xml");
        assert!(missing.read_error.is_some());

        let documents = vec![valid(1), missing, valid(3)];
        let report = auditor(1).run(documents, &Plan::pro()).unwrap();

        assert_eq!(report.rows().len(), 2);
        assert_eq!(report.failures()[0].source, "gone.xml");
        assert!(report.failures()[0].reason.starts_with("unreadable file"));
    }

    #[test]
    fn test_progress_called_per_document() {
        let documents: Vec<Document> = (1..=6).map(valid).collect();
        let seen = AtomicUsize::new(0);

        auditor(3)
            .run_with_progress(documents, &Plan::pro(), |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_empty_batch_is_error() {
        assert!(matches!(
            auditor(1).run(Vec::new(), &Plan::pro()),
            Err(AuditError::EmptyBatch)
        ));
    }

    #[test]
    fn test_all_invalid_is_error() {
        let documents = vec![
            Document::new("a.xml", "not xml at all <"),
            Document::new("b.xml", "<Factura/>"),
        ];

        match auditor(1).run(documents, &Plan::pro()) {
            Err(AuditError::NoValidDocuments { failures }) => {
                assert_eq!(failures.len(), 2);
                assert_eq!(failures[1].source, "b.xml");
            }
            other => panic!("expected NoValidDocuments, got {:?}", other.map(|r| r.rows().len())),
        }
    }

    #[test]
    fn test_rule_subset_and_listed_issuer() {
        let listed = XmlFixture {
            issuer_rfc: "ZZZ010101ZZ1",
            ..XmlFixture::default()
        };
        let documents = vec![valid(1), Document::new("listed.xml", listed.build())];

        let report = auditor(1)
            .with_rules(RuleSet::parse_list("efos,arithmetic").unwrap())
            .run(documents, &Plan::pro())
            .unwrap();

        let rows = report.rows();
        assert_eq!(rows[0].verdicts.len(), 2);
        assert_eq!(rows[0].verdicts[&RuleId::Blacklist], Verdict::Ok);
        assert!(matches!(
            rows[1].verdicts[&RuleId::Blacklist],
            Verdict::Violation { .. }
        ));
        assert_eq!(report.summary().issue_count(RuleId::Blacklist), 1);
    }

    #[test]
    fn test_from_config() {
        let mut config = AuditConfig::default();
        config.rules.enabled = vec![RuleId::Stamp];
        config.batch.workers = 2;

        let auditor = BatchAuditor::from_config(&config, Arc::new(Blacklist::unavailable("n/a")));
        assert_eq!(auditor.rules().len(), 1);
        assert!(auditor.rules().contains(RuleId::Stamp));
        assert!(!auditor.blacklist().is_valid());
    }
}
