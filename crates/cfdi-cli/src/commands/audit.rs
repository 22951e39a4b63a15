//! Audit command - validate a batch of CFDI documents.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use cfdi_core::audit::{AuditReport, BatchAuditor, Document, Plan, Summary};
use cfdi_core::invoice::rules::{RuleId, RuleSet};
use cfdi_core::models::config::AuditConfig;
use cfdi_core::reference::{self, Blacklist};
use cfdi_core::AuditError;

use super::config::load_config;
use super::export::{self, OutputFormat};

/// Default file name for spreadsheet exports.
const DEFAULT_XLSX: &str = "audit_report.xlsx";

/// Arguments for the audit command.
#[derive(Args)]
pub struct AuditArgs {
    /// XML files, directories or glob patterns
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Comma-separated rules to run (e.g. "efos,arithmetic" or "all")
    #[arg(short, long)]
    rules: Option<String>,

    /// Plan tier: DEMO, BASIC or PRO
    #[arg(long)]
    plan: Option<String>,

    /// Override the plan's document quota
    #[arg(long)]
    quota: Option<usize>,

    /// EFOS reference list (CSV)
    #[arg(short, long)]
    blacklist: Option<PathBuf>,

    /// Number of parallel workers
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Output file (default: stdout; audit_report.xlsx for xlsx)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print only aggregate metrics
    #[arg(long)]
    summary_only: bool,
}

pub async fn run(args: AuditArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    apply_overrides(&mut config, &args);

    let rules = match &args.rules {
        Some(list) => RuleSet::parse_list(list)?,
        None => config.rules.enabled.iter().copied().collect(),
    };
    if rules.is_empty() {
        anyhow::bail!("No rules selected");
    }

    let plan = Plan::resolve(&config.batch.plan, config.batch.quota)?;

    let files = collect_inputs(&args.inputs)?;
    if files.is_empty() {
        anyhow::bail!("No XML documents found in: {}", args.inputs.join(", "));
    }

    // Data and summary must not share stdout.
    let data_on_stdout =
        args.output.is_none() && matches!(args.format, OutputFormat::Json | OutputFormat::Csv);

    status(
        data_on_stdout,
        format!(
            "{} Found {} documents, plan {}",
            style("ℹ").blue(),
            files.len(),
            plan
        ),
    );

    let blacklist = if rules.iter().any(RuleId::needs_blacklist) {
        reference::load_cached(&config.reference)
    } else {
        Arc::new(Blacklist::unavailable("reference list not needed by the selected rules"))
    };
    info!("Reference list: {}", blacklist.status());

    let documents: Vec<Document> = files.iter().map(|path| Document::load(path)).collect();

    let auditor = BatchAuditor::from_config(&config, blacklist).with_rules(rules);

    let to_process = plan
        .quota()
        .limit()
        .map_or(documents.len(), |limit| limit.min(documents.len()));
    let pb = ProgressBar::new(to_process as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("=>-"),
    );

    let progress = pb.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        auditor.run_with_progress(documents, &plan, |source| {
            progress.set_message(source.to_string());
            progress.inc(1);
        })
    })
    .await?;

    pb.finish_and_clear();

    let report = match outcome {
        Ok(report) => report,
        Err(AuditError::NoValidDocuments { failures }) => {
            eprintln!("{}", style("No document could be parsed:").red());
            for failure in &failures {
                eprintln!("  - {}: {}", failure.source, failure.reason);
            }
            anyhow::bail!("None of the {} documents could be parsed", failures.len());
        }
        Err(e) => return Err(e.into()),
    };

    let summary = report.summary();
    write_output(&args, &report, &summary)?;

    status(data_on_stdout, render_summary(&report, &summary));
    debug!("Audit finished in {:?}", start.elapsed());

    Ok(())
}

fn apply_overrides(config: &mut AuditConfig, args: &AuditArgs) {
    if let Some(plan) = &args.plan {
        config.batch.plan = plan.clone();
    }
    if let Some(quota) = args.quota {
        config.batch.quota = Some(quota);
    }
    if let Some(jobs) = args.jobs {
        config.batch.workers = jobs;
    }
    if let Some(path) = &args.blacklist {
        config.reference.path = path.clone();
    }
}

/// Expand files, directories (non-recursive) and glob patterns into XML paths.
///
/// Explicit files are kept whatever their extension; directory and glob
/// matches are filtered to `.xml`. Duplicates are dropped, first seen wins.
fn collect_inputs(inputs: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut seen = BTreeSet::new();

    for input in inputs {
        let path = Path::new(input);

        let mut found: Vec<PathBuf> = if path.is_dir() {
            fs::read_dir(path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_xml(p))
                .collect()
        } else if path.is_file() {
            vec![path.to_path_buf()]
        } else {
            glob(input)?
                .filter_map(|r| r.ok())
                .filter(|p| p.is_file() && is_xml(p))
                .collect()
        };
        found.sort();

        if found.is_empty() {
            debug!("No documents matched {}", input);
        }

        for file in found {
            if seen.insert(file.clone()) {
                files.push(file);
            }
        }
    }

    Ok(files)
}

fn is_xml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
}

fn write_output(args: &AuditArgs, report: &AuditReport, summary: &Summary) -> anyhow::Result<()> {
    match args.format {
        OutputFormat::Table => {
            if args.summary_only {
                return Ok(());
            }
            let table = report.table();
            match &args.output {
                Some(path) => {
                    fs::write(path, export::render_text(&table, false))?;
                    written(path);
                }
                None => print!("{}", export::render_text(&table, true)),
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&export::to_json(
                report,
                summary,
                args.summary_only,
            ))?;
            match &args.output {
                Some(path) => {
                    fs::write(path, json)?;
                    written(path);
                }
                None => println!("{}", json),
            }
        }
        OutputFormat::Csv => {
            let table = report.table();
            match &args.output {
                Some(path) => {
                    export::write_csv(&table, fs::File::create(path)?)?;
                    written(path);
                }
                None => export::write_csv(&table, std::io::stdout().lock())?,
            }
        }
        OutputFormat::Xlsx => {
            let path = args
                .output
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_XLSX));
            export::write_xlsx(report, &report.table(), summary, &path)?;
            written(&path);
        }
    }

    Ok(())
}

fn written(path: &Path) {
    eprintln!(
        "{} Report written to {}",
        style("✓").green(),
        path.display()
    );
}

/// Print a status line on stdout, or on stderr when stdout carries data.
fn status(to_stderr: bool, text: String) {
    if to_stderr {
        eprintln!("{}", text);
    } else {
        println!("{}", text);
    }
}

fn render_summary(report: &AuditReport, summary: &Summary) -> String {
    let mut lines = vec![
        String::new(),
        format!(
            "{} Audited {} of {} documents (plan {})",
            style("✓").green(),
            summary.processed,
            report.submitted(),
            report.plan()
        ),
        format!(
            "   {} clean, {} failed to parse, {} over quota",
            style(summary.clean_rows).green(),
            style(summary.failed).red(),
            style(summary.dropped).yellow()
        ),
        format!("   Total amount: ${:.2}", summary.total_amount),
        format!("   Unique issuers: {}", summary.unique_issuers),
        format!("   Reference list: {}", report.reference_status()),
    ];

    for rule in report.rules().iter() {
        let issues = summary.issue_count(rule);
        let warnings = summary.warning_count(rule);
        let issues = if issues > 0 {
            style(issues).red().to_string()
        } else {
            issues.to_string()
        };
        lines.push(format!(
            "   {:<12} {} issues, {} warnings",
            rule.title(),
            issues,
            warnings
        ));
    }

    if !report.failures().is_empty() {
        lines.push(String::new());
        lines.push(style("Failed files:").red().to_string());
        for failure in report.failures() {
            lines.push(format!("  - {}: {}", failure.source, failure.reason));
        }
    }

    lines.join("\n")
}
