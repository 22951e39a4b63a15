//! Inspect command - parse a single CFDI document.

use std::path::PathBuf;

use chrono::Local;
use clap::Args;
use console::style;
use tracing::info;

use cfdi_core::audit::{Document, UNSTAMPED};
use cfdi_core::invoice::rules::{RuleContext, RuleSet, Severity};
use cfdi_core::invoice::{CfdiParser, DocumentParser};
use cfdi_core::reference::{self, Blacklist};

use super::config::load_config;

/// Arguments for the inspect command.
#[derive(Args)]
pub struct InspectArgs {
    /// CFDI XML file
    #[arg(required = true)]
    input: PathBuf,

    /// Run the validation rules and show their verdicts
    #[arg(long)]
    validate: bool,

    /// Comma-separated rules to run with --validate
    #[arg(short, long)]
    rules: Option<String>,

    /// EFOS reference list (CSV)
    #[arg(short, long)]
    blacklist: Option<PathBuf>,
}

pub async fn run(args: InspectArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(path) = &args.blacklist {
        config.reference.path = path.clone();
    }

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Inspecting {}", args.input.display());
    let document = Document::read(&args.input)?;
    let parser = CfdiParser::new().with_default_currency(config.rules.home_currency.clone());
    let invoice = parser.parse(&document.bytes, &document.source)?;

    if !args.validate {
        println!("{}", serde_json::to_string_pretty(&invoice)?);
        return Ok(());
    }

    let rules = match &args.rules {
        Some(list) => RuleSet::parse_list(list)?,
        None => config.rules.enabled.iter().copied().collect(),
    };

    let blacklist = if rules.iter().any(|rule| rule.needs_blacklist()) {
        reference::load(&config.reference)
    } else {
        Blacklist::unavailable("reference list not needed by the selected rules")
    };

    let ctx = RuleContext {
        blacklist: &blacklist,
        config: &config.rules,
        today: Local::now().date_naive(),
    };

    println!(
        "{} {} {} ({} {}, issuer {})",
        style("ℹ").blue(),
        document.source,
        invoice.reference().unwrap_or_default(),
        invoice.uuid().unwrap_or(UNSTAMPED),
        invoice.issued_at,
        invoice.issuer.rfc
    );

    for (rule, verdict) in rules.evaluate(&invoice, &ctx) {
        let text = verdict.to_string();
        let text = match verdict.severity() {
            Severity::Clean => style(text).green(),
            Severity::Warning => style(text).yellow(),
            Severity::Violation => style(text).red(),
        };
        println!("  {:<12} {}", rule.title(), text);
    }

    Ok(())
}
