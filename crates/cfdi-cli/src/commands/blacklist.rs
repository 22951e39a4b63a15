//! Blacklist command - load the EFOS list and look up taxpayers.

use std::path::PathBuf;

use clap::Args;
use console::style;

use cfdi_core::invoice::rules::validate_rfc;
use cfdi_core::reference;

use super::config::load_config;

/// Arguments for the blacklist command.
#[derive(Args)]
pub struct BlacklistArgs {
    /// EFOS reference list (CSV)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// RFC to look up; may be repeated
    #[arg(long = "check", value_name = "RFC")]
    check: Vec<String>,
}

pub async fn run(args: BlacklistArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(path) = args.file {
        config.reference.path = path;
    }

    let list = reference::load(&config.reference);

    println!("Reference file: {}", config.reference.path.display());
    if list.is_usable() {
        println!("Status: {}", style(list.status()).green());
    } else {
        println!("Status: {}", style(list.status()).yellow());
    }

    for rfc in &args.check {
        let rfc = rfc.trim().to_uppercase();
        let format = if validate_rfc(&rfc) {
            ""
        } else {
            " (invalid RFC format)"
        };

        if !list.is_usable() {
            println!("  {} {}: not verified{}", style("?").yellow(), rfc, format);
        } else if list.contains(&rfc) {
            println!("  {} {}: listed as definitive EFOS{}", style("✗").red(), rfc, format);
        } else {
            println!("  {} {}: not listed{}", style("✓").green(), rfc, format);
        }
    }

    Ok(())
}
