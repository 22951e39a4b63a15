//! Rules command - list the validation catalog.

use clap::Args;
use console::style;
use serde_json::json;

use cfdi_core::invoice::rules::RuleId;

use super::config::load_config;

/// Arguments for the rules command.
#[derive(Args)]
pub struct RulesArgs {
    /// Print the catalog as JSON
    #[arg(long)]
    json: bool,
}

pub async fn run(args: RulesArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let enabled = |rule: RuleId| config.rules.enabled.contains(&rule);

    if args.json {
        let catalog: Vec<_> = RuleId::ALL
            .iter()
            .map(|&rule| {
                json!({
                    "name": rule.name(),
                    "title": rule.title(),
                    "description": rule.description(),
                    "enabled": enabled(rule),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&catalog)?);
        return Ok(());
    }

    for rule in RuleId::ALL {
        let marker = if enabled(rule) {
            style("✓").green()
        } else {
            style("-").dim()
        };
        println!(
            "{} {:<18} {:<11} {}",
            marker,
            rule.name(),
            rule.title(),
            rule.description()
        );
    }

    Ok(())
}
