//! Rules command - list the field rule registry.

use clap::Args;
use console::style;

use cdset_core::describe_rules;

use super::OutputFormat;

/// Arguments for the rules command.
#[derive(Args)]
pub struct RulesArgs {
    /// Only rules for fields starting with this path (e.g. "admissions.")
    #[arg(short, long)]
    field: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

pub async fn run(args: RulesArgs) -> anyhow::Result<()> {
    let rules = describe_rules(args.field.as_deref());
    if rules.is_empty() {
        anyhow::bail!(
            "No rules for field: {}",
            args.field.as_deref().unwrap_or_default()
        );
    }

    if args.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&rules)?);
        return Ok(());
    }

    let mut current = "";
    for info in &rules {
        if info.field != current {
            println!();
            println!("{}", style(info.field).bold());
            current = info.field;
        }
        println!(
            "  {} {:<7} {}",
            style(format!("#{}", info.rank)).cyan(),
            info.era.as_str(),
            info.rule
        );
    }

    println!();
    println!("{} {} rules", style("ℹ").blue(), rules.len());
    Ok(())
}
