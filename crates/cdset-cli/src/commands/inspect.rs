//! Inspect command - run one document and print its record and report.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;
use serde::Serialize;
use tracing::info;

use cdset_core::{Assembled, DocumentJob, YearReport, year_label};

use super::{OutputFormat, file_name, load_config};

/// Arguments for the inspect command.
#[derive(Args)]
pub struct InspectArgs {
    /// Input document (PDF or pre-extracted text)
    #[arg(required = true)]
    input: PathBuf,

    /// Institution slug for settings and overrides
    #[arg(short, long)]
    institution: Option<String>,

    /// Academic year label (default: inferred from the file name)
    #[arg(short, long)]
    year: Option<String>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Serialize)]
struct Inspection<'a> {
    path: &'a PathBuf,
    year: &'a str,
    #[serde(flatten)]
    assembled: &'a Assembled,
}

pub async fn run(args: InspectArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let slug = args.institution.clone().unwrap_or_default();
    let documents = config
        .institutions
        .get(&slug)
        .map(|i| i.documents.clone())
        .unwrap_or_else(BTreeMap::new);
    let year = args
        .year
        .clone()
        .or_else(|| year_label(file_name(&args.input), &documents))
        .unwrap_or_else(|| "unknown".to_string());

    info!("Inspecting {} as {}", args.input.display(), year);

    let job = DocumentJob {
        path: args.input.clone(),
        year: year.clone(),
        settings: config.settings_for(&slug),
        overrides: config.overrides_for(&slug, &year).cloned().collect(),
    };
    let assembled = job
        .run()
        .result
        .map_err(|issue| anyhow::anyhow!("{}", issue))?;

    match args.format {
        OutputFormat::Json => {
            let inspection = Inspection {
                path: &args.input,
                year: &year,
                assembled: &assembled,
            };
            let output = serde_json::to_string_pretty(&inspection)?;
            match &args.output {
                Some(path) => {
                    fs::write(path, format!("{}\n", output))?;
                    println!("{} Output written to {}", style("✓").green(), path.display());
                }
                None => println!("{}", output),
            }
        }
        OutputFormat::Text => {
            let record = serde_json::to_string_pretty(&assembled.record)?;
            if let Some(path) = &args.output {
                fs::write(path, format!("{}\n", record))?;
                println!("{} Record written to {}", style("✓").green(), path.display());
            } else {
                println!("{}", record);
            }

            let [extracted, derived, overridden, missing] = assembled.status_counts();
            super::extract::print_year(&YearReport {
                year,
                path: args.input.clone(),
                fields: assembled.fields,
                issues: assembled.issues,
            });
            println!();
            println!(
                "{} {} extracted, {} derived, {} overridden, {} missing",
                style("ℹ").blue(),
                style(extracted).green(),
                style(derived).cyan(),
                style(overridden).magenta(),
                style(missing).yellow()
            );
        }
    }

    Ok(())
}
