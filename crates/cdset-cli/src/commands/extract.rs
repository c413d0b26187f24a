//! Extract command - run the pipeline over one institution's documents.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use cdset_core::{Aggregator, DocumentOutcome, ExtractionIssue, FieldEntry, FieldStatus, RunReport, YearReport};

use super::{OutputFormat, file_name, load_config};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Institution slug, used for config lookup and the output file name
    #[arg(required = true)]
    institution: String,

    /// Directory holding one CDS document per academic year
    #[arg(required = true)]
    source_dir: PathBuf,

    /// Output directory (default: output.data_dir from config)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Additional overrides file
    #[arg(long)]
    overrides: Option<PathBuf>,

    /// Number of documents processed in parallel
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Write the per-field report to a CSV file
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Run without writing the dataset
    #[arg(long)]
    dry_run: bool,

    /// Report format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if let Some(path) = &args.overrides {
        let count = config
            .load_overrides(path)
            .map_err(|e| anyhow::anyhow!("Failed to load overrides {}: {}", path.display(), e))?;
        info!("Loaded {} overrides from {}", count, path.display());
    }

    if !args.source_dir.is_dir() {
        anyhow::bail!("Source directory not found: {}", args.source_dir.display());
    }
    let files = discover(&args.source_dir)?;
    if files.is_empty() {
        anyhow::bail!("No PDF or text documents found in {}", args.source_dir.display());
    }

    let aggregator = Aggregator::new(&config, args.institution.as_str());
    let plan = aggregator.plan(&files);

    let pb = ProgressBar::new(plan.jobs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents")?
            .progress_chars("=>-"),
    );

    let semaphore = Arc::new(Semaphore::new(args.jobs.max(1)));
    let mut tasks = JoinSet::new();
    let mut pending = HashMap::new();
    for job in plan.jobs {
        let permit = semaphore.clone().acquire_owned().await?;
        let document = (job.path.clone(), job.year.clone());
        let handle = tasks.spawn_blocking(move || {
            let outcome = job.run();
            drop(permit);
            outcome
        });
        pending.insert(handle.id(), document);
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = tasks.join_next_with_id().await {
        let outcome = match joined {
            Ok((id, outcome)) => {
                pending.remove(&id);
                outcome
            }
            Err(e) => {
                let (path, year) = pending.remove(&e.id()).unwrap_or_default();
                warn!("Task for {} failed: {}", path.display(), e);
                DocumentOutcome {
                    result: Err(ExtractionIssue::DocumentUnreadable {
                        path: path.clone(),
                        reason: format!("extraction task failed: {}", e),
                    }),
                    path,
                    year,
                }
            }
        };
        outcomes.push(outcome);
        pb.inc(1);
    }
    pb.finish_and_clear();

    let report = aggregator.collect(plan.skipped, outcomes);

    let written = if args.dry_run || report.dataset.years.is_empty() {
        None
    } else {
        let dir = args
            .output_dir
            .clone()
            .unwrap_or_else(|| config.output.data_dir.clone());
        let path = report.dataset.write_to_dir(&dir)?;
        debug!("Wrote dataset to {}", path.display());
        Some(path)
    };

    if let Some(path) = &args.summary {
        write_summary(path, &args.institution, &report)?;
    }

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_report(&report, written.as_deref(), args.dry_run, start),
    }

    if let Some(path) = &args.summary {
        eprintln!("{} Summary written to {}", style("✓").green(), path.display());
    }

    Ok(())
}

/// PDF and text documents directly inside `dir`, sorted by path.
fn discover(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for extension in ["pdf", "PDF", "txt"] {
        let pattern = dir.join(format!("*.{}", extension));
        let pattern = pattern
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("Non UTF-8 source path: {}", dir.display()))?;
        files.extend(glob(pattern)?.filter_map(|r| r.ok()));
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn status_style(status: &FieldStatus) -> console::StyledObject<String> {
    let label = format!("{:<11}", status.label());
    match status {
        FieldStatus::Extracted { .. } => style(label).green(),
        FieldStatus::Derived => style(label).cyan(),
        FieldStatus::Overridden { .. } => style(label).magenta(),
        FieldStatus::Missing => style(label).yellow(),
    }
}

fn field_detail(entry: &FieldEntry) -> String {
    match &entry.status {
        FieldStatus::Extracted { rule } => rule.clone(),
        FieldStatus::Overridden { note: Some(note) } => note.clone(),
        _ => String::new(),
    }
}

/// Print the field table and issues of one year.
pub fn print_year(year: &YearReport) {
    println!();
    println!(
        "{} {}",
        style(&year.year).bold(),
        style(file_name(&year.path)).dim()
    );
    for entry in &year.fields {
        println!(
            "  {} {:<42} {}",
            status_style(&entry.status),
            entry.field,
            style(field_detail(entry)).dim()
        );
    }
    print_issues(year.issues.iter().filter(|i| !matches!(i, ExtractionIssue::MissingField { .. })));
}

fn print_issues<'a>(issues: impl Iterator<Item = &'a ExtractionIssue>) {
    for issue in issues {
        println!("  {} {}", style("!").yellow(), issue);
    }
}

fn print_report(report: &RunReport, written: Option<&Path>, dry_run: bool, start: Instant) {
    for year in &report.years {
        print_year(year);
    }

    if !report.issues.is_empty() {
        println!();
        println!("{}", style("Skipped documents:").red());
        for issue in &report.issues {
            println!("  - {}", issue);
        }
    }

    let mut totals = [0usize; 4];
    for year in &report.years {
        for (total, count) in totals.iter_mut().zip(year.status_counts()) {
            *total += count;
        }
    }

    println!();
    println!(
        "{} {} years for {} in {:?}",
        style("✓").green(),
        report.dataset.years.len(),
        report.dataset.name,
        start.elapsed()
    );
    println!(
        "   {} extracted, {} derived, {} overridden, {} missing, {} issues",
        style(totals[0]).green(),
        style(totals[1]).cyan(),
        style(totals[2]).magenta(),
        style(totals[3]).yellow(),
        report.all_issues().count()
    );
    match written {
        Some(path) => println!("{} Dataset written to {}", style("✓").green(), path.display()),
        None if dry_run => println!("{} Dry run, nothing written", style("ℹ").blue()),
        None => println!("{} No years extracted, nothing written", style("ℹ").blue()),
    }
}

fn write_summary(path: &Path, institution: &str, report: &RunReport) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record(["institution", "year", "document", "field", "status", "detail"])?;

    for year in &report.years {
        for entry in &year.fields {
            wtr.write_record([
                institution,
                &year.year,
                file_name(&year.path),
                entry.field,
                entry.status.label(),
                &field_detail(entry),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}
