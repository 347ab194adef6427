//! Validate command - score extracted invoices against a reference and the business rules.

use std::path::PathBuf;
use std::time::Instant;

use clap::{Args, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};

use invcheck_core::orchestrator::CombinedReport;
use invcheck_core::report::text::percent;
use invcheck_core::{
    file_ids, load_record_set, ReportExporter, RunObserver, ValidationMethod,
    ValidationOrchestrator, ValidationRun,
};

use super::config::{default_config_path, load_or_default};
use super::expand_inputs;

/// Arguments for the validate command.
#[derive(Args)]
pub struct ValidateArgs {
    /// Extracted invoice JSON files or glob patterns
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Reference (ground truth) JSON file
    #[arg(short, long)]
    reference: Option<PathBuf>,

    /// Validation method
    #[arg(short, long, value_enum, default_value = "character")]
    method: MethodArg,

    /// Write the full JSON report to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write every business rule issue to this CSV file
    #[arg(long)]
    issues_csv: Option<PathBuf>,

    /// Write every business rule issue to this JSON file
    #[arg(long)]
    issues_json: Option<PathBuf>,

    /// Write a per-file summary CSV
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Print only the ranking, not the detailed report
    #[arg(short, long)]
    quiet: bool,
}

/// Validation method selector.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum MethodArg {
    /// Character accuracy against the reference
    Character,
    /// Business arithmetic rules
    Business,
    /// Both methods and a combined score
    Both,
}

impl From<MethodArg> for ValidationMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Character => ValidationMethod::Character,
            MethodArg::Business => ValidationMethod::Business,
            MethodArg::Both => ValidationMethod::Both,
        }
    }
}

/// Drives the progress bar from orchestrator callbacks.
struct ProgressObserver {
    bar: ProgressBar,
}

impl RunObserver for ProgressObserver {
    fn on_file_completed(&self, report: &CombinedReport, _completed: usize, _total: usize) {
        self.bar.set_message(report.file_id.clone());
        self.bar.inc(1);
    }
}

pub async fn run(args: ValidateArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config_file = config_path.map(PathBuf::from).unwrap_or_else(default_config_path);
    let config = load_or_default(&config_file)?;

    let method = ValidationMethod::from(args.method);
    let files = expand_inputs(&args.inputs)?;

    if !args.quiet {
        println!(
            "{} Found {} files to validate ({})",
            style("ℹ").blue(),
            files.len(),
            method
        );
    }

    let mut orchestrator = ValidationOrchestrator::new(config).with_method(method);

    if let Some(reference_path) = &args.reference {
        let reference = load_record_set(reference_path).map_err(|e| {
            anyhow::anyhow!("Failed to load reference {}: {}", reference_path.display(), e)
        })?;
        orchestrator.load_reference(reference)?;
    } else if method.requires_reference() {
        anyhow::bail!("{} validation requires --reference", method);
    }

    for (path, id) in files.iter().zip(file_ids(&files)) {
        match load_record_set(path) {
            Ok(records) => orchestrator.load_candidate(id, records)?,
            Err(e) => {
                warn!("Failed to load {}: {}", path.display(), e);
                orchestrator.record_input_failure(id, e)?;
            }
        }
    }

    orchestrator.can_run()?;

    let bar = if args.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(files.len() as u64)
    };
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")
            .unwrap()
            .progress_chars("=>-"),
    );

    let observer = ProgressObserver { bar: bar.clone() };
    let run = tokio::task::spawn_blocking(move || orchestrator.run_with_observer(&observer)).await??;
    bar.finish_and_clear();

    if !args.quiet {
        println!("{}", run.detailed_report);
    }

    write_exports(&args, &run)?;
    print_summary(&run, start);

    Ok(())
}

fn write_exports(args: &ValidateArgs, run: &ValidationRun) -> anyhow::Result<()> {
    if let Some(path) = &args.output {
        ReportExporter::write_json(run, path)?;
        println!("{} Results written to {}", style("✓").green(), path.display());
    }

    if let Some(path) = &args.issues_csv {
        let count = ReportExporter::write_issues_csv_file(run, path)?;
        println!(
            "{} {} issues written to {}",
            style("✓").green(),
            count,
            path.display()
        );
    }

    if let Some(path) = &args.issues_json {
        let count = ReportExporter::write_issues_json(run, path)?;
        debug!("{} issues written to {}", count, path.display());
        println!("{} Issues written to {}", style("✓").green(), path.display());
    }

    if let Some(path) = &args.summary {
        let file = std::fs::File::create(path)?;
        ReportExporter::write_summary_csv(run, file)?;
        println!("{} Summary written to {}", style("✓").green(), path.display());
    }

    Ok(())
}

fn print_summary(run: &ValidationRun, start: Instant) {
    let failed: Vec<&CombinedReport> = run.files.values().filter(|f| f.is_failed()).collect();

    println!();
    println!(
        "{} Validated {} files in {:?}",
        style("✓").green(),
        run.files_processed,
        start.elapsed()
    );
    println!(
        "   {} scored, {} failed",
        style(run.files_processed - failed.len()).green(),
        style(failed.len()).red()
    );

    for entry in &run.ranking {
        let accuracy = match entry.accuracy {
            Some(a) => style(percent(a)).cyan(),
            None => style("FAILED".to_string()).red(),
        };
        println!("  {}. {} {}", entry.rank, entry.file_id, accuracy);
    }

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for file in &failed {
            let reason = file
                .error
                .as_deref()
                .or_else(|| file.business_error())
                .unwrap_or("unknown error");
            println!("  - {}: {}", file.file_id, reason);
        }
    }
}
