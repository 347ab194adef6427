//! Template command - emit a blank reference skeleton for the given files.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::warn;

use invcheck_core::{load_record_set, ReferenceTemplate};

use super::expand_inputs;

/// Arguments for the template command.
#[derive(Args)]
pub struct TemplateArgs {
    /// Extracted invoice JSON files or glob patterns
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Write the template here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub async fn run(args: TemplateArgs) -> anyhow::Result<()> {
    let files = expand_inputs(&args.inputs)?;

    let mut loaded = Vec::with_capacity(files.len());
    for path in &files {
        match load_record_set(path) {
            Ok(records) => loaded.push(records),
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }

    if loaded.is_empty() {
        anyhow::bail!("None of the {} input files could be read", files.len());
    }

    let template = ReferenceTemplate::from_candidates(&loaded);
    let content = serde_json::to_string_pretty(&template.to_json())?;

    match &args.output {
        Some(path) => {
            fs::write(path, content)?;
            println!(
                "{} Template with {} lines and {} fields written to {}",
                style("✓").green(),
                template.lines.len(),
                template.fields.len(),
                path.display()
            );
        }
        None => println!("{}", content),
    }

    Ok(())
}
