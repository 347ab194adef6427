//! CLI subcommands.

pub mod config;
pub mod template;
pub mod validate;

use std::path::PathBuf;

use glob::glob;
use tracing::debug;

/// Expand input arguments into candidate paths.
///
/// Glob patterns keep only `.json` matches. A plain path is kept even when it
/// does not exist so that it gets an explicit failed result later.
pub fn expand_inputs(patterns: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let is_glob = pattern.contains(['*', '?', '[']);
        if !is_glob {
            push_unique(&mut files, PathBuf::from(pattern));
            continue;
        }

        let matches: Vec<PathBuf> = glob(pattern)?
            .filter_map(|r| r.ok())
            .filter(|p| {
                let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
                ext.eq_ignore_ascii_case("json")
            })
            .collect();
        debug!("Pattern {} matched {} files", pattern, matches.len());

        for path in matches {
            push_unique(&mut files, path);
        }
    }

    if files.is_empty() {
        anyhow::bail!("No matching files found for: {}", patterns.join(" "));
    }

    Ok(files)
}

fn push_unique(files: &mut Vec<PathBuf>, path: PathBuf) {
    if !files.contains(&path) {
        files.push(path);
    }
}
