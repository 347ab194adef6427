//! Human-readable reports for a finished run.

use crate::orchestrator::{BusinessOutcome, ValidationMethod, ValidationRun};

/// Render the report matching the run's method.
pub fn render(run: &ValidationRun) -> String {
    match run.method_used {
        ValidationMethod::Character => [character_report(run), ranking(run)].join("\n"),
        ValidationMethod::Business => [business_report(run), ranking(run)].join("\n"),
        ValidationMethod::Both => [
            character_report(run),
            business_report(run),
            combined_section(run),
            ranking(run),
        ]
        .join("\n"),
    }
}

/// `0.8` as `80.0%`.
pub fn percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

/// Integer with comma thousands separators.
pub fn thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Per-file character accuracy with a field-by-field breakdown.
pub fn character_report(run: &ValidationRun) -> String {
    let mut lines = vec!["=== DETAILED CHARACTER-LEVEL KPI REPORT ===".to_string(), String::new()];

    lines.push("SUMMARY:".to_string());
    for (file_id, file) in &run.files {
        match (&file.character, &file.error) {
            (Some(r), _) => lines.push(format!(
                "  {}: {} ({}/{} chars, {} fields)",
                file_id,
                percent(r.overall_accuracy),
                thousands(r.correct_characters),
                thousands(r.total_characters),
                r.total_measured_fields
            )),
            (None, Some(error)) => lines.push(format!("  {}: FAILED ({})", file_id, error)),
            (None, None) => lines.push(format!("  {}: not scored", file_id)),
        }
    }
    lines.push(String::new());

    for (file_id, file) in &run.files {
        let Some(r) = &file.character else {
            continue;
        };

        lines.push(format!("--- {} DETAILED ANALYSIS ---", file_id));
        lines.push(format!("Overall Accuracy: {:.3}", r.overall_accuracy));
        lines.push(format!("Total Characters: {}", thousands(r.total_characters)));
        lines.push(format!("Correct Characters: {}", thousands(r.correct_characters)));
        lines.push(format!("Processed Lines: {}", r.processed_lines));
        lines.push(format!("Total Measured Fields: {}", r.total_measured_fields));
        if !r.skipped_lines.is_empty() {
            let skipped: Vec<String> = r.skipped_lines.iter().map(|s| s.line.to_string()).collect();
            lines.push(format!("Skipped Lines: {}", skipped.join(", ")));
        }
        lines.push(String::new());

        lines.push("Field-by-Field Breakdown (only measured fields):".to_string());
        if r.field_accuracies.is_empty() {
            lines.push("  No fields were measured (all reference fields were empty)".to_string());
        }
        for (field, acc) in &r.field_accuracies {
            lines.push(format!(
                "  {}: {:.3} ({}/{} chars in {} lines)",
                field, acc.accuracy, acc.correct_chars, acc.total_chars, acc.measured_in_lines
            ));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

/// Per-file business score, status and every issue found.
pub fn business_report(run: &ValidationRun) -> String {
    let mut lines = vec!["=== BUSINESS VALIDATION REPORT ===".to_string(), String::new()];

    let total = run.files.len();
    let successful = run.files.values().filter(|f| f.business_validation().is_some()).count();
    lines.push(format!("FILES PROCESSED: {}", total));
    lines.push(format!("SUCCESSFUL VALIDATIONS: {}", successful));
    lines.push(format!("FAILED VALIDATIONS: {}", total - successful));
    lines.push(String::new());

    for (file_id, file) in &run.files {
        lines.push(format!("--- {} ---", file_id));

        match (&file.business, &file.error) {
            (Some(BusinessOutcome::Validated(v)), _) => {
                lines.push(format!("Score: {}/100", v.report.score));
                lines.push(format!("Status: {}", v.report.status));
                lines.push(format!("Lines Validated: {}", v.lines_validated));
                if !v.dropped_lines.is_empty() {
                    let dropped: Vec<String> = v.dropped_lines.iter().map(i64::to_string).collect();
                    lines.push(format!("Dropped Lines: {}", dropped.join(", ")));
                }

                if v.report.issues.is_empty() {
                    lines.push("No issues found".to_string());
                } else {
                    lines.push(format!("Issues Found: {}", v.report.issues.len()));
                    for issue in &v.report.issues {
                        lines.push(format!("  [{}] {}: {}", issue.severity, issue.code, issue.message));
                    }
                }
            }
            (Some(BusinessOutcome::Failed { error }), _) | (None, Some(error)) => {
                lines.push(format!("FAILED: {}", error));
            }
            (None, None) => lines.push("FAILED: not validated".to_string()),
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

fn combined_section(run: &ValidationRun) -> String {
    let mut lines = vec!["=== COMBINED ANALYSIS ===".to_string(), String::new()];

    for (file_id, file) in &run.files {
        let character = file
            .character_accuracy()
            .map(percent)
            .unwrap_or_else(|| "-".to_string());
        let business = match (file.business_validation(), &file.business) {
            (Some(v), _) => format!("{}/100 {}", v.report.score, v.report.status),
            (None, Some(_)) => "FAILED".to_string(),
            (None, None) => "-".to_string(),
        };

        match file.combined_score {
            Some(score) => lines.push(format!(
                "  {}: combined {} (character {}, business {})",
                file_id,
                percent(score),
                character,
                business
            )),
            None => lines.push(format!(
                "  {}: character {}, business {}",
                file_id, character, business
            )),
        }
    }

    if let Some(summary) = &run.overall_summary {
        lines.push(String::new());
        lines.push(format!(
            "Average Character Accuracy: {}",
            percent(summary.average_character_accuracy)
        ));
        lines.push(format!(
            "Average Business Score: {}",
            percent(summary.average_business_score)
        ));
        lines.push(format!("Files Analyzed: {}", summary.files_analyzed));
    }
    lines.push(String::new());

    lines.join("\n")
}

fn ranking(run: &ValidationRun) -> String {
    let mut lines = vec!["RANKING:".to_string()];
    for entry in &run.ranking {
        let accuracy = entry.accuracy.map(percent).unwrap_or_else(|| "FAILED".to_string());
        lines.push(format!("  {}. {} ({})", entry.rank, entry.file_id, accuracy));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent() {
        assert_eq!(percent(0.8), "80.0%");
        assert_eq!(percent(1.0), "100.0%");
        assert_eq!(percent(0.0), "0.0%");
    }

    #[test]
    fn test_thousands() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1000), "1,000");
        assert_eq!(thousands(1234567), "1,234,567");
    }
}
