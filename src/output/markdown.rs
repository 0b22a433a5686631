//! Markdown crawl summary
//!
//! Writes a human-readable summary of a crawl run, suitable for attaching to
//! a scheduled job's artifacts.

use crate::output::report::CrawlReport;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the markdown summary of `report` to `output_path`
///
/// # Arguments
///
/// * `report` - The finished crawl report
/// * `config_hash` - Hash of the configuration the crawl ran with
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(std::io::Error)` - Failed to write summary
pub fn generate_markdown_summary(
    report: &CrawlReport,
    config_hash: &str,
    output_path: &Path,
) -> std::io::Result<()> {
    let markdown = format_markdown_summary(report, config_hash);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl report as markdown
pub fn format_markdown_summary(report: &CrawlReport, config_hash: &str) -> String {
    let mut md = String::new();

    md.push_str("# Documentation Crawl Summary\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Started**: {}\n", report.started_at.to_rfc3339()));
    if let Some(finished) = report.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished.to_rfc3339()));
    }
    if let Some(duration) = report.duration_seconds() {
        md.push_str(&format!(
            "- **Duration**: {} seconds ({:.2} minutes)\n",
            duration,
            duration as f64 / 60.0
        ));
    }
    md.push_str(&format!("- **Config Hash**: {}\n\n", config_hash));

    md.push_str("## Results\n\n");
    md.push_str("| Outcome | Count |\n");
    md.push_str("|---------|-------|\n");
    md.push_str(&format!("| Targets | {} |\n", report.targets));
    md.push_str(&format!("| Fetched | {} |\n", report.succeeded));
    md.push_str(&format!("| Failed | {} |\n", report.failed));
    md.push_str(&format!("| Not attempted | {} |\n", report.skipped()));
    md.push_str(&format!("| Storage errors | {} |\n", report.sink_errors));
    md.push_str(&format!("| Fetch attempts | {} |\n\n", report.total_attempts));
    md.push_str(&format!(
        "**Success Rate**: {:.2}%\n\n",
        report.success_rate()
    ));

    if !report.failures_by_kind.is_empty() {
        md.push_str("## Failures by Kind\n\n");
        let mut kinds: Vec<_> = report.failures_by_kind.iter().collect();
        kinds.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.to_string().cmp(&b.0.to_string())));
        for (kind, count) in kinds {
            md.push_str(&format!("- **{}**: {}\n", kind, count));
        }
        md.push('\n');
    }

    if !report.errors.is_empty() {
        if report.errors_truncated() {
            md.push_str(&format!(
                "## Errors (first {} of {})\n\n",
                report.errors.len(),
                report.failed
            ));
        } else {
            md.push_str("## Errors\n\n");
        }
        for error in &report.errors {
            md.push_str(&format!("- `{}`\n", error));
        }
        md.push('\n');
    }

    md
}
