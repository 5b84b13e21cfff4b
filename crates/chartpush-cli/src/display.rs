//! Run summary output

use console::style;
use std::path::Path;

use chartpush_registry::UploadStatus;

use crate::pipeline::RunSummary;
use crate::util::{format_size, short_digest};

fn archive_size(path: &Path) -> String {
    std::fs::metadata(path)
        .map(|m| format_size(m.len()))
        .unwrap_or_else(|_| "?".to_string())
}

/// Print what the run selected, packaged and uploaded
pub fn print_summary(summary: &RunSummary) {
    println!(
        "{} {} chart(s) ({} mode)",
        style("Selected").cyan().bold(),
        summary.candidates.len(),
        summary.mode
    );

    for artifact in &summary.packaging.artifacts {
        println!(
            "  {} {} {} {} {}",
            style("Packaged").green().bold(),
            artifact.name,
            artifact.version,
            style(archive_size(&artifact.archive)).dim(),
            style(short_digest(&artifact.digest, 12)).dim()
        );
    }
    for skipped in &summary.packaging.skipped {
        println!(
            "  {} {} (not a chart)",
            style("Skipped").dim(),
            skipped.display()
        );
    }
    for (candidate, error) in &summary.packaging.failed {
        println!(
            "  {} {}: {}",
            style("Failed").red().bold(),
            candidate.display(),
            error
        );
    }

    let Some(uploads) = &summary.uploads else {
        return;
    };

    println!();
    for result in &uploads.results {
        let name = format!("{} {}", result.artifact.name, result.artifact.version);
        match &result.status {
            UploadStatus::Uploaded(response) => {
                println!("  {} {} ({})", style("Uploaded").green().bold(), name, response.status)
            }
            UploadStatus::Rejected { status, message } => println!(
                "  {} {}: {} {}",
                style("Rejected").red().bold(),
                name,
                status,
                message
            ),
            UploadStatus::Failed(message) => {
                println!("  {} {}: {}", style("Failed").red().bold(), name, message)
            }
            UploadStatus::Skipped => println!("  {} {}", style("Skipped").dim(), name),
        }
    }

    let status = if uploads.has_failures() {
        style("Done with errors").yellow().bold()
    } else {
        style("Done").green().bold()
    };
    println!(
        "\n{} {}/{} uploaded",
        status,
        uploads.uploaded(),
        uploads.results.len()
    );
}
