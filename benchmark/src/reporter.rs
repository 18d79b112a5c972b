// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Report generation for benchmark results.
//!
//! One harness run writes, into a single results directory:
//! - `results.json`: the structured report
//! - `results.md`: a markdown table, one row per project
//! - `<project>_entries.txt`: embedded archive entry names, when any were found
//! - `<project>_embed.log`: stdout and stderr of the embed command
//!
//! Each run overwrites the previous files; nothing is merged.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crucible_bench_core::ProjectResult;
use thiserror::Error;

use crate::metrics::{format_secs, BenchmarkReport, SuccessMark, MISSING};

/// Structured report file name.
pub const JSON_REPORT: &str = "results.json";
/// Tabular summary file name.
pub const MARKDOWN_REPORT: &str = "results.md";

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReporterError {
    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Files produced by one [`ReportWriter::write`] call.
#[derive(Debug, Clone, Default)]
pub struct ReportPaths {
    pub json: PathBuf,
    pub markdown: PathBuf,
    pub entry_listings: Vec<PathBuf>,
}

/// Writes benchmark reports into one output directory.
pub struct ReportWriter {
    /// Output directory for report files
    output_dir: PathBuf,
}

impl ReportWriter {
    /// Create a writer, creating the output directory if needed.
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self, ReporterError> {
        let output_dir = output_dir.as_ref().to_path_buf();
        fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write the structured report, the markdown table and entry listings.
    pub fn write(&self, report: &BenchmarkReport) -> Result<ReportPaths, ReporterError> {
        let json = self.output_dir.join(JSON_REPORT);
        let mut writer = BufWriter::new(File::create(&json)?);
        serde_json::to_writer_pretty(&mut writer, report)?;
        writer.flush()?;

        let markdown = self.output_dir.join(MARKDOWN_REPORT);
        fs::write(&markdown, render_markdown(report))?;

        let mut entry_listings = Vec::new();
        for record in &report.projects {
            let path = self.output_dir.join(format!("{}_entries.txt", record.project));
            if record.entries.is_empty() {
                remove_stale(&path)?;
                continue;
            }
            let mut listing = record.entries.join("\n");
            listing.push('\n');
            fs::write(&path, listing)?;
            entry_listings.push(path);
        }

        tracing::debug!(
            json = %json.display(),
            markdown = %markdown.display(),
            listings = entry_listings.len(),
            "Report written"
        );

        Ok(ReportPaths {
            json,
            markdown,
            entry_listings,
        })
    }

    /// Persist embed command output for every project that got that far.
    pub fn write_embed_logs(
        &self,
        results: &[ProjectResult],
    ) -> Result<Vec<PathBuf>, ReporterError> {
        let mut paths = Vec::new();
        for result in results {
            let path = self.output_dir.join(format!("{}_embed.log", result.project));
            let Some(embed) = &result.embed else {
                remove_stale(&path)?;
                continue;
            };
            let log = format!(
                "exit code: {}\nduration: {:.3}s\n\n--- stdout ---\n{}\n--- stderr ---\n{}\n",
                embed.exit_code,
                embed.duration_secs(),
                embed.stdout,
                embed.stderr
            );
            fs::write(&path, log)?;
            paths.push(path);
        }
        Ok(paths)
    }

    /// Load a structured report written by [`ReportWriter::write`].
    pub fn load(path: impl AsRef<Path>) -> Result<BenchmarkReport, ReporterError> {
        let file = File::open(path)?;
        let report = serde_json::from_reader(file)?;
        Ok(report)
    }
}

/// Remove a side file left by an earlier run.
fn remove_stale(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Render the markdown summary table.
///
/// Columns: project, embed time, size, first run, second run, success.
/// Missing values are rendered as a placeholder.
pub fn render_markdown(report: &BenchmarkReport) -> String {
    let mut lines = vec![
        "# Crucible Bench Results".to_string(),
        String::new(),
        format!(
            "Generated {} on {} {} ({} cores), tool `{}`",
            report.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            report.system_info.os,
            report.system_info.os_version,
            report.system_info.cpu_cores,
            report.tool.display()
        ),
        String::new(),
        "| Project | Embed Time (s) | Size (MB) | First Run (s) | Second Run (s) | Success |"
            .to_string(),
        "|---------|----------------|-----------|---------------|----------------|---------|"
            .to_string(),
    ];

    for record in &report.projects {
        let size = record
            .binary_size_mb
            .map_or_else(|| MISSING.to_string(), |mb| format!("{:.2}", mb));
        lines.push(format!(
            "| {} | {} | {} | {} | {} | {} |",
            record.project,
            format_secs(record.embed_time),
            size,
            format_secs(record.run_first_time),
            format_secs(record.run_second_time),
            SuccessMark(record.is_success())
        ));
    }

    let errors: Vec<_> = report
        .projects
        .iter()
        .filter_map(|r| r.error.as_ref().map(|e| (&r.project, e)))
        .collect();
    if !errors.is_empty() {
        lines.push(String::new());
        lines.push("## Errors".to_string());
        lines.push(String::new());
        for (project, error) in errors {
            lines.push(format!("- **{}**: {}", project, error));
        }
    }

    lines.push(String::new());
    lines.join("\n")
}
