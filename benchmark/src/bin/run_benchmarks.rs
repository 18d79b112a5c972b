// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! CLI tool to measure every configured project and write the reports.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use crucible_bench::{render_markdown, BenchmarkReport, ReportWriter};
use crucible_bench_core::{
    BenchmarkOrchestrator, ConfigLoader, HarnessOverrides, ProjectMeasurer,
};

#[derive(Parser)]
#[command(name = "run_benchmarks")]
#[command(
    author,
    version,
    about = "Benchmark a single-executable packaging tool over sample projects"
)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "crucible-bench.yaml")]
    config: PathBuf,

    /// Packaging tool to benchmark (overrides the configured one)
    #[arg(short, long)]
    tool: Option<PathBuf>,

    /// Results directory (overrides the configured one)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Only measure these projects (repeatable)
    #[arg(short, long)]
    project: Vec<String>,

    /// Per-command time limit in seconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Number of projects measured at once
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=64))]
    parallel: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .init();

    let mut config = ConfigLoader::load_file(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    config.retain_projects(&args.project)?;
    let cwd = std::env::current_dir().context("resolving current directory")?;
    config.harness.apply_overrides(&args.overrides()?, &cwd);

    let harness = &config.harness;
    tracing::info!(
        tool = %harness.tool.display(),
        projects = config.projects.len(),
        results_dir = %harness.results_dir.display(),
        max_parallel = harness.max_parallel,
        "Starting benchmark run"
    );

    let writer = ReportWriter::new(&harness.results_dir)?;
    let tool = harness.tool.clone();
    let max_parallel = harness.max_parallel;

    let orchestrator = BenchmarkOrchestrator::new(ProjectMeasurer::new(config.harness))
        .max_parallel(max_parallel);
    let results = orchestrator.run_all(&config.projects).await;

    let report = BenchmarkReport::from_results(tool, &results);
    let paths = writer.write(&report)?;
    writer.write_embed_logs(&results)?;

    println!("{}", render_markdown(&report));
    println!(
        "{}/{} projects succeeded",
        report.success_count(),
        report.projects.len()
    );
    println!("Report saved to: {}", paths.json.display());

    Ok(())
}

impl Args {
    /// Command-line values that win over the configuration file.
    fn overrides(&self) -> anyhow::Result<HarnessOverrides> {
        Ok(HarnessOverrides {
            tool: self.tool.clone(),
            results_dir: self.output.clone(),
            run_timeout: self.timeout.map(Duration::from_secs),
            max_parallel: self.parallel.map(usize::try_from).transpose()?,
        })
    }
}
