// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Crucible Bench
//!
//! Benchmark runner for single-executable packaging. Measures, per sample
//! project, how long the packaging tool takes to embed it, how large the
//! artifact is, what payload it carries, and how fast it starts cold and warm.
//!
//! # Data Output
//!
//! Every run writes `results.json` and `results.md` plus per-project side
//! files into the configured results directory.

pub mod metrics;
pub mod reporter;

pub use metrics::{BenchmarkReport, ProjectRecord, SystemInfo};
pub use reporter::{render_markdown, ReportPaths, ReportWriter, ReporterError};
