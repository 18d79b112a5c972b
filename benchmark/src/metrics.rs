// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Report record types for benchmark results.
//!
//! A [`BenchmarkReport`] is the persisted form of one harness run: host
//! information plus one flat [`ProjectRecord`] per project, keyed by project
//! name in configuration order.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use crucible_bench_core::{ProjectResult, RunRecord};
use serde::{Deserialize, Serialize};
use sysinfo::System;

/// Placeholder written for fields a project never reached.
pub const MISSING: &str = "?";

/// System information captured at benchmark time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    /// Operating system name
    pub os: String,
    /// OS version
    pub os_version: String,
    /// Kernel version (Linux)
    pub kernel_version: Option<String>,
    /// CPU model name
    pub cpu_model: String,
    /// Number of CPU cores
    pub cpu_cores: usize,
    /// Total system memory in bytes
    pub memory_bytes: u64,
    /// Hostname
    pub hostname: String,
}

impl SystemInfo {
    /// Collect current system information.
    pub fn collect() -> Self {
        let mut sys = System::new_all();
        sys.refresh_all();

        Self {
            os: System::name().unwrap_or_else(|| "Unknown".to_string()),
            os_version: System::os_version().unwrap_or_else(|| "Unknown".to_string()),
            kernel_version: System::kernel_version(),
            cpu_model: sys
                .cpus()
                .first()
                .map(|cpu| cpu.brand().to_string())
                .unwrap_or_else(|| "Unknown".to_string()),
            cpu_cores: sys.cpus().len(),
            memory_bytes: sys.total_memory(),
            hostname: System::host_name().unwrap_or_else(|| "Unknown".to_string()),
        }
    }
}

/// Flat, report-friendly view of one project result.
///
/// Durations are seconds. Fields for steps the project never reached are
/// `None` and serialize as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    /// Map key in the persisted report, not a field.
    #[serde(skip)]
    pub project: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prepare_time: Option<f64>,
    pub embed_time: Option<f64>,
    pub embed_exit_code: Option<i32>,
    pub embed_success: bool,
    pub binary_path: Option<PathBuf>,
    pub binary_size_bytes: Option<u64>,
    pub binary_size_mb: Option<f64>,
    pub content_hash: Option<String>,
    #[serde(default)]
    pub entries: Vec<String>,
    pub run_first_time: Option<f64>,
    pub run_first_exit_code: Option<i32>,
    pub run_first_success: Option<bool>,
    pub run_second_time: Option<f64>,
    pub run_second_exit_code: Option<i32>,
    pub run_second_success: Option<bool>,
    pub error: Option<String>,
}

impl ProjectRecord {
    /// No error, embed succeeded and both runs exited 0.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
            && self.embed_success
            && self.run_first_success == Some(true)
            && self.run_second_success == Some(true)
    }
}

impl From<&ProjectResult> for ProjectRecord {
    fn from(result: &ProjectResult) -> Self {
        let artifact = result.artifact.as_ref();
        Self {
            project: result.project.to_string(),
            prepare_time: result.prepare.as_ref().map(RunRecord::duration_secs),
            embed_time: result.embed.as_ref().map(RunRecord::duration_secs),
            embed_exit_code: result.embed.as_ref().map(|r| r.exit_code),
            embed_success: result.embed_success(),
            binary_path: artifact.map(|a| a.path.clone()),
            binary_size_bytes: artifact.map(|a| a.size_bytes),
            binary_size_mb: artifact.map(|a| a.size_mb()),
            content_hash: artifact.map(|a| a.content_hash.clone()),
            entries: artifact.map(|a| a.entry_names.clone()).unwrap_or_default(),
            run_first_time: result.first_run.as_ref().map(RunRecord::duration_secs),
            run_first_exit_code: result.first_run.as_ref().map(|r| r.exit_code),
            run_first_success: result.first_run.as_ref().map(RunRecord::success),
            run_second_time: result.second_run.as_ref().map(RunRecord::duration_secs),
            run_second_exit_code: result.second_run.as_ref().map(|r| r.exit_code),
            run_second_success: result.second_run.as_ref().map(RunRecord::success),
            error: result.error.clone(),
        }
    }
}

/// Complete report of one harness run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    /// Suite identifier
    pub benchmark_suite: String,
    /// Harness version
    pub version: String,
    /// Timestamp when the run started reporting
    pub timestamp: DateTime<Utc>,
    /// System information
    pub system_info: SystemInfo,
    /// Packaging tool that produced the artifacts
    pub tool: PathBuf,
    /// Per-project records keyed by project name, in configuration order
    #[serde(with = "records_by_project")]
    pub projects: Vec<ProjectRecord>,
}

impl BenchmarkReport {
    /// Create an empty report for a run of `tool`.
    pub fn new(tool: impl Into<PathBuf>) -> Self {
        Self {
            benchmark_suite: "crucible-bench".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
            system_info: SystemInfo::collect(),
            tool: tool.into(),
            projects: Vec::new(),
        }
    }

    /// Create a report holding `results` in the given order.
    pub fn from_results(tool: impl Into<PathBuf>, results: &[ProjectResult]) -> Self {
        let mut report = Self::new(tool);
        for result in results {
            report.add_result(result);
        }
        report
    }

    /// Add a result to the report.
    pub fn add_result(&mut self, result: &ProjectResult) {
        self.projects.push(ProjectRecord::from(result));
    }

    /// Number of projects that fully succeeded.
    pub fn success_count(&self) -> usize {
        self.projects.iter().filter(|p| p.is_success()).count()
    }
}

/// Seconds with two decimals, or the placeholder.
pub fn format_secs(value: Option<f64>) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| format!("{:.2}", v))
}

/// Display adapter for a success flag in tables.
pub struct SuccessMark(pub bool);

impl fmt::Display for SuccessMark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.0 { "✅" } else { "❌" })
    }
}

/// Serialize records as a JSON object keyed by project name, keeping order.
mod records_by_project {
    use std::fmt;

    use serde::de::{MapAccess, Visitor};
    use serde::{Deserializer, Serializer};

    use super::ProjectRecord;

    pub fn serialize<S: Serializer>(
        records: &[ProjectRecord],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_map(records.iter().map(|r| (&r.project, r)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<ProjectRecord>, D::Error> {
        deserializer.deserialize_map(RecordsVisitor)
    }

    struct RecordsVisitor;

    impl<'de> Visitor<'de> for RecordsVisitor {
        type Value = Vec<ProjectRecord>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of project name to record")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut records = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((project, mut record)) = access.next_entry::<String, ProjectRecord>()? {
                record.project = project;
                records.push(record);
            }
            Ok(records)
        }
    }
}
