// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Crucible Bench Core Library
//!
//! Measurement protocol for single-executable packaging benchmarks.
//! Drives an external packaging tool over sample projects, locates and
//! inspects each produced artifact, and times a cold and a warm execution.
//!
//! # Components
//!
//! - **runner**: spawn a process, capture output, exit status and wall time
//! - **locator**: collision-free artifact paths and artifact resolution
//! - **introspect**: find and open the ZIP payload inside an executable
//! - **measurer**: the per-project state machine
//! - **orchestrator**: ordered, failure-isolated measurement of all projects

pub mod config;
pub mod error;
pub mod introspect;
pub mod locator;
pub mod measurer;
pub mod orchestrator;
pub mod result;
pub mod runner;
pub mod state;
pub mod types;

// Re-export commonly used types
pub use config::{Config, ConfigLoader, HarnessConfig, HarnessOverrides};
pub use error::{BenchError, BenchResult, RunnerError, ValidationError};
pub use introspect::{find_signature, inspect, introspect, Introspection};
pub use locator::{locate, ArtifactNamer};
pub use measurer::{Measure, ProjectMeasurer};
pub use orchestrator::BenchmarkOrchestrator;
pub use result::{ArtifactInfo, ProjectResult};
pub use runner::RunRecord;
pub use state::{MeasureState, MeasureStateMachine};
pub use types::{CommandLine, ProjectName, ProjectSpec};
