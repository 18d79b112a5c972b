// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Custom error types for the benchmark harness.
//!
//! All errors are explicit enum variants. Below the orchestrator every one of
//! them is turned into the `error` field of a project result; only
//! [`ValidationError`] and the configuration variants stop a run.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::state::MeasureState;

/// Top-level error type for the harness.
#[derive(Debug, Error)]
pub enum BenchError {
    // =========================================================================
    // Configuration Errors - the only fatal class
    // =========================================================================
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Configuration parse error: {message}")]
    ConfigParse { message: String },

    // =========================================================================
    // Measurement Errors - contained per project
    // =========================================================================
    #[error("{step} step: {source}")]
    Step {
        step: MeasureState,
        #[source]
        source: RunnerError,
    },

    #[error("prepare failed with exit code {exit_code}")]
    PrepareFailed { exit_code: i32 },

    #[error("artifact not found")]
    ArtifactNotFound,

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(#[from] StateTransitionError),

    // =========================================================================
    // System Errors
    // =========================================================================
    #[error("IO error: {context} - {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration validation errors. Any of these aborts the run before a
/// single project is measured.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {field} in {context}")]
    MissingRequiredField {
        field: &'static str,
        context: String,
    },

    #[error("Invalid field value: {field} = {value} - {reason}")]
    InvalidFieldValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Duplicate project name: {name}")]
    DuplicateProjectName { name: String },

    #[error("Unknown project requested: {name}")]
    UnknownProject { name: String },

    #[error("Schema validation failed: {message}")]
    SchemaValidation { message: String },
}

/// Errors from the command runner. A process that ran and exited non-zero is
/// not an error; these all mean the process never produced an exit status.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("empty command line")]
    EmptyCommand,

    #[error("working directory does not exist: {path}")]
    WorkingDirNotFound { path: PathBuf },

    #[error("failed to spawn {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for {program}: {source}")]
    WaitFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {}s", .limit.as_secs_f64())]
    TimedOut { program: String, limit: Duration },
}

/// State transition errors for the measurement state machine.
#[derive(Debug, Error)]
pub enum StateTransitionError {
    #[error("Cannot transition from {from} to {to} for project {project}")]
    InvalidTransition {
        project: String,
        from: &'static str,
        to: &'static str,
    },
}

/// Result type alias using BenchError.
pub type BenchResult<T> = Result<T, BenchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_not_found_message() {
        assert_eq!(
            BenchError::ArtifactNotFound.to_string(),
            "artifact not found"
        );
    }

    #[test]
    fn test_step_error_names_step() {
        let err = BenchError::Step {
            step: MeasureState::RunningFirst,
            source: RunnerError::TimedOut {
                program: "app".to_string(),
                limit: Duration::from_secs(2),
            },
        };
        let message = err.to_string();
        assert!(message.contains("running_first"));
        assert!(message.contains("timed out after 2s"));
    }

    #[test]
    fn test_error_chain() {
        let validation_err = ValidationError::DuplicateProjectName {
            name: "flask_app".to_string(),
        };
        let bench_err: BenchError = validation_err.into();
        assert!(matches!(bench_err, BenchError::Validation(_)));
        assert!(bench_err.to_string().contains("flask_app"));
    }
}
