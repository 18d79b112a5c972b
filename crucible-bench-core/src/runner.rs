// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! External process execution.
//!
//! Spawns a command in a working directory, waits for it, and captures
//! stdout, stderr, exit status and wall time. A process that never ran is a
//! [`RunnerError`]; a process that ran and failed is a [`RunRecord`] with a
//! non-zero exit code.

use std::ffi::OsStr;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::error::RunnerError;

/// Exit code recorded for a process terminated by a signal.
pub const SIGNALED_EXIT_CODE: i32 = -1;

/// Outcome of one completed process run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Wall time from just before spawn to just after exit.
    #[serde(rename = "duration_secs", with = "duration_secs")]
    pub duration: Duration,
    /// Process exit code, or [`SIGNALED_EXIT_CODE`] when killed by a signal.
    pub exit_code: i32,
    /// Terminating signal on unix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl RunRecord {
    /// Whether the process exited with code 0.
    pub fn success(&self) -> bool {
        self.exit_code == 0 && self.signal.is_none()
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration.as_secs_f64()
    }
}

/// Run `argv` in `working_dir` and wait for it to exit.
///
/// No timeout is applied here; callers that need one wrap the returned
/// future. The child is killed if the future is dropped before completion.
///
/// # Errors
/// Returns RunnerError if the argv is empty, the working directory is
/// missing, or the process could not be spawned or waited on.
pub async fn run<S: AsRef<OsStr>>(
    argv: &[S],
    working_dir: &Path,
) -> Result<RunRecord, RunnerError> {
    let (program, args) = argv.split_first().ok_or(RunnerError::EmptyCommand)?;
    let program_name = program.as_ref().to_string_lossy().into_owned();

    if !working_dir.is_dir() {
        return Err(RunnerError::WorkingDirNotFound {
            path: working_dir.to_path_buf(),
        });
    }

    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let start = Instant::now();
    let child = command.spawn().map_err(|source| RunnerError::SpawnFailed {
        program: program_name.clone(),
        source,
    })?;
    let pid = child.id();

    let output = child
        .wait_with_output()
        .await
        .map_err(|source| RunnerError::WaitFailed {
            program: program_name.clone(),
            source,
        })?;
    let duration = start.elapsed();

    let (exit_code, signal) = exit_details(output.status);

    tracing::debug!(
        program = %program_name,
        pid = pid,
        exit_code = exit_code,
        elapsed_ms = duration.as_millis() as u64,
        "Process exited"
    );

    Ok(RunRecord {
        duration,
        exit_code,
        signal,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

#[cfg(unix)]
fn exit_details(status: ExitStatus) -> (i32, Option<i32>) {
    use std::os::unix::process::ExitStatusExt;
    match status.code() {
        Some(code) => (code, None),
        None => (SIGNALED_EXIT_CODE, status.signal()),
    }
}

#[cfg(not(unix))]
fn exit_details(status: ExitStatus) -> (i32, Option<i32>) {
    (status.code().unwrap_or(SIGNALED_EXIT_CODE), None)
}

/// Serialize a Duration as float seconds.
pub(crate) mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_captures_stdout_and_exit_code() {
        let dir = TempDir::new().unwrap();
        let record = run(&["sh", "-c", "echo hello; echo oops >&2"], dir.path())
            .await
            .unwrap();

        assert!(record.success());
        assert_eq!(record.stdout, "hello\n");
        assert_eq!(record.stderr, "oops\n");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_a_record() {
        let dir = TempDir::new().unwrap();
        let record = run(&["sh", "-c", "exit 3"], dir.path()).await.unwrap();

        assert!(!record.success());
        assert_eq!(record.exit_code, 3);
        assert!(record.signal.is_none());
    }

    #[tokio::test]
    async fn test_runs_in_working_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "here").unwrap();

        let record = run(&["cat", "marker.txt"], dir.path()).await.unwrap();
        assert_eq!(record.stdout, "here");
    }

    #[tokio::test]
    async fn test_spawn_failure_is_distinct() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("no-such-tool");

        let err = run(&[missing.as_os_str()], dir.path()).await.unwrap_err();
        assert!(matches!(err, RunnerError::SpawnFailed { .. }));
    }

    #[tokio::test]
    async fn test_missing_working_dir() {
        let dir = TempDir::new().unwrap();
        let err = run(&["true"], &dir.path().join("gone")).await.unwrap_err();
        assert!(matches!(err, RunnerError::WorkingDirNotFound { .. }));
    }

    #[tokio::test]
    async fn test_empty_argv() {
        let dir = TempDir::new().unwrap();
        let argv: [&str; 0] = [];
        let err = run(&argv, dir.path()).await.unwrap_err();
        assert!(matches!(err, RunnerError::EmptyCommand));
    }

    #[tokio::test]
    async fn test_signal_is_recorded() {
        let dir = TempDir::new().unwrap();
        let record = run(&["sh", "-c", "kill -9 $$"], dir.path()).await.unwrap();

        assert!(!record.success());
        assert_eq!(record.exit_code, SIGNALED_EXIT_CODE);
        assert_eq!(record.signal, Some(9));
    }

    #[tokio::test]
    async fn test_duration_covers_process_lifetime() {
        let dir = TempDir::new().unwrap();
        let record = run(&["sleep", "0.2"], dir.path()).await.unwrap();
        assert!(record.duration >= Duration::from_millis(200));
    }

    #[test]
    fn test_record_serializes_seconds() {
        let record = RunRecord {
            duration: Duration::from_millis(1500),
            exit_code: 0,
            signal: None,
            stdout: String::new(),
            stderr: String::new(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["duration_secs"], 1.5);
        assert!(json.get("signal").is_none());

        let back: RunRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
