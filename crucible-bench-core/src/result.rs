// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Per-project measurement records.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::introspect::{introspect, Introspection};
use crate::runner::RunRecord;
use crate::types::ProjectName;

/// Facts about a located artifact, all derived from one byte snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactInfo {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Lowercase hex SHA-256 of the artifact bytes.
    pub content_hash: String,
    /// Entry names of the embedded archive, empty when none was found.
    pub entry_names: Vec<String>,
}

impl ArtifactInfo {
    /// Derive size, hash and entry names from the same in-memory bytes.
    pub fn from_bytes(path: impl Into<PathBuf>, bytes: &[u8]) -> Self {
        let path = path.into();
        let introspection = introspect(bytes);

        match &introspection {
            Introspection::NoSignature => {
                tracing::debug!(path = %path.display(), "No embedded archive signature");
            }
            Introspection::Malformed { offset, reason } => {
                tracing::warn!(
                    path = %path.display(),
                    offset = offset,
                    reason = %reason,
                    "Archive signature found but container unreadable"
                );
            }
            Introspection::Archive { offset, entries } => {
                tracing::debug!(
                    path = %path.display(),
                    offset = offset,
                    entries = entries.len(),
                    "Embedded archive opened"
                );
            }
        }

        Self {
            path,
            size_bytes: bytes.len() as u64,
            content_hash: content_hash(bytes),
            entry_names: introspection.into_entries(),
        }
    }

    /// Size in decimal megabytes.
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / 1_000_000.0
    }
}

/// Lowercase hex SHA-256 digest of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Outcome of measuring one project.
///
/// Exactly one of `artifact` and `error` is set. Use [`ProjectResult::completed`]
/// and [`ProjectResult::errored`] to build one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectResult {
    pub project: ProjectName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prepare: Option<RunRecord>,
    pub embed: Option<RunRecord>,
    pub artifact: Option<ArtifactInfo>,
    pub first_run: Option<RunRecord>,
    pub second_run: Option<RunRecord>,
    pub error: Option<String>,
}

impl ProjectResult {
    /// A measurement that went through both runs.
    pub fn completed(
        project: ProjectName,
        prepare: Option<RunRecord>,
        embed: RunRecord,
        artifact: ArtifactInfo,
        first_run: RunRecord,
        second_run: RunRecord,
    ) -> Self {
        Self {
            project,
            prepare,
            embed: Some(embed),
            artifact: Some(artifact),
            first_run: Some(first_run),
            second_run: Some(second_run),
            error: None,
        }
    }

    /// A measurement that stopped early. Records gathered before the failure
    /// (prepare, embed) are kept for diagnosis; artifact and runs are not.
    pub fn errored(
        project: ProjectName,
        prepare: Option<RunRecord>,
        embed: Option<RunRecord>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            project,
            prepare,
            embed,
            artifact: None,
            first_run: None,
            second_run: None,
            error: Some(error.into()),
        }
    }

    /// Embed command ran and exited 0.
    pub fn embed_success(&self) -> bool {
        self.embed.as_ref().is_some_and(RunRecord::success)
    }

    /// No error, embed succeeded and both runs exited 0.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
            && self.embed_success()
            && self.first_run.as_ref().is_some_and(RunRecord::success)
            && self.second_run.as_ref().is_some_and(RunRecord::success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn record(exit_code: i32) -> RunRecord {
        RunRecord {
            duration: Duration::from_millis(10),
            exit_code,
            signal: None,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    fn name() -> ProjectName {
        ProjectName::new("cowsay_app").unwrap()
    }

    #[test]
    fn test_artifact_info_single_snapshot() {
        let bytes = b"launcher bytes without payload";
        let info = ArtifactInfo::from_bytes("/tmp/app", bytes);

        assert_eq!(info.size_bytes, bytes.len() as u64);
        assert_eq!(info.content_hash, content_hash(bytes));
        assert_eq!(info.content_hash.len(), 64);
        assert!(info.entry_names.is_empty());
    }

    #[test]
    fn test_content_hash_known_value() {
        assert_eq!(
            content_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_completed_invariant() {
        let info = ArtifactInfo::from_bytes("/tmp/app", b"x");
        let result = ProjectResult::completed(name(), None, record(1), info, record(0), record(0));

        assert!(result.artifact.is_some());
        assert!(result.error.is_none());
        assert!(!result.embed_success());
        assert!(!result.is_success());
    }

    #[test]
    fn test_errored_invariant() {
        let result = ProjectResult::errored(name(), None, Some(record(0)), "artifact not found");

        assert!(result.artifact.is_none());
        assert!(result.first_run.is_none());
        assert!(result.second_run.is_none());
        assert_eq!(result.error.as_deref(), Some("artifact not found"));
        assert!(result.embed_success());
        assert!(!result.is_success());
    }

    #[test]
    fn test_size_mb() {
        let info = ArtifactInfo {
            path: PathBuf::from("/tmp/app"),
            size_bytes: 2_500_000,
            content_hash: String::new(),
            entry_names: Vec::new(),
        };
        assert!((info.size_mb() - 2.5).abs() < f64::EPSILON);
    }
}
