// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Artifact naming and location.
//!
//! Every embed invocation gets a fresh output path so a stale artifact from an
//! earlier run is never taken for the current one. After the packaging tool
//! returns, [`locate`] decides which file on disk is the artifact.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use crate::types::ProjectName;

/// Allocates collision-free artifact paths.
///
/// Paths look like `<root>/<project>/<project>-<run id>-<seq>`. The run id is
/// unique per namer and the sequence number is unique per call, so two
/// invocations never share a path, across runs or within one.
#[derive(Debug)]
pub struct ArtifactNamer {
    root: PathBuf,
    run_id: String,
    next_seq: AtomicU64,
}

impl ArtifactNamer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let run_id = uuid::Uuid::new_v4().simple().to_string();
        Self::with_run_id(root, run_id[..8].to_string())
    }

    /// Namer with a caller-chosen run id.
    pub fn with_run_id(root: impl Into<PathBuf>, run_id: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            run_id: run_id.into(),
            next_seq: AtomicU64::new(1),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Directory holding every artifact of `project`.
    pub fn project_dir(&self, project: &ProjectName) -> PathBuf {
        self.root.join(project.as_str())
    }

    /// Allocate the next output path for `project`.
    pub fn next_path(&self, project: &ProjectName) -> PathBuf {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let file_name = format!(
            "{}-{}-{:04}{}",
            project,
            self.run_id,
            seq,
            std::env::consts::EXE_SUFFIX
        );
        self.project_dir(project).join(file_name)
    }
}

/// Resolve the artifact produced by an embed run.
///
/// `expected` is authoritative when it exists. Otherwise the most recently
/// modified regular file directly inside `search_dir` is returned, ties broken
/// by the lexicographically greatest file name. `None` when neither yields a
/// candidate.
pub fn locate(expected: &Path, search_dir: &Path) -> Option<PathBuf> {
    if expected.is_file() {
        return Some(expected.to_path_buf());
    }

    let entries = match fs::read_dir(search_dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(
                search_dir = %search_dir.display(),
                error = %e,
                "Fallback directory unreadable"
            );
            return None;
        }
    };

    let mut best: Option<(SystemTime, PathBuf)> = None;
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(metadata) = fs::metadata(&path) else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);

        let newer = match &best {
            None => true,
            Some((best_time, best_path)) => {
                (modified, path.file_name()) > (*best_time, best_path.file_name())
            }
        };
        if newer {
            best = Some((modified, path));
        }
    }

    if let Some((_, path)) = &best {
        tracing::warn!(
            expected = %expected.display(),
            found = %path.display(),
            "Artifact missing at expected path, using fallback"
        );
    }

    best.map(|(_, path)| path)
}
