// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Per-project measurement protocol.
//!
//! One measurement walks the [`MeasureState`] machine:
//! allocate a fresh output path, run the optional prepare command, embed,
//! locate the artifact, read it once to derive size, hash and archive entries,
//! then execute it twice in strict sequence (cold, then warm).
//!
//! Every failure is returned as data on the [`ProjectResult`], never raised.

use std::ffi::{OsStr, OsString};
use std::future::Future;
use std::path::{Path, PathBuf};

use crate::config::HarnessConfig;
use crate::error::{BenchError, BenchResult, RunnerError};
use crate::locator::{locate, ArtifactNamer};
use crate::result::{ArtifactInfo, ProjectResult};
use crate::runner::{self, RunRecord};
use crate::state::{MeasureState, MeasureStateMachine};
use crate::types::ProjectSpec;

/// Something that turns a project into a result.
///
/// Implementations must not panic on expected failures; the orchestrator
/// still contains a panic, but reports it with less detail.
pub trait Measure: Send + Sync + 'static {
    fn measure(&self, project: &ProjectSpec) -> impl Future<Output = ProjectResult> + Send;
}

/// Runs the packaging tool and the produced artifact for one project.
#[derive(Debug)]
pub struct ProjectMeasurer {
    config: HarnessConfig,
    namer: ArtifactNamer,
}

/// Records collected while the state machine advances.
struct Progress {
    machine: MeasureStateMachine,
    prepare: Option<RunRecord>,
    embed: Option<RunRecord>,
    artifact: Option<ArtifactInfo>,
    first_run: Option<RunRecord>,
    second_run: Option<RunRecord>,
}

impl Progress {
    fn enter(&mut self, state: MeasureState) -> BenchResult<()> {
        self.machine.transition_to(state)?;
        Ok(())
    }
}

impl ProjectMeasurer {
    pub fn new(config: HarnessConfig) -> Self {
        let namer = ArtifactNamer::new(config.artifacts_dir.clone());
        tracing::debug!(
            run_id = namer.run_id(),
            artifacts_dir = %config.artifacts_dir.display(),
            "Artifact namer ready"
        );
        Self { config, namer }
    }

    /// Measure one project. Always returns a result.
    pub async fn measure_project(&self, project: &ProjectSpec) -> ProjectResult {
        let mut progress = Progress {
            machine: MeasureStateMachine::new(project.name.clone()),
            prepare: None,
            embed: None,
            artifact: None,
            first_run: None,
            second_run: None,
        };

        match self.drive(project, &mut progress).await {
            Ok(()) => match (
                progress.embed,
                progress.artifact,
                progress.first_run,
                progress.second_run,
            ) {
                (Some(embed), Some(artifact), Some(first_run), Some(second_run)) => {
                    ProjectResult::completed(
                        project.name.clone(),
                        progress.prepare,
                        embed,
                        artifact,
                        first_run,
                        second_run,
                    )
                }
                (embed, ..) => ProjectResult::errored(
                    project.name.clone(),
                    progress.prepare,
                    embed,
                    "measurement finished without all records",
                ),
            },
            Err(err) => {
                let failed_in = progress.machine.state();
                progress.machine.fail();
                tracing::warn!(
                    project = %project.name,
                    state = %failed_in,
                    error = %err,
                    "Project measurement failed"
                );
                ProjectResult::errored(
                    project.name.clone(),
                    progress.prepare,
                    progress.embed,
                    err.to_string(),
                )
            }
        }
    }

    async fn drive(&self, project: &ProjectSpec, progress: &mut Progress) -> BenchResult<()> {
        let output_path = self.namer.next_path(&project.name);
        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BenchError::Io {
                    context: "creating artifact directory",
                    source: e,
                })?;
        }

        if let Some(prepare) = &project.prepare {
            progress.enter(MeasureState::Preparing)?;
            let record = self
                .run_step(MeasureState::Preparing, prepare.argv(), &project.directory)
                .await?;
            let exit_code = record.exit_code;
            let ok = record.success();
            progress.prepare = Some(record);
            if !ok {
                return Err(BenchError::PrepareFailed { exit_code });
            }
        }

        progress.enter(MeasureState::Embedding)?;
        let embed_argv = self.embed_command(project, &output_path);
        let embed = self
            .run_step(MeasureState::Embedding, &embed_argv, &project.directory)
            .await?;
        if embed.success() {
            tracing::info!(
                project = %project.name,
                elapsed_ms = embed.duration.as_millis() as u64,
                "Embed finished"
            );
        } else {
            tracing::warn!(
                project = %project.name,
                exit_code = embed.exit_code,
                "Embed exited non-zero, looking for an artifact anyway"
            );
        }
        progress.embed = Some(embed);

        progress.enter(MeasureState::Locating)?;
        let search_dir = project.directory.join(&self.config.fallback_dir);
        let artifact_path =
            locate(&output_path, &search_dir).ok_or(BenchError::ArtifactNotFound)?;

        progress.enter(MeasureState::Inspecting)?;
        let artifact = snapshot_artifact(&artifact_path).await?;
        tracing::info!(
            project = %project.name,
            path = %artifact.path.display(),
            size_bytes = artifact.size_bytes,
            entries = artifact.entry_names.len(),
            "Artifact inspected"
        );
        progress.artifact = Some(artifact);

        let run_dir = artifact_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| project.directory.clone());
        let run_argv = [artifact_path.as_os_str()];

        progress.enter(MeasureState::RunningFirst)?;
        let first_run = self
            .run_step(MeasureState::RunningFirst, &run_argv, &run_dir)
            .await?;
        progress.first_run = Some(first_run);

        // Starts only after the cold run has exited.
        progress.enter(MeasureState::RunningSecond)?;
        let second_run = self
            .run_step(MeasureState::RunningSecond, &run_argv, &run_dir)
            .await?;
        progress.second_run = Some(second_run);

        progress.enter(MeasureState::Done)?;
        Ok(())
    }

    /// `<tool> -e <project dir> -o <output> <flags...>`
    fn embed_command(&self, project: &ProjectSpec, output_path: &Path) -> Vec<OsString> {
        let mut argv = vec![
            self.config.tool.clone().into_os_string(),
            OsString::from("-e"),
            project.directory.clone().into_os_string(),
            OsString::from("-o"),
            output_path.as_os_str().to_owned(),
        ];
        argv.extend(self.config.tool_flags.iter().map(OsString::from));
        argv
    }

    /// Run one protocol step, applying the configured timeout.
    async fn run_step<S: AsRef<OsStr>>(
        &self,
        step: MeasureState,
        argv: &[S],
        working_dir: &Path,
    ) -> BenchResult<RunRecord> {
        let outcome = match self.config.run_timeout {
            None => runner::run(argv, working_dir).await,
            Some(limit) => {
                match tokio::time::timeout(limit, runner::run(argv, working_dir)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(RunnerError::TimedOut {
                        program: argv
                            .first()
                            .map(|p| p.as_ref().to_string_lossy().into_owned())
                            .unwrap_or_default(),
                        limit,
                    }),
                }
            }
        };

        outcome.map_err(|source| BenchError::Step { step, source })
    }
}

impl Measure for ProjectMeasurer {
    async fn measure(&self, project: &ProjectSpec) -> ProjectResult {
        self.measure_project(project).await
    }
}

/// Read the artifact once and derive everything from that snapshot.
pub async fn snapshot_artifact(path: &Path) -> BenchResult<ArtifactInfo> {
    let bytes = tokio::fs::read(path).await.map_err(|e| BenchError::Io {
        context: "reading artifact",
        source: e,
    })?;
    Ok(ArtifactInfo::from_bytes(PathBuf::from(path), &bytes))
}
