// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Benchmark orchestration across projects.
//!
//! Each project is measured in its own task so a panic inside one measurement
//! is caught at the join boundary and recorded as an errored result. Results
//! come back in configuration order whatever order the tasks finish in.

use std::any::Any;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinError;

use crate::measurer::Measure;
use crate::result::ProjectResult;
use crate::types::ProjectSpec;

/// Drives a [`Measure`] implementation over an ordered project list.
pub struct BenchmarkOrchestrator<M> {
    measurer: Arc<M>,
    max_parallel: usize,
}

impl<M: Measure> BenchmarkOrchestrator<M> {
    /// Create a strictly sequential orchestrator.
    pub fn new(measurer: M) -> Self {
        Self {
            measurer: Arc::new(measurer),
            max_parallel: 1,
        }
    }

    /// Set how many projects may be measured at once.
    ///
    /// Values above 1 are only safe when every project writes its artifact
    /// to its own directory, which the measurer's namer guarantees.
    pub fn max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    pub fn measurer(&self) -> &M {
        &self.measurer
    }

    /// Measure every project and return one result per project, in order.
    pub async fn run_all(&self, projects: &[ProjectSpec]) -> Vec<ProjectResult> {
        let permits = Arc::new(Semaphore::new(self.max_parallel));
        let mut pending = Vec::with_capacity(projects.len());

        for (index, project) in projects.iter().enumerate() {
            // Waits for a free slot, so projects start in configuration order.
            let permit = Arc::clone(&permits).acquire_owned().await.ok();

            tracing::info!(
                project = %project.name,
                position = index + 1,
                total = projects.len(),
                "Benchmarking project"
            );

            let measurer = Arc::clone(&self.measurer);
            let spec = project.clone();
            let handle = tokio::spawn(async move {
                let _permit = permit;
                measurer.measure(&spec).await
            });
            pending.push((project, handle));
        }

        let mut results = Vec::with_capacity(pending.len());
        for (project, handle) in pending {
            let result = match handle.await {
                Ok(result) => result,
                Err(err) => {
                    let reason = join_failure(err);
                    tracing::error!(
                        project = %project.name,
                        reason = %reason,
                        "Project measurement aborted"
                    );
                    ProjectResult::errored(
                        project.name.clone(),
                        None,
                        None,
                        format!("measurement aborted: {}", reason),
                    )
                }
            };
            results.push(result);
        }

        let failed = results.iter().filter(|r| r.error.is_some()).count();
        tracing::info!(
            projects = results.len(),
            failed = failed,
            "All projects measured"
        );

        results
    }
}

fn join_failure(err: JoinError) -> String {
    if err.is_cancelled() {
        return "task cancelled".to_string();
    }
    match err.try_into_panic() {
        Ok(payload) => panic_message(payload.as_ref()),
        Err(err) => err.to_string(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ArtifactInfo;
    use crate::runner::RunRecord;
    use crate::types::ProjectName;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn project(name: &str) -> ProjectSpec {
        ProjectSpec::new(ProjectName::new(name).unwrap(), format!("/srv/{}", name))
    }

    fn record() -> RunRecord {
        RunRecord {
            duration: Duration::from_millis(1),
            exit_code: 0,
            signal: None,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    fn completed(spec: &ProjectSpec) -> ProjectResult {
        ProjectResult::completed(
            spec.name.clone(),
            None,
            record(),
            ArtifactInfo::from_bytes(format!("/out/{}", spec.name), b"bin"),
            record(),
            record(),
        )
    }

    /// Panics on projects named "boom", sleeps longer for earlier projects.
    struct FakeMeasurer {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl FakeMeasurer {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    impl Measure for FakeMeasurer {
        async fn measure(&self, project: &ProjectSpec) -> ProjectResult {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            if project.name.as_str() == "boom" {
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                panic!("measurer exploded");
            }

            let delay = match project.name.as_str() {
                "first" => 60,
                "second" => 30,
                _ => 5,
            };
            tokio::time::sleep(Duration::from_millis(delay)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            completed(project)
        }
    }

    fn names(results: &[ProjectResult]) -> Vec<&str> {
        results.iter().map(|r| r.project.as_str()).collect()
    }

    #[tokio::test]
    async fn test_one_result_per_project_in_order() {
        let orchestrator = BenchmarkOrchestrator::new(FakeMeasurer::new());
        let projects = vec![project("first"), project("second"), project("third")];

        let results = orchestrator.run_all(&projects).await;

        assert_eq!(names(&results), vec!["first", "second", "third"]);
        assert!(results.iter().all(|r| r.error.is_none()));
        assert_eq!(orchestrator.measurer().peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let orchestrator = BenchmarkOrchestrator::new(FakeMeasurer::new());
        let projects = vec![project("first"), project("boom"), project("third")];

        let results = orchestrator.run_all(&projects).await;

        assert_eq!(names(&results), vec!["first", "boom", "third"]);
        let error = results[1].error.as_deref().unwrap();
        assert!(error.contains("measurer exploded"), "{}", error);
        assert!(results[1].artifact.is_none());
        assert!(results[2].error.is_none());
    }

    #[tokio::test]
    async fn test_parallel_keeps_configuration_order() {
        let orchestrator = BenchmarkOrchestrator::new(FakeMeasurer::new()).max_parallel(3);
        let projects = vec![project("first"), project("second"), project("third")];

        let results = orchestrator.run_all(&projects).await;

        assert_eq!(names(&results), vec!["first", "second", "third"]);
        assert!(orchestrator.measurer().peak.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn test_empty_project_list() {
        let orchestrator = BenchmarkOrchestrator::new(FakeMeasurer::new());
        assert!(orchestrator.run_all(&[]).await.is_empty());
    }

    #[test]
    fn test_panic_message_variants() {
        assert_eq!(panic_message(&"static"), "panicked: static");
        assert_eq!(panic_message(&String::from("owned")), "panicked: owned");
        assert_eq!(panic_message(&42u32), "panicked");
    }
}
