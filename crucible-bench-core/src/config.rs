// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! YAML configuration parser with strict schema validation.
//!
//! The configuration is the only input whose failure stops a run: any invalid
//! field is a [`ValidationError`] before a single project is measured.
//! Relative paths resolve against the directory holding the config file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{BenchError, BenchResult, ValidationError};
use crate::types::{CommandLine, ProjectName, ProjectSpec};

/// Upper bound on concurrently measured projects.
const MAX_PARALLEL: u64 = 64;
/// Upper bound on the per-step timeout: one day.
const MAX_RUN_TIMEOUT_SECS: u64 = 86_400;

/// Raw harness settings as parsed from YAML (before validation).
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawHarnessConfig {
    tool: Option<String>,
    #[serde(default = "default_tool_flags")]
    tool_flags: Vec<String>,
    #[serde(default = "default_results_dir")]
    results_dir: String,
    artifacts_dir: Option<String>,
    #[serde(default = "default_fallback_dir")]
    fallback_dir: String,
    run_timeout_secs: Option<u64>,
    #[serde(default = "default_max_parallel")]
    max_parallel: u64,
}

fn default_tool_flags() -> Vec<String> {
    vec!["--debug".to_string()]
}

fn default_results_dir() -> String {
    "results".to_string()
}

fn default_fallback_dir() -> String {
    "dist".to_string()
}

fn default_max_parallel() -> u64 {
    1 // Strictly sequential
}

fn default_projects_root() -> String {
    "projects".to_string()
}

/// Raw project entry.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawProjectConfig {
    name: String,
    directory: Option<String>,
    prepare: Option<Vec<String>>,
}

/// Raw root configuration file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    harness: RawHarnessConfig,
    #[serde(default = "default_projects_root")]
    projects_root: String,
    #[serde(default)]
    projects: Vec<RawProjectConfig>,
}

/// Validated harness settings shared by every project measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct HarnessConfig {
    /// Packaging tool executable. Bare names are looked up on PATH.
    pub tool: PathBuf,
    /// Flags appended after `-e <dir> -o <out>`.
    pub tool_flags: Vec<String>,
    /// Where reports are written.
    pub results_dir: PathBuf,
    /// Root for per-project artifact directories.
    pub artifacts_dir: PathBuf,
    /// Fallback search directory, relative to each project directory.
    pub fallback_dir: PathBuf,
    /// Bound on every spawned step; `None` waits forever.
    pub run_timeout: Option<Duration>,
    /// Projects measured at once. 1 is strictly sequential.
    pub max_parallel: usize,
}

impl HarnessConfig {
    /// Settings with defaults for everything but the tool and results directory.
    pub fn new(tool: impl Into<PathBuf>, results_dir: impl Into<PathBuf>) -> Self {
        let results_dir = results_dir.into();
        Self {
            tool: tool.into(),
            tool_flags: default_tool_flags(),
            artifacts_dir: results_dir.join("artifacts"),
            results_dir,
            fallback_dir: PathBuf::from(default_fallback_dir()),
            run_timeout: None,
            max_parallel: 1,
        }
    }

    pub fn with_run_timeout(mut self, limit: Duration) -> Self {
        self.run_timeout = Some(limit);
        self
    }

    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    pub fn with_artifacts_dir(mut self, artifacts_dir: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = artifacts_dir.into();
        self
    }

    /// Move reports to `results_dir`. An artifacts directory still at its
    /// default `<results_dir>/artifacts` moves along with it.
    pub fn with_results_dir(mut self, results_dir: impl Into<PathBuf>) -> Self {
        self.set_results_dir(results_dir.into());
        self
    }

    fn set_results_dir(&mut self, results_dir: PathBuf) {
        if self.artifacts_dir == self.results_dir.join("artifacts") {
            self.artifacts_dir = results_dir.join("artifacts");
        }
        self.results_dir = results_dir;
    }

    /// Apply command-line overrides. Relative paths resolve against `base_dir`,
    /// normally the current directory; a bare tool name stays a PATH lookup.
    pub fn apply_overrides(&mut self, overrides: &HarnessOverrides, base_dir: &Path) {
        if let Some(tool) = &overrides.tool {
            self.tool = resolve_program(base_dir, tool);
        }
        if let Some(results_dir) = &overrides.results_dir {
            self.set_results_dir(resolve(base_dir, results_dir));
        }
        if let Some(limit) = overrides.run_timeout {
            self.run_timeout = Some(limit);
        }
        if let Some(max_parallel) = overrides.max_parallel {
            self.max_parallel = max_parallel.clamp(1, MAX_PARALLEL as usize);
        }
    }
}

/// Values given on the command line, taking precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct HarnessOverrides {
    pub tool: Option<PathBuf>,
    pub results_dir: Option<PathBuf>,
    pub run_timeout: Option<Duration>,
    pub max_parallel: Option<usize>,
}

/// Complete validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub harness: HarnessConfig,
    /// Projects in configuration order.
    pub projects: Vec<ProjectSpec>,
}

impl Config {
    /// Keep only the named projects, preserving configuration order.
    /// An empty filter keeps everything.
    pub fn retain_projects(&mut self, names: &[String]) -> Result<(), ValidationError> {
        if names.is_empty() {
            return Ok(());
        }

        for name in names {
            if !self.projects.iter().any(|p| p.name.as_str() == name) {
                return Err(ValidationError::UnknownProject { name: name.clone() });
            }
        }

        self.projects
            .retain(|p| names.iter().any(|n| n == p.name.as_str()));
        Ok(())
    }
}

/// Configuration loader with strict validation.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate configuration from a YAML file.
    pub fn load_file(path: impl AsRef<Path>) -> BenchResult<Config> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(BenchError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| BenchError::Io {
            context: "reading config file",
            source: e,
        })?;

        let base_dir = absolutize(path.parent().unwrap_or_else(|| Path::new(".")))?;
        Self::load_string(&content, &base_dir)
    }

    /// Load and validate configuration from a YAML string.
    /// Relative paths resolve against `base_dir`.
    pub fn load_string(content: &str, base_dir: &Path) -> BenchResult<Config> {
        let raw: RawConfig =
            serde_yaml::from_str(content).map_err(|e| BenchError::ConfigParse {
                message: format!("YAML parse error: {}", e),
            })?;

        Ok(Self::validate(raw, base_dir)?)
    }

    /// Validate raw configuration and convert to validated types.
    fn validate(raw: RawConfig, base_dir: &Path) -> Result<Config, ValidationError> {
        let harness = Self::validate_harness(raw.harness, base_dir)?;
        let projects_root = resolve(base_dir, &raw.projects_root);

        let mut projects = Vec::with_capacity(raw.projects.len());
        let mut seen = HashSet::new();

        for (index, raw_project) in raw.projects.into_iter().enumerate() {
            let project = Self::validate_project(raw_project, index, base_dir, &projects_root)?;

            if !seen.insert(project.name.clone()) {
                return Err(ValidationError::DuplicateProjectName {
                    name: project.name.to_string(),
                });
            }

            projects.push(project);
        }

        if projects.is_empty() {
            return Err(ValidationError::SchemaValidation {
                message: "At least one project must be defined".to_string(),
            });
        }

        Ok(Config { harness, projects })
    }

    /// Validate harness settings.
    fn validate_harness(
        raw: RawHarnessConfig,
        base_dir: &Path,
    ) -> Result<HarnessConfig, ValidationError> {
        let tool = match raw.tool {
            Some(tool) if !tool.trim().is_empty() => resolve_program(base_dir, &tool),
            Some(tool) => {
                return Err(ValidationError::InvalidFieldValue {
                    field: "harness.tool",
                    value: tool,
                    reason: "Tool path cannot be blank".to_string(),
                })
            }
            None => {
                return Err(ValidationError::MissingRequiredField {
                    field: "tool",
                    context: "harness".to_string(),
                })
            }
        };

        if !(1..=MAX_PARALLEL).contains(&raw.max_parallel) {
            return Err(ValidationError::InvalidFieldValue {
                field: "harness.max_parallel",
                value: raw.max_parallel.to_string(),
                reason: format!("Must be between 1 and {}", MAX_PARALLEL),
            });
        }

        let run_timeout = match raw.run_timeout_secs {
            None => None,
            Some(secs) if (1..=MAX_RUN_TIMEOUT_SECS).contains(&secs) => {
                Some(Duration::from_secs(secs))
            }
            Some(secs) => {
                return Err(ValidationError::InvalidFieldValue {
                    field: "harness.run_timeout_secs",
                    value: secs.to_string(),
                    reason: format!("Must be between 1 and {}", MAX_RUN_TIMEOUT_SECS),
                })
            }
        };

        if raw.fallback_dir.trim().is_empty() {
            return Err(ValidationError::InvalidFieldValue {
                field: "harness.fallback_dir",
                value: raw.fallback_dir,
                reason: "Fallback directory cannot be blank".to_string(),
            });
        }

        let results_dir = resolve(base_dir, &raw.results_dir);
        let artifacts_dir = match raw.artifacts_dir {
            Some(dir) => resolve(base_dir, &dir),
            None => results_dir.join("artifacts"),
        };

        Ok(HarnessConfig {
            tool,
            tool_flags: raw.tool_flags,
            results_dir,
            artifacts_dir,
            fallback_dir: PathBuf::from(raw.fallback_dir),
            run_timeout,
            max_parallel: raw.max_parallel as usize,
        })
    }

    /// Validate a single project entry.
    fn validate_project(
        raw: RawProjectConfig,
        index: usize,
        base_dir: &Path,
        projects_root: &Path,
    ) -> Result<ProjectSpec, ValidationError> {
        let context = format!("project at index {}", index);

        let name = ProjectName::new(raw.name)?;

        let directory = match raw.directory {
            Some(dir) => resolve(base_dir, &dir),
            None => projects_root.join(name.as_str()),
        };

        let mut project = ProjectSpec::new(name, directory);

        if let Some(argv) = raw.prepare {
            let prepare = CommandLine::new(argv).map_err(|e| match e {
                ValidationError::InvalidFieldValue { value, reason, .. } => {
                    ValidationError::InvalidFieldValue {
                        field: "project.prepare",
                        value: format!("{} ({})", value, context),
                        reason,
                    }
                }
                other => other,
            })?;
            project = project.with_prepare(prepare);
        }

        Ok(project)
    }
}

/// Make `path` absolute against the current directory.
pub fn absolutize(path: &Path) -> BenchResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| BenchError::Io {
        context: "resolving current directory",
        source: e,
    })?;
    Ok(cwd.join(path))
}

fn resolve(base_dir: &Path, raw: impl AsRef<Path>) -> PathBuf {
    let path = raw.as_ref();
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Paths with more than one component resolve against `base_dir`; a bare
/// program name is left for PATH lookup.
fn resolve_program(base_dir: &Path, raw: impl AsRef<Path>) -> PathBuf {
    let path = raw.as_ref();
    if path.components().count() > 1 {
        resolve(base_dir, path)
    } else {
        path.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_CONFIG: &str = r#"
harness:
  tool: ../target/release/pycrucible
  tool_flags: ["--debug"]
  results_dir: results
  run_timeout_secs: 600
  max_parallel: 2

projects:
  - name: cowsay_app
  - name: flask_app
    directory: /srv/apps/flask
  - name: many_files
    prepare: [python3, generate.py]
"#;

    fn base() -> &'static Path {
        Path::new("/bench")
    }

    #[test]
    fn test_valid_config() {
        let config = ConfigLoader::load_string(VALID_CONFIG, base()).unwrap();

        assert_eq!(config.projects.len(), 3);
        assert_eq!(config.projects[0].name.as_str(), "cowsay_app");
        assert_eq!(
            config.projects[0].directory,
            Path::new("/bench/projects/cowsay_app")
        );
        assert_eq!(config.projects[1].directory, Path::new("/srv/apps/flask"));
        assert_eq!(
            config.projects[2].prepare.as_ref().unwrap().argv(),
            ["python3", "generate.py"]
        );

        assert_eq!(
            config.harness.tool,
            Path::new("/bench/../target/release/pycrucible")
        );
        assert_eq!(config.harness.results_dir, Path::new("/bench/results"));
        assert_eq!(config.harness.artifacts_dir, Path::new("/bench/results/artifacts"));
        assert_eq!(config.harness.run_timeout, Some(Duration::from_secs(600)));
        assert_eq!(config.harness.max_parallel, 2);
    }

    #[test]
    fn test_defaults_applied() {
        let yaml = r#"
harness:
  tool: pycrucible
projects:
  - name: flask_app
"#;
        let config = ConfigLoader::load_string(yaml, base()).unwrap();

        assert_eq!(config.harness.tool, Path::new("pycrucible"));
        assert_eq!(config.harness.tool_flags, vec!["--debug"]);
        assert_eq!(config.harness.fallback_dir, Path::new("dist"));
        assert_eq!(config.harness.max_parallel, 1);
        assert!(config.harness.run_timeout.is_none());
    }

    #[test]
    fn test_missing_tool() {
        let yaml = r#"
harness:
  results_dir: out
projects:
  - name: flask_app
"#;
        let err = ConfigLoader::load_string(yaml, base()).unwrap_err();
        assert!(matches!(
            err,
            BenchError::Validation(ValidationError::MissingRequiredField { field: "tool", .. })
        ));
    }

    #[test]
    fn test_missing_projects() {
        let yaml = r#"
harness:
  tool: pycrucible
projects: []
"#;
        assert!(ConfigLoader::load_string(yaml, base()).is_err());
    }

    #[test]
    fn test_duplicate_names() {
        let yaml = r#"
harness:
  tool: pycrucible
projects:
  - name: flask_app
  - name: flask_app
    directory: elsewhere
"#;
        let err = ConfigLoader::load_string(yaml, base()).unwrap_err();
        assert!(matches!(
            err,
            BenchError::Validation(ValidationError::DuplicateProjectName { .. })
        ));
    }

    #[test]
    fn test_invalid_project_name() {
        let yaml = r#"
harness:
  tool: pycrucible
projects:
  - name: "../../etc"
"#;
        assert!(ConfigLoader::load_string(yaml, base()).is_err());
    }

    #[test]
    fn test_zero_parallelism_rejected() {
        let yaml = r#"
harness:
  tool: pycrucible
  max_parallel: 0
projects:
  - name: flask_app
"#;
        assert!(ConfigLoader::load_string(yaml, base()).is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let yaml = r#"
harness:
  tool: pycrucible
  run_timeout_secs: 0
projects:
  - name: flask_app
"#;
        assert!(ConfigLoader::load_string(yaml, base()).is_err());
    }

    #[test]
    fn test_empty_prepare_rejected() {
        let yaml = r#"
harness:
  tool: pycrucible
projects:
  - name: many_files
    prepare: []
"#;
        assert!(ConfigLoader::load_string(yaml, base()).is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = r#"
harness:
  tool: pycrucible
  toll: typo
projects:
  - name: flask_app
"#;
        let err = ConfigLoader::load_string(yaml, base()).unwrap_err();
        assert!(matches!(err, BenchError::ConfigParse { .. }));
    }

    #[test]
    fn test_retain_projects_keeps_config_order() {
        let mut config = ConfigLoader::load_string(VALID_CONFIG, base()).unwrap();
        config
            .retain_projects(&["many_files".to_string(), "cowsay_app".to_string()])
            .unwrap();

        let names: Vec<_> = config.projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["cowsay_app", "many_files"]);
    }

    #[test]
    fn test_retain_unknown_project() {
        let mut config = ConfigLoader::load_string(VALID_CONFIG, base()).unwrap();
        let err = config.retain_projects(&["pygame_app".to_string()]).unwrap_err();
        assert!(matches!(err, ValidationError::UnknownProject { .. }));
        assert_eq!(config.projects.len(), 3);
    }

    #[test]
    fn test_config_not_found() {
        let err = ConfigLoader::load_file("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, BenchError::ConfigNotFound { .. }));
    }

    #[test]
    fn test_example_config_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../crucible-bench.example.yaml");
        let config = ConfigLoader::load_file(&path).unwrap();

        let names: Vec<_> = config.projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "cowsay_app",
                "flask_app",
                "fastapi_app",
                "pygame_app",
                "heavy_deps",
                "many_files"
            ]
        );
        assert!(config.projects[5].prepare.is_some());
        assert!(config.harness.tool.is_absolute());
    }

    #[test]
    fn test_results_dir_override_moves_default_artifacts_dir() {
        let mut config = ConfigLoader::load_string(VALID_CONFIG, base()).unwrap();
        let overrides = HarnessOverrides {
            results_dir: Some(PathBuf::from("run2")),
            ..Default::default()
        };

        config.harness.apply_overrides(&overrides, Path::new("/work"));

        assert_eq!(config.harness.results_dir, Path::new("/work/run2"));
        assert_eq!(
            config.harness.artifacts_dir,
            Path::new("/work/run2/artifacts")
        );
    }

    #[test]
    fn test_results_dir_override_keeps_explicit_artifacts_dir() {
        let yaml = r#"
harness:
  tool: pycrucible
  artifacts_dir: /scratch/artifacts
projects:
  - name: flask_app
"#;
        let mut config = ConfigLoader::load_string(yaml, base()).unwrap();
        let overrides = HarnessOverrides {
            results_dir: Some(PathBuf::from("/tmp/run2")),
            ..Default::default()
        };

        config.harness.apply_overrides(&overrides, Path::new("/work"));

        assert_eq!(config.harness.results_dir, Path::new("/tmp/run2"));
        assert_eq!(
            config.harness.artifacts_dir,
            Path::new("/scratch/artifacts")
        );
    }

    #[test]
    fn test_tool_timeout_and_parallel_overrides() {
        let mut harness = HarnessConfig::new("pycrucible", "/out");

        harness.apply_overrides(
            &HarnessOverrides {
                tool: Some(PathBuf::from("bin/pycrucible")),
                run_timeout: Some(Duration::from_secs(30)),
                max_parallel: Some(4),
                ..Default::default()
            },
            Path::new("/work"),
        );
        assert_eq!(harness.tool, Path::new("/work/bin/pycrucible"));
        assert_eq!(harness.run_timeout, Some(Duration::from_secs(30)));
        assert_eq!(harness.max_parallel, 4);

        harness.apply_overrides(
            &HarnessOverrides {
                tool: Some(PathBuf::from("pycrucible")),
                ..Default::default()
            },
            Path::new("/work"),
        );
        assert_eq!(harness.tool, Path::new("pycrucible"));
        assert_eq!(harness.run_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_harness_builder() {
        let harness = HarnessConfig::new("tool", "/out").with_max_parallel(0);
        assert_eq!(harness.max_parallel, 1);
        assert_eq!(harness.artifacts_dir, Path::new("/out/artifacts"));

        let moved = harness.with_results_dir("/elsewhere");
        assert_eq!(moved.artifacts_dir, Path::new("/elsewhere/artifacts"));
    }
}
