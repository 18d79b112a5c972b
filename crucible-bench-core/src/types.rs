// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Newtype wrappers for validated inputs.
//!
//! Project names end up in artifact and report file names, so they are
//! validated at construction and carried as [`ProjectName`] from then on.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Maximum length of a project name.
const MAX_PROJECT_NAME_LEN: usize = 64;

/// Validated project identifier.
/// Must be non-empty, alphanumeric with hyphens/underscores/dots, max 64 chars,
/// and must not start with a dot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectName(String);

impl ProjectName {
    /// Create a new ProjectName with validation.
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();

        if name.is_empty() {
            return Err(ValidationError::InvalidFieldValue {
                field: "project.name",
                value: name,
                reason: "Project name cannot be empty".to_string(),
            });
        }

        if name.len() > MAX_PROJECT_NAME_LEN {
            return Err(ValidationError::InvalidFieldValue {
                field: "project.name",
                value: name.clone(),
                reason: format!(
                    "Project name too long: {} chars (max {})",
                    name.len(),
                    MAX_PROJECT_NAME_LEN
                ),
            });
        }

        if name.starts_with('.') {
            return Err(ValidationError::InvalidFieldValue {
                field: "project.name",
                value: name,
                reason: "Project name cannot start with a dot".to_string(),
            });
        }

        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            return Err(ValidationError::InvalidFieldValue {
                field: "project.name",
                value: name,
                reason: "Project name must contain only ASCII alphanumerics, hyphens, \
                         underscores and dots"
                    .to_string(),
            });
        }

        Ok(Self(name))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ProjectName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ProjectName> for String {
    fn from(name: ProjectName) -> Self {
        name.0
    }
}

/// Validated command line: program followed by its arguments.
/// Must contain at least the program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct CommandLine(Vec<String>);

impl CommandLine {
    /// Create a new CommandLine, rejecting an empty argv or empty program.
    pub fn new(argv: Vec<String>) -> Result<Self, ValidationError> {
        match argv.first() {
            None => Err(ValidationError::InvalidFieldValue {
                field: "command",
                value: "[]".to_string(),
                reason: "Command must name a program".to_string(),
            }),
            Some(program) if program.trim().is_empty() => Err(ValidationError::InvalidFieldValue {
                field: "command",
                value: format!("{:?}", argv),
                reason: "Program name cannot be blank".to_string(),
            }),
            Some(_) => Ok(Self(argv)),
        }
    }

    /// Program and arguments as one slice.
    pub fn argv(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" "))
    }
}

impl TryFrom<Vec<String>> for CommandLine {
    type Error = ValidationError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CommandLine> for Vec<String> {
    fn from(command: CommandLine) -> Self {
        command.0
    }
}

/// One project to benchmark. Read-only for the whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSpec {
    /// Identifier used in reports and artifact names.
    pub name: ProjectName,
    /// Source directory handed to the packaging tool.
    pub directory: PathBuf,
    /// Optional command run in `directory` before embedding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prepare: Option<CommandLine>,
}

impl ProjectSpec {
    pub fn new(name: ProjectName, directory: impl Into<PathBuf>) -> Self {
        Self {
            name,
            directory: directory.into(),
            prepare: None,
        }
    }

    /// Attach a pre-embed command.
    pub fn with_prepare(mut self, prepare: CommandLine) -> Self {
        self.prepare = Some(prepare);
        self
    }
}
