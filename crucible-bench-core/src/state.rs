// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Measurement state machine with typed state transitions.
//!
//! Implements the per-project protocol:
//! Start → (Preparing) → Embedding → Locating → Inspecting → RunningFirst →
//! RunningSecond → Done,
//! with a side exit to Errored from every non-terminal state.
//! Invalid transitions result in StateTransitionError.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::StateTransitionError;
use crate::types::ProjectName;

/// Protocol states for one project measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasureState {
    /// Output path allocated, nothing spawned yet.
    Start,

    /// Running the project's optional pre-embed command.
    Preparing,

    /// Packaging tool is producing the artifact.
    Embedding,

    /// Resolving which file on disk is the artifact.
    Locating,

    /// Hashing and introspecting the artifact bytes.
    Inspecting,

    /// Cold execution of the artifact.
    RunningFirst,

    /// Warm execution, strictly after the cold run exited.
    RunningSecond,

    /// Measurement completed.
    Done,

    /// Measurement stopped with an explicit error.
    Errored,
}

impl MeasureState {
    /// Get the state name for error messages and logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Preparing => "preparing",
            Self::Embedding => "embedding",
            Self::Locating => "locating",
            Self::Inspecting => "inspecting",
            Self::RunningFirst => "running_first",
            Self::RunningSecond => "running_second",
            Self::Done => "done",
            Self::Errored => "errored",
        }
    }

    /// Whether no further transition is possible.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Errored)
    }

    /// Check if transition to the target state is valid.
    pub fn can_transition_to(&self, target: MeasureState) -> bool {
        if target == Self::Errored {
            return !self.is_terminal();
        }
        matches!(
            (self, target),
            (Self::Start, Self::Preparing)
                | (Self::Start, Self::Embedding)
                | (Self::Preparing, Self::Embedding)
                | (Self::Embedding, Self::Locating)
                | (Self::Locating, Self::Inspecting)
                | (Self::Inspecting, Self::RunningFirst)
                | (Self::RunningFirst, Self::RunningSecond)
                | (Self::RunningSecond, Self::Done)
        )
    }
}

impl std::fmt::Display for MeasureState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// State machine for one project measurement.
/// Enforces valid transitions and records how long each state lasted.
#[derive(Debug)]
pub struct MeasureStateMachine {
    project: ProjectName,
    current_state: MeasureState,
    last_transition: Instant,
    history: Vec<(MeasureState, Duration)>,
}

impl MeasureStateMachine {
    /// Create a new state machine in `Start`.
    pub fn new(project: ProjectName) -> Self {
        Self {
            project,
            current_state: MeasureState::Start,
            last_transition: Instant::now(),
            history: Vec::new(),
        }
    }

    /// Get the current state.
    pub fn state(&self) -> MeasureState {
        self.current_state
    }

    pub fn project(&self) -> &ProjectName {
        &self.project
    }

    /// States left so far, with the time spent in each.
    pub fn history(&self) -> &[(MeasureState, Duration)] {
        &self.history
    }

    /// Attempt to transition to a new state.
    pub fn transition_to(&mut self, target: MeasureState) -> Result<(), StateTransitionError> {
        if !self.current_state.can_transition_to(target) {
            return Err(StateTransitionError::InvalidTransition {
                project: self.project.to_string(),
                from: self.current_state.name(),
                to: target.name(),
            });
        }

        let spent = self.last_transition.elapsed();
        tracing::debug!(
            project = %self.project,
            from = self.current_state.name(),
            to = target.name(),
            elapsed_ms = spent.as_millis() as u64,
            "State transition"
        );

        self.history.push((self.current_state, spent));
        self.current_state = target;
        self.last_transition = Instant::now();

        Ok(())
    }

    /// Move to `Errored`. A no-op once the machine is already terminal.
    pub fn fail(&mut self) {
        if !self.current_state.is_terminal() {
            // Errored is reachable from every non-terminal state.
            let _ = self.transition_to(MeasureState::Errored);
        }
    }
}
