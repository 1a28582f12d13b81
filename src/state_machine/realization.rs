// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Realization State Machine
//!
//! Tracks where each declared resource stands with respect to the cloud.
//! A **Mealy machine**: outputs depend on both state and input.
//!
//! # States
//!
//! - Pending: declared, not yet touched
//! - Creating / Updating / Deleting: a provider call is in flight
//! - Realized: matches its declared state
//! - Deleted: removed (may be created again)
//! - Failed: last provider call failed
//!
//! # Inputs
//!
//! - Create: Pending | Deleted | Failed → Creating
//! - Update: Realized | Failed → Updating
//! - Delete: Realized | Failed → Deleting
//! - Succeed: Creating | Updating → Realized, Deleting → Deleted
//! - Fail: Creating | Updating | Deleting → Failed

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{StateMachine, TransitionError, TransitionResult};

/// Realization state of one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RealizationState {
    Pending,
    Creating,
    Realized,
    Updating,
    Deleting,
    Deleted,
    Failed,
}

impl RealizationState {
    /// Dependents may only be realized once this holds
    pub fn is_realized(&self) -> bool {
        matches!(self, Self::Realized)
    }

    /// A provider call is in flight
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Creating | Self::Updating | Self::Deleting)
    }
}

impl fmt::Display for RealizationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Realization command (FSM input)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RealizationCommand {
    Create,
    Update,
    Delete,
    Succeed,
    Fail,
}

impl fmt::Display for RealizationCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Transition output with metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutput {
    /// Warnings generated during transition
    pub warnings: Vec<String>,

    /// Whether the transition removes a live resource
    pub is_destructive: bool,
}

impl TransitionOutput {
    pub fn ok() -> Self {
        Self {
            warnings: Vec::new(),
            is_destructive: false,
        }
    }

    pub fn with_warning(warning: impl Into<String>) -> Self {
        Self {
            warnings: vec![warning.into()],
            is_destructive: false,
        }
    }

    pub fn destructive() -> Self {
        Self {
            warnings: Vec::new(),
            is_destructive: true,
        }
    }
}

impl StateMachine for RealizationState {
    type Input = RealizationCommand;
    type Output = TransitionOutput;

    fn transition(&self, input: &Self::Input) -> TransitionResult<(Self, Self::Output)> {
        use RealizationCommand::*;
        use RealizationState::*;

        match (self, input) {
            (Pending, Create) | (Deleted, Create) => Ok((Creating, TransitionOutput::ok())),
            (Failed, Create) => Ok((
                Creating,
                TransitionOutput::with_warning("Retrying creation of failed resource"),
            )),

            (Realized, Update) => Ok((Updating, TransitionOutput::ok())),
            (Failed, Update) => Ok((
                Updating,
                TransitionOutput::with_warning("Retrying update of failed resource"),
            )),

            (Realized, Delete) => Ok((Deleting, TransitionOutput::destructive())),
            (Failed, Delete) => Ok((
                Deleting,
                TransitionOutput::with_warning("Cleaning up failed resource"),
            )),

            (Creating, Succeed) | (Updating, Succeed) => Ok((Realized, TransitionOutput::ok())),
            (Deleting, Succeed) => Ok((Deleted, TransitionOutput::ok())),

            (Creating, Fail) | (Updating, Fail) | (Deleting, Fail) => Ok((
                Failed,
                TransitionOutput::with_warning(format!("Provider call failed while {}", self)),
            )),

            (from, input) => Err(TransitionError::InvalidTransition {
                from: from.to_string(),
                input: input.to_string(),
            }),
        }
    }

    fn valid_inputs(&self) -> Vec<Self::Input> {
        use RealizationCommand::*;
        use RealizationState::*;

        match self {
            Pending | Deleted => vec![Create],
            Realized => vec![Update, Delete],
            Failed => vec![Create, Update, Delete],
            Creating | Updating | Deleting => vec![Succeed, Fail],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_then_realize() {
        let (state, _) = RealizationState::Pending
            .transition(&RealizationCommand::Create)
            .expect("Transition should succeed");
        assert_eq!(state, RealizationState::Creating);
        assert!(state.is_in_flight());

        let (state, output) = state.transition(&RealizationCommand::Succeed).unwrap();
        assert!(state.is_realized());
        assert!(output.warnings.is_empty());
    }

    #[test]
    fn test_delete_is_destructive() {
        let (state, output) = RealizationState::Realized
            .transition(&RealizationCommand::Delete)
            .unwrap();
        assert_eq!(state, RealizationState::Deleting);
        assert!(output.is_destructive);

        let (state, _) = state.transition(&RealizationCommand::Succeed).unwrap();
        assert_eq!(state, RealizationState::Deleted);
    }

    #[test]
    fn test_failure_and_retry() {
        let (state, output) = RealizationState::Creating
            .transition(&RealizationCommand::Fail)
            .unwrap();
        assert_eq!(state, RealizationState::Failed);
        assert_eq!(output.warnings.len(), 1);

        let (state, output) = state.transition(&RealizationCommand::Create).unwrap();
        assert_eq!(state, RealizationState::Creating);
        assert!(!output.warnings.is_empty());
    }

    #[test]
    fn test_failed_update_can_be_retried() {
        let (state, _) = RealizationState::Updating
            .transition(&RealizationCommand::Fail)
            .unwrap();
        assert_eq!(state, RealizationState::Failed);

        let (state, output) = state.transition(&RealizationCommand::Update).unwrap();
        assert_eq!(state, RealizationState::Updating);
        assert_eq!(output.warnings.len(), 1);
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!RealizationState::Pending.can_transition(&RealizationCommand::Update));
        assert!(!RealizationState::Pending.can_transition(&RealizationCommand::Succeed));
        assert!(!RealizationState::Realized.can_transition(&RealizationCommand::Create));

        let err = RealizationState::Deleted
            .transition(&RealizationCommand::Delete)
            .unwrap_err();
        assert!(matches!(err, TransitionError::InvalidTransition { .. }));
    }

    #[test]
    fn test_valid_inputs_agree_with_transition() {
        let states = [
            RealizationState::Pending,
            RealizationState::Creating,
            RealizationState::Realized,
            RealizationState::Updating,
            RealizationState::Deleting,
            RealizationState::Deleted,
            RealizationState::Failed,
        ];

        for state in states {
            for input in state.valid_inputs() {
                assert!(state.can_transition(&input), "{state} should accept {input}");
            }
        }
    }
}
