//! Error types shared by the workbench engines

use thiserror::Error;

use crate::models::RequirementStatus;
use crate::workflow::WorkflowAction;

/// Errors that can occur while applying an action to the workspace
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Cannot {action} a requirement in status {from}")]
    InvalidTransition {
        from: RequirementStatus,
        action: WorkflowAction,
    },

    #[error("Duplicate {kind} id: {id}")]
    DuplicateId { kind: &'static str, id: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Invalid parent link at document {0}")]
    InvalidParent(String),

    #[error("Moving {id} under {parent} would create a cycle")]
    CycleDetected { id: String, parent: String },

    #[error("The root folder cannot be deleted")]
    RootNotDeletable,

    #[error("Parse error: {0}")]
    Parse(String),
}

impl CoreError {
    pub(crate) fn not_found(kind: &'static str, id: &str) -> Self {
        CoreError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub(crate) fn duplicate(kind: &'static str, id: &str) -> Self {
        CoreError::DuplicateId {
            kind,
            id: id.to_string(),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
