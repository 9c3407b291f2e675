//! Error Types
//!
//! Error taxonomy for the workflow engine. Every failure a caller can
//! observe is a [`WorkflowError`]; lower layers report [`StoreError`]
//! (persistence) and [`StepError`] (step execution).
//!
//! Each [`WorkflowError`] variant carries a stable error code so that an
//! outer layer (HTTP, CLI) can map it to a client-facing response:
//!
//! | Code      | Variant                 | Caused by |
//! |-----------|-------------------------|-----------|
//! | `WFE-001` | `ExecutionFailure`      | server (unless the step raised a [`UserError`]) |
//! | `WFE-002` | `UnknownClaimTicket`    | user |
//! | `WFE-003` | `MismatchedClaimTicket` | user |
//! | `WFE-004` | `UnknownWorkflow`       | user |
//! | `WFE-005` | `StorageFailure`        | server |

use std::error::Error as StdError;

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::store::ContextRecord;
use crate::workflow::WorkflowStatus;

/// Error produced by a step. Steps may fail with any error type.
pub type StepError = Box<dyn StdError + Send + Sync>;

/// Errors raised by the state store and its blob backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on state '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode state '{key}': {source}")]
    Encoding {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid state key: '{0}'")]
    InvalidKey(String),
}

/// A failure caused by bad client input rather than by the engine.
///
/// Steps return this (boxed as a [`StepError`]) when the request itself
/// cannot be satisfied, e.g. a set list that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct UserError {
    message: String,
}

impl UserError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Rejected status change on a context header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invalid status transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: StatusLabel,
    pub to: WorkflowStatus,
}

/// Display helper for an optional status (`NEW` when unset).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusLabel(pub Option<WorkflowStatus>);

impl std::fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(status) => write!(f, "{}", status),
            None => write!(f, "NEW"),
        }
    }
}

/// Errors surfaced by the workflow registry.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Unknown workflow: '{workflow_name}'")]
    UnknownWorkflow { workflow_name: String },

    #[error("Unknown claim ticket: '{claim_ticket}'")]
    UnknownClaimTicket { claim_ticket: String },

    #[error("Claim ticket '{claim_ticket}' does not belong to workflow '{workflow_name}'")]
    MismatchedClaimTicket {
        claim_ticket: String,
        workflow_name: String,
    },

    #[error("Unexpected error occurred while running a workflow - claimTicket = {claim_ticket}: {source}")]
    ExecutionFailure {
        claim_ticket: String,
        /// Step that failed, `None` when the run failed before any step.
        step: Option<String>,
        /// Snapshot of the context at the time of failure.
        context: Option<Box<ContextRecord>>,
        #[source]
        source: StepError,
    },

    #[error("Workflow state storage failure: {0}")]
    StorageFailure(#[from] StoreError),
}

impl WorkflowError {
    /// Stable client-facing error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ExecutionFailure { .. } => "WFE-001",
            Self::UnknownClaimTicket { .. } => "WFE-002",
            Self::MismatchedClaimTicket { .. } => "WFE-003",
            Self::UnknownWorkflow { .. } => "WFE-004",
            Self::StorageFailure(_) => "WFE-005",
        }
    }

    /// Returns true if the caller, not the engine, is at fault.
    pub fn is_user_error(&self) -> bool {
        match self {
            Self::UnknownWorkflow { .. }
            | Self::UnknownClaimTicket { .. }
            | Self::MismatchedClaimTicket { .. } => true,
            Self::ExecutionFailure { source, .. } => caused_by_user(source.as_ref()),
            Self::StorageFailure(_) => false,
        }
    }

    /// Claim ticket involved in the failure, if known.
    pub fn claim_ticket(&self) -> Option<&str> {
        match self {
            Self::UnknownClaimTicket { claim_ticket }
            | Self::MismatchedClaimTicket { claim_ticket, .. }
            | Self::ExecutionFailure { claim_ticket, .. } => Some(claim_ticket),
            Self::UnknownWorkflow { .. } | Self::StorageFailure(_) => None,
        }
    }

    /// Decodes the diagnostic context carried by an execution failure.
    pub fn context_as<C: DeserializeOwned>(&self) -> Option<C> {
        match self {
            Self::ExecutionFailure {
                context: Some(record),
                ..
            } => serde_json::from_value(record.context.clone()).ok(),
            _ => None,
        }
    }
}

/// Walks the source chain looking for a [`UserError`].
fn caused_by_user(error: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(error);
    while let Some(err) = current {
        if err.is::<UserError>() {
            return true;
        }
        current = err.source();
    }
    false
}
