//! Workflow Context
//!
//! The state threaded through a workflow's steps. Every concrete context
//! type embeds a [`ContextHeader`] carrying the claim ticket, the owning
//! workflow name, and the lifecycle status; the rest of the fields are
//! workflow-specific.
//!
//! # Status lifecycle
//!
//! ```text
//! (new) ──> RUNNING ──> COMPLETED
//!   │          └──────> FAILED
//!   └─────────────────> FAILED   (dispatch failed before the run started)
//! ```
//!
//! The header exposes no public mutators: only the pipeline lifecycle
//! changes the status, and the claim ticket and workflow name are fixed
//! at construction.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{InvalidTransition, StatusLabel};

/// Lifecycle status of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    /// Steps are executing (or the process died mid-run)
    Running,
    /// All steps finished
    Completed,
    /// The run was aborted
    Failed,
}

impl WorkflowStatus {
    /// Returns true for states with no outgoing transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Checks whether `from -> to` is a legal transition.
    pub fn can_transition(from: Option<WorkflowStatus>, to: WorkflowStatus) -> bool {
        matches!(
            (from, to),
            (None, Self::Running)
                | (None, Self::Failed)
                | (Some(Self::Running), Self::Completed)
                | (Some(Self::Running), Self::Failed)
        )
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        };
        write!(f, "{}", label)
    }
}

/// Public projection of a workflow run: its ticket and current status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimTicket {
    pub claim_ticket: String,
    pub status: Option<WorkflowStatus>,
}

/// Fields shared by every workflow context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextHeader {
    claim_ticket: String,
    workflow_name: String,
    #[serde(default)]
    status: Option<WorkflowStatus>,
}

impl ContextHeader {
    /// Creates a header with a freshly minted claim ticket.
    pub fn new(workflow_name: impl Into<String>) -> Self {
        Self::with_claim_ticket(workflow_name, Uuid::new_v4().to_string())
    }

    /// Creates a header with a caller-supplied claim ticket.
    pub fn with_claim_ticket(
        workflow_name: impl Into<String>,
        claim_ticket: impl Into<String>,
    ) -> Self {
        Self {
            claim_ticket: claim_ticket.into(),
            workflow_name: workflow_name.into(),
            status: None,
        }
    }

    pub fn claim_ticket(&self) -> &str {
        &self.claim_ticket
    }

    pub fn workflow_name(&self) -> &str {
        &self.workflow_name
    }

    pub fn status(&self) -> Option<WorkflowStatus> {
        self.status
    }

    /// Moves the status forward, rejecting anything else.
    pub(crate) fn transition(&mut self, to: WorkflowStatus) -> Result<(), InvalidTransition> {
        if !WorkflowStatus::can_transition(self.status, to) {
            return Err(InvalidTransition {
                from: StatusLabel(self.status),
                to,
            });
        }
        self.status = Some(to);
        Ok(())
    }

    pub fn to_claim_ticket(&self) -> ClaimTicket {
        ClaimTicket {
            claim_ticket: self.claim_ticket.clone(),
            status: self.status,
        }
    }
}

/// Common contract of all workflow contexts.
///
/// `TYPE_TAG` is persisted next to the serialized context so that a
/// stored record is only ever decoded as the type that wrote it.
///
/// # Example
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use ticketflow::workflow::{ContextHeader, WorkflowContext};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct ExportContext {
///     header: ContextHeader,
///     rows: Vec<String>,
/// }
///
/// impl WorkflowContext for ExportContext {
///     const TYPE_TAG: &'static str = "export";
///     fn header(&self) -> &ContextHeader { &self.header }
///     fn header_mut(&mut self) -> &mut ContextHeader { &mut self.header }
/// }
///
/// let ctx = ExportContext { header: ContextHeader::new("export"), rows: vec![] };
/// assert_eq!(ctx.workflow_name(), "export");
/// assert!(ctx.status().is_none());
/// ```
pub trait WorkflowContext:
    Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static
{
    const TYPE_TAG: &'static str;

    fn header(&self) -> &ContextHeader;

    fn header_mut(&mut self) -> &mut ContextHeader;

    fn claim_ticket(&self) -> &str {
        self.header().claim_ticket()
    }

    fn workflow_name(&self) -> &str {
        self.header().workflow_name()
    }

    fn status(&self) -> Option<WorkflowStatus> {
        self.header().status()
    }

    fn to_claim_ticket(&self) -> ClaimTicket {
        self.header().to_claim_ticket()
    }
}

/// Content type reported when a context has produced nothing.
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// Contexts whose run produces a downloadable artifact.
pub trait FinalContent {
    /// The artifact bytes (empty if none was produced).
    fn final_content(&self) -> &[u8];

    /// Media type of [`final_content`](Self::final_content).
    fn final_content_type(&self) -> &str {
        DEFAULT_CONTENT_TYPE
    }
}
