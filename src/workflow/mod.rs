//! Workflow Definition Module
//!
//! Provides the context contract shared by all workflows and the
//! registry that dispatches runs by workflow name.
//!
//! # Structure
//!
//! - [`context`]: Context header, status lifecycle, claim tickets
//! - [`registry`]: Name resolution, aliasing, run/status/delete

pub mod context;
pub mod registry;

pub use context::{
    ClaimTicket, ContextHeader, FinalContent, WorkflowContext, WorkflowStatus,
    DEFAULT_CONTENT_TYPE,
};
pub use registry::{canonical_name, WorkflowRegistry};
