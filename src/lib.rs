//! Ticketflow - Checkpointing Workflow Engine
//!
//! Runs named, multi-step asynchronous jobs identified by an opaque claim
//! ticket. Each step transforms a shared serializable context, and the
//! context is checkpointed after every step so that clients can poll for
//! status, fetch the final output, or delete a job by ticket.
//!
//! # Architecture
//!
//! The library is organized into these modules:
//!
//! - [`workflow`]: Context contract, status lifecycle, and the registry
//! - [`pipeline`]: Steps and the pipeline that chains them
//! - [`store`]: Context persistence over a byte-oriented blob store
//! - [`error`]: Error taxonomy with client-facing error codes
//! - [`config`]: YAML engine configuration
//! - [`slides`]: The `build-slides` workflow (set list to slide deck)
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use ticketflow::slides::{build_slides_pipeline, BuildSlidesContext, MemoryCatalog};
//! use ticketflow::store::{DiskBlobStore, StateStore};
//! use ticketflow::workflow::WorkflowRegistry;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = StateStore::new(Arc::new(DiskBlobStore::new("/tmp/ticketflow")));
//!     let catalog = Arc::new(MemoryCatalog::sample()?);
//!
//!     let mut registry = WorkflowRegistry::new(store.clone());
//!     registry.register(
//!         "build-slides",
//!         build_slides_pipeline(store, catalog.clone(), catalog, Default::default(), Default::default()),
//!     );
//!
//!     let done = registry.run(BuildSlidesContext::new("sunday-morning")).await?;
//!     println!("{} bytes", done.content.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod slides;
pub mod store;
pub mod workflow;

// Re-export commonly used types
pub use config::{load_config, EngineConfig};
pub use error::{StepError, UserError, WorkflowError};
pub use pipeline::{FailureCheckpoint, FnStep, Pipeline, Step};
pub use store::StateStore;
pub use workflow::{ClaimTicket, ContextHeader, WorkflowContext, WorkflowRegistry, WorkflowStatus};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "Ticketflow";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_version() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_app_name() {
        assert_eq!(APP_NAME, "Ticketflow");
    }

    #[test]
    fn test_module_exports_header() {
        let header = ContextHeader::with_claim_ticket("demo", "T1");
        assert_eq!(header.claim_ticket(), "T1");
        assert_eq!(header.workflow_name(), "demo");
        assert!(header.status().is_none());
    }

    #[test]
    fn test_module_exports_config() {
        let config = EngineConfig::default();
        assert_eq!(config.failure_checkpoint, FailureCheckpoint::MarkFailed);
    }
}
