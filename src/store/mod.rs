//! Workflow State Persistence
//!
//! Checkpoints workflow contexts so that a run can be inspected by claim
//! ticket while it executes and after it finishes.
//!
//! Two layers:
//!
//! - [`BlobStore`]: a keyed byte store (`put`/`get`/`delete`). Backends are
//!   [`MemoryBlobStore`] and [`DiskBlobStore`].
//! - [`StateStore`]: encodes contexts as [`ContextRecord`] JSON documents
//!   under `<ticket>_state` and decodes them back, checking the type tag.
//!
//! The store does no locking. Concurrent writers to the same ticket race
//! and the last write wins; the engine only ever drives a ticket from one
//! run at a time.

pub mod disk;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::workflow::{ClaimTicket, WorkflowContext, WorkflowStatus};

pub use disk::DiskBlobStore;
pub use memory::MemoryBlobStore;

/// Suffix appended to a claim ticket to form its storage key.
pub const STATE_KEY_SUFFIX: &str = "_state";

/// Returns the storage key for a claim ticket.
pub fn state_key(claim_ticket: &str) -> String {
    format!("{}{}", claim_ticket, STATE_KEY_SUFFIX)
}

/// Keyed, durable byte storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` under `key`, replacing any previous value.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError>;

    /// Returns the bytes stored under `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Removes `key`. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Persisted form of a workflow context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextRecord {
    /// [`WorkflowContext::TYPE_TAG`] of the context that wrote this record
    pub type_tag: String,
    pub claim_ticket: String,
    pub workflow_name: String,
    pub status: Option<WorkflowStatus>,
    /// When the checkpoint was taken
    pub saved_at: DateTime<Utc>,
    /// The full context, workflow-specific fields included
    pub context: serde_json::Value,
}

impl ContextRecord {
    /// Snapshots a context.
    pub fn capture<C: WorkflowContext>(context: &C) -> Result<Self, serde_json::Error> {
        Ok(Self {
            type_tag: C::TYPE_TAG.to_string(),
            claim_ticket: context.claim_ticket().to_string(),
            workflow_name: context.workflow_name().to_string(),
            status: context.status(),
            saved_at: Utc::now(),
            context: serde_json::to_value(context)?,
        })
    }

    /// Decodes the snapshot as `C`, or `None` if it was written by another type.
    pub fn decode<C: WorkflowContext>(&self) -> Option<C> {
        if self.type_tag != C::TYPE_TAG {
            return None;
        }
        serde_json::from_value(self.context.clone()).ok()
    }

    pub fn to_claim_ticket(&self) -> ClaimTicket {
        ClaimTicket {
            claim_ticket: self.claim_ticket.clone(),
            status: self.status,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Context persistence keyed by claim ticket.
#[derive(Clone)]
pub struct StateStore {
    blobs: Arc<dyn BlobStore>,
}

impl StateStore {
    /// Creates a state store on top of a blob backend.
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    /// Creates a state store backed by a fresh in-memory blob store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBlobStore::new()))
    }

    /// Returns true if both stores write to the same blob backend.
    pub fn shares_backend(&self, other: &StateStore) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.blobs) as *const (),
            Arc::as_ptr(&other.blobs) as *const (),
        )
    }

    /// Persists `context` under `claim_ticket`, overwriting any previous state.
    ///
    /// Failures are logged and returned; callers must treat them as fatal.
    pub async fn save<C: WorkflowContext>(
        &self,
        claim_ticket: &str,
        context: &C,
    ) -> Result<(), StoreError> {
        let key = state_key(claim_ticket);
        let bytes = ContextRecord::capture(context)
            .and_then(|record| record.to_bytes())
            .map_err(|source| StoreError::Encoding {
                key: key.clone(),
                source,
            })?;

        if let Err(e) = self.blobs.put(&key, bytes).await {
            error!("Unable to save workflow state ({}): {}", key, e);
            return Err(e);
        }

        debug!("Saved workflow state {} ({:?})", key, context.status());
        Ok(())
    }

    /// Loads the context stored under `claim_ticket` as type `C`.
    ///
    /// Absence is a normal outcome: missing, unreadable, and foreign-typed
    /// records all yield `None`.
    pub async fn find<C: WorkflowContext>(&self, claim_ticket: &str) -> Option<C> {
        let record = self.find_record(claim_ticket).await?;
        let context = record.decode::<C>();
        if context.is_none() {
            debug!(
                "State for {} has type '{}', expected '{}'",
                claim_ticket,
                record.type_tag,
                C::TYPE_TAG
            );
        }
        context
    }

    /// Loads the raw record stored under `claim_ticket`, whatever its type.
    pub async fn find_record(&self, claim_ticket: &str) -> Option<ContextRecord> {
        self.read_record(claim_ticket).await.ok().flatten()
    }

    /// Like [`find_record`](Self::find_record), but a failing backend read
    /// is returned as an error instead of being reported as absence.
    /// Undecodable records still yield `None`.
    pub async fn read_record(
        &self,
        claim_ticket: &str,
    ) -> Result<Option<ContextRecord>, StoreError> {
        let key = state_key(claim_ticket);
        let bytes = match self.blobs.get(&key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Ok(None),
            Err(e) => {
                error!("Unable to read workflow state ({}): {}", key, e);
                return Err(e);
            }
        };

        match ContextRecord::from_bytes(&bytes) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!("Unable to decode workflow state ({}): {}", key, e);
                Ok(None)
            }
        }
    }

    /// Removes the state for `claim_ticket`.
    ///
    /// Best effort: failures are logged, never returned.
    pub async fn delete(&self, claim_ticket: &str) {
        let key = state_key(claim_ticket);
        match self.blobs.delete(&key).await {
            Ok(()) => debug!("Deleted workflow state {}", key),
            Err(e) => warn!("Unable to delete workflow state ({}): {}", key, e),
        }
    }
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore").finish_non_exhaustive()
    }
}
