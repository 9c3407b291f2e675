//! Workflow Registry
//!
//! Maps logical workflow names to pipelines and exposes the operations
//! callers use: run a workflow, poll a claim ticket's status, delete a
//! ticket's state, and fetch a finished context.
//!
//! Names are normalized to lowercase-hyphenated form at registration
//! (see [`canonical_name`]). An alias table lets callers address a
//! pipeline by an alternate name.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use log::{info, warn};

use crate::error::{StatusLabel, StepError, WorkflowError};
use crate::pipeline::{Pipeline, PipelineBuilder, PipelineError};
use crate::store::{ContextRecord, StateStore};
use crate::workflow::{ClaimTicket, WorkflowContext, WorkflowStatus};

/// Identifier suffixes dropped when deriving a workflow name.
const NAME_SUFFIXES: &[&str] = &["WorkflowFactory", "Workflow", "Pipeline"];

/// Derives a lowercase-hyphenated workflow name from an identifier.
///
/// ```
/// use ticketflow::workflow::canonical_name;
///
/// assert_eq!(canonical_name("BuildSlidesWorkflowFactory"), "build-slides");
/// assert_eq!(canonical_name("songExport"), "song-export");
/// assert_eq!(canonical_name("PDFReport"), "pdf-report");
/// assert_eq!(canonical_name("build-slides"), "build-slides");
/// ```
pub fn canonical_name(identifier: &str) -> String {
    let trimmed = identifier.trim();
    let base = NAME_SUFFIXES
        .iter()
        .find_map(|suffix| {
            trimmed
                .strip_suffix(suffix)
                .filter(|rest| !rest.is_empty())
        })
        .unwrap_or(trimmed);

    let chars: Vec<char> = base.chars().collect();
    let mut name = String::with_capacity(base.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == ' ' || c == '-' {
            if !name.is_empty() && !name.ends_with('-') {
                name.push('-');
            }
            continue;
        }

        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).map_or(false, |n| n.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if boundary && !name.ends_with('-') {
                name.push('-');
            }
        }

        name.extend(c.to_lowercase());
    }

    name.trim_end_matches('-').to_string()
}

/// A registered pipeline with its context type erased.
struct Registration {
    type_tag: &'static str,
    pipeline: Arc<dyn Any + Send + Sync>,
}

/// Resolves workflow names to pipelines and serves claim tickets.
///
/// # Example
///
/// ```
/// # use serde::{Deserialize, Serialize};
/// # use ticketflow::workflow::{ContextHeader, WorkflowContext, WorkflowStatus};
/// use ticketflow::pipeline::Pipeline;
/// use ticketflow::store::StateStore;
/// use ticketflow::workflow::WorkflowRegistry;
///
/// # #[derive(Debug, Clone, Serialize, Deserialize)]
/// # struct Report { header: ContextHeader }
/// # impl WorkflowContext for Report {
/// #     const TYPE_TAG: &'static str = "report";
/// #     fn header(&self) -> &ContextHeader { &self.header }
/// #     fn header_mut(&mut self) -> &mut ContextHeader { &mut self.header }
/// # }
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let store = StateStore::in_memory();
/// let mut registry = WorkflowRegistry::new(store.clone());
/// registry.register("ReportWorkflow", Pipeline::<Report>::builder(store).build());
/// registry.alias("legacy-report", "report");
///
/// let initial = Report { header: ContextHeader::with_claim_ticket("legacy-report", "T1") };
/// registry.run(initial).await.unwrap();
///
/// let ticket = registry.status("T1").await.unwrap();
/// assert_eq!(ticket.status, Some(WorkflowStatus::Completed));
/// # }
/// ```
pub struct WorkflowRegistry {
    pipelines: HashMap<String, Registration>,
    aliases: HashMap<String, String>,
    state_store: StateStore,
}

impl WorkflowRegistry {
    /// Creates an empty registry reading ticket state from `state_store`.
    pub fn new(state_store: StateStore) -> Self {
        Self {
            pipelines: HashMap::new(),
            aliases: HashMap::new(),
            state_store,
        }
    }

    /// Starts a pipeline that checkpoints into this registry's store.
    pub fn pipeline<C: WorkflowContext>(&self) -> PipelineBuilder<C> {
        Pipeline::builder(self.state_store.clone())
    }

    /// Registers `pipeline` under the canonical form of `name` and returns
    /// that canonical name. A pipeline already registered under the same
    /// name is replaced.
    ///
    /// `status` and `delete` read the registry's store, so the pipeline
    /// must checkpoint into the same backend. Build it with
    /// [`pipeline`](Self::pipeline) or from a clone of the registry's store.
    pub fn register<C: WorkflowContext>(&mut self, name: &str, pipeline: Pipeline<C>) -> String {
        self.register_shared(name, Arc::new(pipeline))
    }

    /// Like [`register`](Self::register) for a pipeline that is shared.
    pub fn register_shared<C: WorkflowContext>(
        &mut self,
        name: &str,
        pipeline: Arc<Pipeline<C>>,
    ) -> String {
        let canonical = canonical_name(name);
        if !pipeline.state_store().shares_backend(&self.state_store) {
            warn!(
                "Workflow '{}' checkpoints into a different store - its tickets will not be visible to status or delete",
                canonical
            );
        }
        let registration = Registration {
            type_tag: C::TYPE_TAG,
            pipeline,
        };

        if self.pipelines.insert(canonical.clone(), registration).is_some() {
            warn!("Workflow '{}' was already registered - replacing", canonical);
        }
        info!("Registered workflows = {:?}", self.workflow_names());
        canonical
    }

    /// Adds an alias. The target is normalized like a registered name.
    pub fn alias(&mut self, alias: impl Into<String>, target: &str) -> &mut Self {
        self.aliases.insert(alias.into(), canonical_name(target));
        self
    }

    /// Adds every `alias -> target` pair from `aliases`.
    pub fn with_aliases<I, K, V>(&mut self, aliases: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        for (alias, target) in aliases {
            self.alias(alias, target.as_ref());
        }
        self
    }

    /// Registered canonical names, sorted.
    pub fn workflow_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.pipelines.keys().cloned().collect();
        names.sort();
        names
    }

    /// Alias table, sorted by alias.
    pub fn aliases(&self) -> BTreeMap<&str, &str> {
        self.aliases
            .iter()
            .map(|(alias, target)| (alias.as_str(), target.as_str()))
            .collect()
    }

    /// Resolves `name` to a registered canonical name.
    ///
    /// An alias wins when its target is registered; otherwise the name is
    /// looked up literally.
    pub fn resolve_name<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        if let Some(target) = self.aliases.get(name) {
            if self.pipelines.contains_key(target) {
                return Some(target.as_str());
            }
        }
        self.pipelines.get_key_value(name).map(|(key, _)| key.as_str())
    }

    /// Returns the pipeline registered for `name` with context type `C`.
    pub fn resolve<C: WorkflowContext>(&self, name: &str) -> Option<Arc<Pipeline<C>>> {
        let canonical = self.resolve_name(name)?;
        let registration = self.pipelines.get(canonical)?;
        registration.pipeline.clone().downcast::<Pipeline<C>>().ok()
    }

    /// Runs the workflow named by `initial`'s workflow name.
    ///
    /// # Errors
    ///
    /// * `UnknownWorkflow` - no pipeline is registered for the name
    /// * `ExecutionFailure` - the run could not start, or a step failed
    /// * `StorageFailure` - a checkpoint could not be written
    pub async fn run<C: WorkflowContext>(&self, initial: C) -> Result<C, WorkflowError> {
        let requested = initial.workflow_name().to_string();
        let canonical = self
            .resolve_name(&requested)
            .ok_or_else(|| WorkflowError::UnknownWorkflow {
                workflow_name: requested.clone(),
            })?;

        let registration = &self.pipelines[canonical];
        let pipeline = match registration.pipeline.clone().downcast::<Pipeline<C>>() {
            Ok(pipeline) => pipeline,
            Err(_) => {
                let reason = format!(
                    "workflow '{}' runs contexts of type '{}', got '{}'",
                    canonical,
                    registration.type_tag,
                    C::TYPE_TAG
                );
                return Err(dispatch_failure(initial, reason.into()));
            }
        };

        info!(
            "Running workflow '{}' (requested as '{}') - claimTicket = {}",
            canonical,
            requested,
            initial.claim_ticket()
        );
        pipeline.create_workflow(initial).await.map_err(execution_error)
    }

    /// Returns the claim ticket and status of a stored run.
    pub async fn status(&self, claim_ticket: &str) -> Result<ClaimTicket, WorkflowError> {
        let record = self.load_record(claim_ticket).await?;
        Ok(record.to_claim_ticket())
    }

    /// Deletes the stored state of a run owned by `workflow_name`.
    ///
    /// Deleting a `RUNNING` ticket abandons it: a step still in flight
    /// runs to completion and may write the state again.
    pub async fn delete(
        &self,
        workflow_name: &str,
        claim_ticket: &str,
    ) -> Result<ClaimTicket, WorkflowError> {
        let record = self.load_record(claim_ticket).await?;
        info!("Attempting to delete {} ({})", claim_ticket, record.workflow_name);

        if record.workflow_name != workflow_name {
            return Err(WorkflowError::MismatchedClaimTicket {
                claim_ticket: claim_ticket.to_string(),
                workflow_name: workflow_name.to_string(),
            });
        }

        if !record.status.map_or(false, WorkflowStatus::is_terminal) {
            warn!(
                "Deleting {} while {} - the run is abandoned, not cancelled",
                claim_ticket,
                StatusLabel(record.status)
            );
        }

        self.state_store.delete(claim_ticket).await;
        Ok(record.to_claim_ticket())
    }

    /// Returns the stored context of a run as type `C`.
    pub async fn content<C: WorkflowContext>(&self, claim_ticket: &str) -> Result<C, WorkflowError> {
        self.state_store
            .find::<C>(claim_ticket)
            .await
            .ok_or_else(|| WorkflowError::UnknownClaimTicket {
                claim_ticket: claim_ticket.to_string(),
            })
    }

    async fn load_record(&self, claim_ticket: &str) -> Result<ContextRecord, WorkflowError> {
        self.state_store
            .read_record(claim_ticket)
            .await?
            .ok_or_else(|| WorkflowError::UnknownClaimTicket {
                claim_ticket: claim_ticket.to_string(),
            })
    }
}

/// Marks a context that never started as `FAILED` and wraps the cause.
fn dispatch_failure<C: WorkflowContext>(mut context: C, source: StepError) -> WorkflowError {
    if let Err(e) = context.header_mut().transition(WorkflowStatus::Failed) {
        warn!("Could not mark {} as failed: {}", context.claim_ticket(), e);
    }
    WorkflowError::ExecutionFailure {
        claim_ticket: context.claim_ticket().to_string(),
        step: None,
        context: snapshot(&context),
        source,
    }
}

fn execution_error<C: WorkflowContext>(error: PipelineError<C>) -> WorkflowError {
    match error {
        PipelineError::Storage { source, .. } => WorkflowError::StorageFailure(source),
        PipelineError::Step {
            step,
            context,
            source,
        } => WorkflowError::ExecutionFailure {
            claim_ticket: context.claim_ticket().to_string(),
            step: Some(step),
            context: snapshot(&*context),
            source,
        },
        PipelineError::Lifecycle { context, source } => dispatch_failure(*context, Box::new(source)),
    }
}

fn snapshot<C: WorkflowContext>(context: &C) -> Option<Box<ContextRecord>> {
    match ContextRecord::capture(context) {
        Ok(record) => Some(Box::new(record)),
        Err(e) => {
            warn!("Could not capture context {}: {}", context.claim_ticket(), e);
            None
        }
    }
}

impl std::fmt::Debug for WorkflowRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowRegistry")
            .field("workflows", &self.workflow_names())
            .field("aliases", &self.aliases())
            .finish()
    }
}
