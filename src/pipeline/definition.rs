//! Pipeline Definition
//!
//! A [`Pipeline`] is the fixed, ordered list of steps for one workflow
//! type, wrapped in the status lifecycle:
//!
//! 1. status set to `RUNNING`, context checkpointed
//! 2. each step runs on the previous step's output; its output is
//!    checkpointed before the next step starts
//! 3. status set to `COMPLETED`, context checkpointed
//!
//! A failing step aborts the run: later steps and the `COMPLETED`
//! checkpoint are skipped. What the store holds afterwards depends on
//! [`FailureCheckpoint`].

use std::sync::Arc;

use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::step::Step;
use super::timeline::{EventType, StepTimeline};
use crate::error::{InvalidTransition, StepError, StoreError};
use crate::store::StateStore;
use crate::workflow::{WorkflowContext, WorkflowStatus};

/// What the pipeline persists when a step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCheckpoint {
    /// Checkpoint the last good context with status `FAILED`.
    #[default]
    MarkFailed,
    /// Keep the last step-boundary checkpoint as is (status `RUNNING`).
    /// Such records need manual reconciliation.
    LeaveRunning,
}

/// Failure of a pipeline run. Every variant carries the context as it
/// stood when the run stopped.
#[derive(Debug, Error)]
pub enum PipelineError<C> {
    #[error("Step '{step}' failed: {source}")]
    Step {
        step: String,
        context: Box<C>,
        #[source]
        source: StepError,
    },

    #[error("Failed to checkpoint workflow state: {source}")]
    Storage {
        context: Box<C>,
        #[source]
        source: StoreError,
    },

    #[error("Workflow lifecycle violation: {source}")]
    Lifecycle {
        context: Box<C>,
        #[source]
        source: InvalidTransition,
    },
}

impl<C> PipelineError<C> {
    /// The context at the point of failure.
    pub fn context(&self) -> &C {
        match self {
            Self::Step { context, .. }
            | Self::Storage { context, .. }
            | Self::Lifecycle { context, .. } => context,
        }
    }

    pub fn into_context(self) -> C {
        match self {
            Self::Step { context, .. }
            | Self::Storage { context, .. }
            | Self::Lifecycle { context, .. } => *context,
        }
    }

    /// Name of the failed step, if a step failed.
    pub fn step(&self) -> Option<&str> {
        match self {
            Self::Step { step, .. } => Some(step),
            _ => None,
        }
    }
}

/// The ordered steps of one workflow type plus lifecycle handling.
///
/// # Example
///
/// ```
/// # use serde::{Deserialize, Serialize};
/// # use ticketflow::workflow::{ContextHeader, WorkflowContext, WorkflowStatus};
/// use ticketflow::error::StepError;
/// use ticketflow::pipeline::{FnStep, Pipeline};
/// use ticketflow::store::StateStore;
///
/// # #[derive(Debug, Clone, Serialize, Deserialize)]
/// # struct Counter { header: ContextHeader, value: u32 }
/// # impl WorkflowContext for Counter {
/// #     const TYPE_TAG: &'static str = "counter";
/// #     fn header(&self) -> &ContextHeader { &self.header }
/// #     fn header_mut(&mut self) -> &mut ContextHeader { &mut self.header }
/// # }
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let pipeline = Pipeline::builder(StateStore::in_memory())
///     .step(FnStep::new("increment", |mut c: Counter| async move {
///         c.value += 1;
///         Ok::<_, StepError>(c)
///     }))
///     .build();
///
/// let initial = Counter { header: ContextHeader::new("counter"), value: 0 };
/// let done = pipeline.create_workflow(initial).await.unwrap();
/// assert_eq!(done.value, 1);
/// assert_eq!(done.status(), Some(WorkflowStatus::Completed));
/// # }
/// ```
pub struct Pipeline<C: WorkflowContext> {
    steps: Vec<Arc<dyn Step<C>>>,
    state_store: StateStore,
    failure_checkpoint: FailureCheckpoint,
}

impl<C: WorkflowContext> Pipeline<C> {
    /// Starts building a pipeline that checkpoints into `state_store`.
    pub fn builder(state_store: StateStore) -> PipelineBuilder<C> {
        PipelineBuilder {
            steps: Vec::new(),
            state_store,
            failure_checkpoint: FailureCheckpoint::default(),
        }
    }

    pub(crate) fn state_store(&self) -> &StateStore {
        &self.state_store
    }

    /// Step names in execution order.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Runs every step over `initial` and returns the completed context.
    ///
    /// The context must be new (no status yet).
    pub async fn create_workflow(&self, initial: C) -> Result<C, PipelineError<C>> {
        let mut context = initial;
        if let Err(source) = context.header_mut().transition(WorkflowStatus::Running) {
            return Err(PipelineError::Lifecycle {
                context: Box::new(context),
                source,
            });
        }

        info!(
            "Starting workflow '{}' - claimTicket = {}",
            context.workflow_name(),
            context.claim_ticket()
        );
        context = self.checkpoint(context).await?;

        let mut timeline = StepTimeline::new();
        for step in &self.steps {
            let name = step.name();
            let header = context.header().clone();
            let last_good = context.clone();

            debug!("Running step '{}' - claimTicket = {}", name, header.claim_ticket());
            timeline.add_event(name, EventType::Started);

            let outcome = match step.run(context).await {
                Ok(next) if next.header() == &header => Ok(next),
                Ok(_) => Err(StepError::from(format!(
                    "step '{}' modified the context header",
                    name
                ))),
                Err(source) => Err(source),
            };

            match outcome {
                Ok(next) => {
                    timeline.add_event(name, EventType::Completed);
                    context = self.checkpoint(next).await?;
                }
                Err(source) => {
                    timeline.add_event(name, EventType::Failed);
                    debug!("Step timings:\n{}", timeline.summary());
                    return Err(self.fail(name, last_good, source).await);
                }
            }
        }

        if let Err(source) = context.header_mut().transition(WorkflowStatus::Completed) {
            return Err(PipelineError::Lifecycle {
                context: Box::new(context),
                source,
            });
        }
        let context = self.checkpoint(context).await?;

        debug!("Step timings:\n{}", timeline.summary());
        info!(
            "Workflow '{}' completed in {:.2?} - claimTicket = {}",
            context.workflow_name(),
            timeline.elapsed(),
            context.claim_ticket()
        );
        Ok(context)
    }

    /// Persists `context`, handing it back for the next stage.
    async fn checkpoint(&self, context: C) -> Result<C, PipelineError<C>> {
        match self.state_store.save(context.claim_ticket(), &context).await {
            Ok(()) => Ok(context),
            Err(source) => Err(PipelineError::Storage {
                context: Box::new(context),
                source,
            }),
        }
    }

    /// Builds the error for a failed step, checkpointing `FAILED` first if
    /// configured to.
    async fn fail(&self, step: &str, mut context: C, source: StepError) -> PipelineError<C> {
        error!(
            "Step '{}' failed - claimTicket = {}: {}",
            step,
            context.claim_ticket(),
            source
        );

        if self.failure_checkpoint == FailureCheckpoint::MarkFailed
            && context.header_mut().transition(WorkflowStatus::Failed).is_ok()
        {
            if let Err(storage) = self.state_store.save(context.claim_ticket(), &context).await {
                return PipelineError::Storage {
                    context: Box::new(context),
                    source: storage,
                };
            }
        }

        PipelineError::Step {
            step: step.to_string(),
            context: Box::new(context),
            source,
        }
    }
}

/// Builder for [`Pipeline`].
pub struct PipelineBuilder<C: WorkflowContext> {
    steps: Vec<Arc<dyn Step<C>>>,
    state_store: StateStore,
    failure_checkpoint: FailureCheckpoint,
}

impl<C: WorkflowContext> PipelineBuilder<C> {
    /// Appends a step.
    pub fn step(mut self, step: impl Step<C> + 'static) -> Self {
        self.steps.push(Arc::new(step));
        self
    }

    pub fn failure_checkpoint(mut self, policy: FailureCheckpoint) -> Self {
        self.failure_checkpoint = policy;
        self
    }

    pub fn build(self) -> Pipeline<C> {
        Pipeline {
            steps: self.steps,
            state_store: self.state_store,
            failure_checkpoint: self.failure_checkpoint,
        }
    }
}
