//! Pipeline Execution Module
//!
//! Provides the step abstraction and the pipeline that chains steps,
//! drives the status lifecycle, and checkpoints after every step.
//!
//! # Architecture
//!
//! - [`step`]: The [`Step`] trait and the closure adapter [`FnStep`]
//! - [`definition`]: [`Pipeline`] and its builder
//! - [`timeline`]: Per-step timing for run reports

pub mod definition;
pub mod step;
pub mod timeline;

pub use definition::{FailureCheckpoint, Pipeline, PipelineBuilder, PipelineError};
pub use step::{FnStep, Step};
pub use timeline::StepTimeline;
