//! Workflow Steps
//!
//! A step is one unit of work in a pipeline: it takes the context by
//! value and hands back the updated context. Steps may perform I/O and
//! may fail; the pipeline never re-invokes a failed step.
//!
//! Steps own only their workflow-specific fields. The pipeline checks
//! that a step hands back the context header unchanged.

use std::future::Future;

use async_trait::async_trait;

use crate::error::StepError;

/// A single unit of work over a context of type `C`.
#[async_trait]
pub trait Step<C>: Send + Sync
where
    C: Send + 'static,
{
    /// Name used in logs and failure reports.
    fn name(&self) -> &str;

    /// Runs the step, returning the updated context.
    ///
    /// Given the same input context, a step should produce the same
    /// output context.
    async fn run(&self, context: C) -> Result<C, StepError>;
}

/// Adapts an async closure into a [`Step`].
///
/// # Example
///
/// ```
/// use ticketflow::error::StepError;
/// use ticketflow::pipeline::FnStep;
///
/// let step = FnStep::new("double", |n: u32| async move { Ok::<_, StepError>(n * 2) });
/// assert_eq!(step.name(), "double");
/// ```
pub struct FnStep<F> {
    name: String,
    func: F,
}

impl<F> FnStep<F> {
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl<C, F, Fut> Step<C> for FnStep<F>
where
    C: Send + 'static,
    F: Fn(C) -> Fut + Send + Sync,
    Fut: Future<Output = Result<C, StepError>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, context: C) -> Result<C, StepError> {
        (self.func)(context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fn_step_runs_closure() {
        let step = FnStep::new("append", |mut v: Vec<u32>| async move {
            v.push(1);
            Ok::<_, StepError>(v)
        });

        assert_eq!(step.name(), "append");
        assert_eq!(step.run(vec![0]).await.unwrap(), vec![0, 1]);
    }

    #[tokio::test]
    async fn test_fn_step_propagates_error() {
        let step = FnStep::new("fail", |_: u32| async move { Err::<u32, StepError>("nope".into()) });

        let err = step.run(7).await.unwrap_err();
        assert_eq!(err.to_string(), "nope");
    }
}
