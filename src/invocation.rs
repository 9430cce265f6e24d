//! Instrumented agent invocations with guaranteed finalization.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::{debug, warn};

use crate::{AgentMetrics, Error, MetricsContext, QualityThresholds, Result};

/// Runs one agent loop and always hands back finalized [`AgentMetrics`].
///
/// `Invocation` creates a fresh [`MetricsContext`] for each run and passes it
/// to the loop. When the loop returns, fails or panics, the metrics are
/// finalized with the turns the loop declared. If the loop never declared
/// whether it produced a response, a successful return counts as a response
/// and a failure or panic does not.
///
/// # Example
///
/// ```rust
/// use agent_quality::{Invocation, Error};
///
/// # tokio_test::block_on(async {
/// let invocation = Invocation::new("gemini-test").with_tool_declarations(4);
///
/// let (result, metrics) = invocation
///     .run(|ctx| async move {
///         ctx.set_turns(1);
///         ctx.record_turn(200, 80);
///         ctx.record_tool_call("write_file", 1);
///         Err::<(), _>(Error::Execution("rate limited".into()))
///     })
///     .await;
///
/// assert!(result.is_err());
/// assert!(metrics.is_finalized());
/// assert_eq!(metrics.first_tool_turn(), Some(1));
/// assert!(!metrics.has_response());
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct Invocation {
    model: String,
    tool_declarations: Option<usize>,
    thresholds: QualityThresholds,
}

impl Invocation {
    /// Create an invocation recording against `model`.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            tool_declarations: None,
            thresholds: QualityThresholds::default(),
        }
    }

    /// Record the number of tool declarations sent with each request.
    pub fn with_tool_declarations(mut self, count: usize) -> Self {
        self.tool_declarations = Some(count);
        self
    }

    /// Set the thresholds used by [`run_checked`](Self::run_checked).
    pub fn with_thresholds(mut self, thresholds: QualityThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Returns the model this invocation records against.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the thresholds applied by [`run_checked`](Self::run_checked).
    pub fn thresholds(&self) -> &QualityThresholds {
        &self.thresholds
    }

    /// Run the agent loop, returning its result along with finalized metrics.
    pub async fn run<F, Fut, T, E>(&self, agent_loop: F) -> (Result<T>, AgentMetrics)
    where
        F: FnOnce(MetricsContext) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Into<Error>,
    {
        let ctx = MetricsContext::new(self.model.clone());
        if let Some(count) = self.tool_declarations {
            ctx.record_tool_declarations(count);
        }

        let loop_ctx = ctx.clone();
        let outcome = AssertUnwindSafe(async move { agent_loop(loop_ctx).await })
            .catch_unwind()
            .await;

        let result = match outcome {
            Ok(result) => result.map_err(Into::into),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(model = %self.model, panic = %message, "agent loop panicked");
                Err(Error::Panicked(message))
            }
        };

        ctx.finalize_pending(result.is_ok());
        let metrics = ctx.snapshot();
        debug!(
            model = %self.model,
            ok = result.is_ok(),
            turns = metrics.turns(),
            "invocation finished"
        );
        (result, metrics)
    }

    /// Like [`run`](Self::run), but a successful run that breaks one of the
    /// configured thresholds is turned into the first violation found.
    pub async fn run_checked<F, Fut, T, E>(&self, agent_loop: F) -> (Result<T>, AgentMetrics)
    where
        F: FnOnce(MetricsContext) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Into<Error>,
    {
        let (result, metrics) = self.run(agent_loop).await;
        let result = result.and_then(|value| self.thresholds.check(&metrics).map(|()| value));
        (result, metrics)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}
