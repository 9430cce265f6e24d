//! Shared metrics handle for async agent loops.
//!
//! This module provides [`MetricsContext`], a cloneable handle around one
//! [`AgentMetrics`] that can be moved into futures and spawned tasks. It also
//! carries the pending terminal shape (turns, response) that
//! [`Invocation`](crate::Invocation) applies when it finalizes the run.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::metrics::AgentMetrics;
use crate::recorder::RecordMetrics;

#[derive(Debug, Default)]
struct Pending {
    turns: usize,
    has_response: Option<bool>,
}

/// Handle passed to an async agent loop for recording metrics.
///
/// Clones share the same underlying metrics. A lock poisoned by a panicking
/// agent loop is recovered, so whatever was recorded before the panic stays
/// readable.
///
/// # Example
///
/// ```rust
/// use agent_quality::MetricsContext;
///
/// let ctx = MetricsContext::new("test-model");
/// let task_ctx = ctx.clone();
/// task_ctx.record_turn(150, 30);
/// task_ctx.record_tool_call("search", 1);
/// task_ctx.set_turns(1);
///
/// let snapshot = ctx.snapshot();
/// assert_eq!(snapshot.total_tokens(), 180);
/// assert_eq!(snapshot.first_tool_turn(), Some(1));
/// ```
#[derive(Debug, Clone)]
pub struct MetricsContext {
    metrics: Arc<Mutex<AgentMetrics>>,
    pending: Arc<Mutex<Pending>>,
}

impl MetricsContext {
    /// Create a context around fresh metrics for `model`.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self::from_metrics(AgentMetrics::new(model))
    }

    /// Create a context around existing metrics.
    #[must_use]
    pub fn from_metrics(metrics: AgentMetrics) -> Self {
        Self {
            metrics: Arc::new(Mutex::new(metrics)),
            pending: Arc::new(Mutex::new(Pending::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, AgentMetrics> {
        self.metrics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_pending(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record token usage for one turn.
    pub fn record_turn(&self, input_tokens: usize, output_tokens: usize) {
        self.lock().record_turn(input_tokens, output_tokens);
    }

    /// Record a call to `tool_name` on `turn`.
    pub fn record_tool_call(&self, tool_name: impl Into<String>, turn: usize) {
        self.lock().record_tool_call(tool_name, turn);
    }

    /// Record one nudge.
    pub fn record_nudge(&self) {
        self.lock().record_nudge();
    }

    /// Record how many tool declarations were sent with the request.
    pub fn record_tool_declarations(&self, count: usize) {
        self.lock().record_tool_declarations(count);
    }

    /// Declare the number of turns taken so far.
    pub fn set_turns(&self, turns: usize) {
        self.lock_pending().turns = turns;
    }

    /// Declare whether the agent has produced a final answer.
    ///
    /// If never declared, [`Invocation`](crate::Invocation) infers it from
    /// whether the loop returned `Ok`.
    pub fn set_has_response(&self, has_response: bool) {
        self.lock_pending().has_response = Some(has_response);
    }

    /// Turns declared so far.
    pub fn declared_turns(&self) -> usize {
        self.lock_pending().turns
    }

    /// Finalize with the declared turns, falling back to `default_response`
    /// when no response was declared.
    pub fn finalize_pending(&self, default_response: bool) {
        let (turns, has_response) = {
            let pending = self.lock_pending();
            (pending.turns, pending.has_response.unwrap_or(default_response))
        };
        self.finalize(turns, has_response);
    }

    /// Finalize the underlying metrics.
    ///
    /// The values also become the pending terminal shape, so a later
    /// [`finalize_pending`](Self::finalize_pending) reasserts them.
    pub fn finalize(&self, turns: usize, has_response: bool) {
        {
            let mut pending = self.lock_pending();
            pending.turns = turns;
            pending.has_response = Some(has_response);
        }
        self.lock().finalize(turns, has_response);
    }

    /// Get a snapshot of the current metrics.
    #[must_use]
    pub fn snapshot(&self) -> AgentMetrics {
        self.lock().clone()
    }
}

impl RecordMetrics for MetricsContext {
    fn record_turn(&mut self, input_tokens: usize, output_tokens: usize) {
        MetricsContext::record_turn(self, input_tokens, output_tokens);
    }

    fn record_tool_call(&mut self, tool_name: &str, turn: usize) {
        MetricsContext::record_tool_call(self, tool_name, turn);
    }

    fn record_nudge(&mut self) {
        MetricsContext::record_nudge(self);
    }

    fn record_tool_declarations(&mut self, count: usize) {
        MetricsContext::record_tool_declarations(self, count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_metrics() {
        let ctx = MetricsContext::new("m");
        let other = ctx.clone();
        other.record_nudge();
        other.record_turn(3, 4);
        assert_eq!(ctx.snapshot().nudge_count(), 1);
        assert_eq!(ctx.snapshot().total_tokens(), 7);
    }

    #[test]
    fn test_finalize_pending_prefers_declared_response() {
        let ctx = MetricsContext::new("m");
        ctx.set_turns(5);
        ctx.set_has_response(false);
        ctx.finalize_pending(true);

        let m = ctx.snapshot();
        assert!(m.is_finalized());
        assert_eq!(m.turns(), 5);
        assert!(!m.has_response());
    }

    #[test]
    fn test_finalize_pending_falls_back_to_default() {
        let ctx = MetricsContext::new("m");
        ctx.set_turns(2);
        ctx.finalize_pending(true);
        assert!(ctx.snapshot().has_response());
        assert_eq!(ctx.declared_turns(), 2);
    }

    #[test]
    fn test_explicit_finalize_survives_finalize_pending() {
        let ctx = MetricsContext::new("m");
        ctx.finalize(3, false);
        ctx.finalize_pending(true);

        let m = ctx.snapshot();
        assert_eq!(m.turns(), 3);
        assert!(!m.has_response());
        assert_eq!(ctx.declared_turns(), 3);
    }

    #[test]
    fn test_poisoned_lock_is_recovered() {
        let ctx = MetricsContext::new("m");
        ctx.record_tool_call("write_file", 1);

        let poisoner = ctx.clone();
        let handle = std::thread::spawn(move || {
            let _held = poisoner.metrics.lock().unwrap();
            panic!("agent task crashed while recording");
        });
        assert!(handle.join().is_err());

        ctx.record_nudge();
        ctx.finalize(1, false);
        let m = ctx.snapshot();
        assert_eq!(m.tool_count(), 1);
        assert!(m.nudge_fired());
        assert!(m.is_finalized());
    }

    #[tokio::test]
    async fn test_concurrent_tasks_record_into_one_run() {
        let ctx = MetricsContext::new("m");
        let mut handles = Vec::new();
        for turn in 1..=4 {
            let ctx = ctx.clone();
            handles.push(tokio::spawn(async move {
                ctx.record_tool_call("fetch", turn);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(ctx.snapshot().tool_count(), 4);
        assert_eq!(ctx.snapshot().first_tool_turn(), Some(1));
    }
}
