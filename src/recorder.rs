//! The recording surface shared by every metrics sink.
//!
//! Agent drivers written against [`RecordMetrics`] work unchanged with a bare
//! [`AgentMetrics`], a [`FinalizeGuard`](crate::FinalizeGuard), or a shared
//! [`MetricsContext`](crate::MetricsContext).

use crate::metrics::AgentMetrics;

/// Anything that accepts observations from a running agent loop.
///
/// # Example
///
/// ```rust
/// use agent_quality::{AgentMetrics, RecordMetrics};
///
/// fn drive(recorder: &mut dyn RecordMetrics) {
///     recorder.record_turn(120, 40);
///     recorder.record_tool_call("search", 1);
/// }
///
/// let mut metrics = AgentMetrics::new("test-model");
/// drive(&mut metrics);
/// assert_eq!(metrics.tool_count(), 1);
/// ```
pub trait RecordMetrics {
    /// Record token usage for one turn.
    fn record_turn(&mut self, input_tokens: usize, output_tokens: usize);

    /// Record a call to `tool_name` on `turn`.
    fn record_tool_call(&mut self, tool_name: &str, turn: usize);

    /// Record one nudge.
    fn record_nudge(&mut self);

    /// Record how many tool declarations were sent with the request.
    fn record_tool_declarations(&mut self, count: usize);
}

impl RecordMetrics for AgentMetrics {
    fn record_turn(&mut self, input_tokens: usize, output_tokens: usize) {
        AgentMetrics::record_turn(self, input_tokens, output_tokens);
    }

    fn record_tool_call(&mut self, tool_name: &str, turn: usize) {
        AgentMetrics::record_tool_call(self, tool_name, turn);
    }

    fn record_nudge(&mut self) {
        AgentMetrics::record_nudge(self);
    }

    fn record_tool_declarations(&mut self, count: usize) {
        AgentMetrics::record_tool_declarations(self, count);
    }
}
