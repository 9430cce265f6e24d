//! Per-invocation behavioral metrics for a tool-calling agent.
//!
//! This module provides [`AgentMetrics`], the recorder fed by the code that
//! drives one agent loop. It stores raw observations (per-turn token usage,
//! tool calls, nudges) and computes every quality signal from them on demand.
//!
//! Counts are `usize`, so negative token counts cannot be recorded and no
//! clamping takes place. Any other value, including a tool call on turn `0`,
//! is stored exactly as given: the recorder does not validate its input.
//! Token totals saturate at `usize::MAX` instead of overflowing.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Token usage observed for a single turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRecord {
    /// Prompt tokens sent on this turn.
    pub input_tokens: usize,
    /// Completion tokens produced on this turn.
    pub output_tokens: usize,
}

impl TurnRecord {
    /// Input plus output tokens for this turn, saturating at `usize::MAX`.
    pub fn total_tokens(&self) -> usize {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// A single tool call made by the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the tool the agent called.
    pub tool_name: String,
    /// Turn index on which the call happened.
    pub turn: usize,
}

/// Metrics for one agent invocation.
///
/// Created right before the agent loop starts, fed by the driving code while
/// the loop runs, and closed out by [`finalize`](Self::finalize). Every
/// recording method stays callable before and after finalize and never fails.
///
/// `turns` and `has_response` only carry meaning once [`is_finalized`]
/// returns `true`. Reading them on an unfinalized run yields their defaults.
///
/// [`is_finalized`]: Self::is_finalized
///
/// # Example
///
/// ```rust
/// use agent_quality::AgentMetrics;
///
/// let mut metrics = AgentMetrics::new("gemini-2.5-flash");
/// metrics.record_turn(200, 80);
/// metrics.record_tool_call("write_file", 1);
/// metrics.finalize(2, true);
///
/// assert_eq!(metrics.first_tool_turn(), Some(1));
/// assert_eq!(metrics.total_tokens(), 280);
/// assert!(!metrics.nudge_fired());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentMetrics {
    model: String,
    turn_records: Vec<TurnRecord>,
    tool_calls: Vec<ToolCall>,
    nudge_count: usize,
    tool_declarations_count: usize,
    turns: usize,
    has_response: bool,
    finalized: bool,
}

impl AgentMetrics {
    /// Create an empty recorder for a run of `model`.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    /// Record token usage for one turn.
    pub fn record_turn(&mut self, input_tokens: usize, output_tokens: usize) {
        trace!(
            model = %self.model,
            input_tokens,
            output_tokens,
            "recording turn"
        );
        self.turn_records.push(TurnRecord {
            input_tokens,
            output_tokens,
        });
    }

    /// Record a call to `tool_name` on `turn`.
    ///
    /// Calls may be recorded in any turn order.
    pub fn record_tool_call(&mut self, tool_name: impl Into<String>, turn: usize) {
        let tool_name = tool_name.into();
        trace!(model = %self.model, tool_name = %tool_name, turn, "recording tool call");
        self.tool_calls.push(ToolCall { tool_name, turn });
    }

    /// Record one nudge injected by the driving harness.
    pub fn record_nudge(&mut self) {
        self.nudge_count = self.nudge_count.saturating_add(1);
        debug!(model = %self.model, nudge_count = self.nudge_count, "nudge fired");
    }

    /// Record how many tool declarations were sent with the request.
    pub fn record_tool_declarations(&mut self, count: usize) {
        self.tool_declarations_count = count;
    }

    /// Fix the terminal shape of the run.
    ///
    /// Calling this again overwrites `turns` and `has_response` with the new
    /// values; the run stays finalized either way.
    pub fn finalize(&mut self, turns: usize, has_response: bool) {
        if self.finalized && (self.turns != turns || self.has_response != has_response) {
            debug!(
                model = %self.model,
                previous_turns = self.turns,
                turns,
                has_response,
                "overwriting finalized metrics"
            );
        }
        self.turns = turns;
        self.has_response = has_response;
        self.finalized = true;
        debug!(
            model = %self.model,
            turns,
            has_response,
            tool_count = self.tool_calls.len(),
            nudge_count = self.nudge_count,
            "metrics finalized"
        );
    }

    /// The model or configuration that produced this run.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Per-turn token usage, in recording order.
    pub fn turn_records(&self) -> &[TurnRecord] {
        &self.turn_records
    }

    /// Tool calls, in recording order.
    pub fn tool_calls(&self) -> &[ToolCall] {
        &self.tool_calls
    }

    /// Nudges recorded so far.
    pub fn nudge_count(&self) -> usize {
        self.nudge_count
    }

    /// Tool declarations sent with the request, as last recorded.
    pub fn tool_declarations_count(&self) -> usize {
        self.tool_declarations_count
    }

    /// Total turns declared at finalize.
    pub fn turns(&self) -> usize {
        self.turns
    }

    /// Whether the agent produced a final answer, as declared at finalize.
    pub fn has_response(&self) -> bool {
        self.has_response
    }

    /// Whether the run ended without a final answer.
    pub fn empty_response(&self) -> bool {
        !self.has_response
    }

    /// Whether [`finalize`](Self::finalize) has been called.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Earliest turn on which any tool was called, or `None` if no tool was used.
    pub fn first_tool_turn(&self) -> Option<usize> {
        self.tool_calls.iter().map(|call| call.turn).min()
    }

    /// Number of tool calls recorded.
    pub fn tool_count(&self) -> usize {
        self.tool_calls.len()
    }

    /// Names of the tools called, in recording order.
    pub fn tool_names(&self) -> impl Iterator<Item = &str> {
        self.tool_calls.iter().map(|call| call.tool_name.as_str())
    }

    /// Distinct tool names called during the run.
    pub fn unique_tools_used(&self) -> BTreeSet<&str> {
        self.tool_names().collect()
    }

    /// Input tokens across all recorded turns.
    pub fn total_input_tokens(&self) -> usize {
        saturating_sum(self.turn_records.iter().map(|r| r.input_tokens))
    }

    /// Output tokens across all recorded turns.
    pub fn total_output_tokens(&self) -> usize {
        saturating_sum(self.turn_records.iter().map(|r| r.output_tokens))
    }

    /// Input plus output tokens across all recorded turns.
    pub fn total_tokens(&self) -> usize {
        saturating_sum(self.turn_records.iter().map(TurnRecord::total_tokens))
    }

    /// Whether at least one nudge fired.
    pub fn nudge_fired(&self) -> bool {
        self.nudge_count > 0
    }

    /// Nudges per turn, or `None` when the run declared zero turns.
    pub fn nudge_rate(&self) -> Option<f64> {
        if self.turns == 0 {
            return None;
        }
        Some(self.nudge_count as f64 / self.turns as f64)
    }
}

fn saturating_sum(values: impl Iterator<Item = usize>) -> usize {
    values.fold(0, usize::saturating_add)
}
