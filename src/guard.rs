//! Scoped finalization for synchronous agent loops.

use std::ops::Deref;

use tracing::debug;

use crate::metrics::AgentMetrics;
use crate::recorder::RecordMetrics;

/// Borrows an [`AgentMetrics`] for the duration of an agent loop and
/// finalizes it on every exit path.
///
/// The loop declares the terminal shape as it goes with
/// [`set_turns`](Self::set_turns) and [`set_has_response`](Self::set_has_response).
/// If the guard is dropped without [`finish`](Self::finish), whether by an
/// early return, a `?` or a panic, it finalizes with the last declared values.
///
/// # Example
///
/// ```rust
/// use agent_quality::{AgentMetrics, FinalizeGuard, RecordMetrics};
///
/// fn agent_loop(guard: &mut FinalizeGuard<'_>) -> Result<(), String> {
///     guard.set_turns(1);
///     guard.record_turn(200, 80);
///     guard.record_tool_call("write_file", 1);
///     guard.set_turns(2);
///     Err("tool crashed".to_string())
/// }
///
/// let mut metrics = AgentMetrics::new("test-model");
/// {
///     let mut guard = FinalizeGuard::new(&mut metrics);
///     assert!(agent_loop(&mut guard).is_err());
/// }
///
/// assert!(metrics.is_finalized());
/// assert_eq!(metrics.turns(), 2);
/// assert!(!metrics.has_response());
/// assert_eq!(metrics.first_tool_turn(), Some(1));
/// ```
pub struct FinalizeGuard<'a> {
    metrics: &'a mut AgentMetrics,
    turns: usize,
    has_response: bool,
    finished: bool,
}

impl<'a> FinalizeGuard<'a> {
    /// Guard `metrics`, defaulting to zero turns and no response.
    pub fn new(metrics: &'a mut AgentMetrics) -> Self {
        Self {
            metrics,
            turns: 0,
            has_response: false,
            finished: false,
        }
    }

    /// Declare the number of turns taken so far.
    pub fn set_turns(&mut self, turns: usize) {
        self.turns = turns;
    }

    /// Declare whether the agent has produced a final answer.
    pub fn set_has_response(&mut self, has_response: bool) {
        self.has_response = has_response;
    }

    /// Finalize now with explicit values, consuming the guard.
    pub fn finish(mut self, turns: usize, has_response: bool) {
        self.turns = turns;
        self.has_response = has_response;
        self.finalize_now();
    }

    fn finalize_now(&mut self) {
        if !self.finished {
            self.finished = true;
            self.metrics.finalize(self.turns, self.has_response);
        }
    }
}

impl Deref for FinalizeGuard<'_> {
    type Target = AgentMetrics;

    fn deref(&self) -> &AgentMetrics {
        self.metrics
    }
}

impl RecordMetrics for FinalizeGuard<'_> {
    fn record_turn(&mut self, input_tokens: usize, output_tokens: usize) {
        self.metrics.record_turn(input_tokens, output_tokens);
    }

    fn record_tool_call(&mut self, tool_name: &str, turn: usize) {
        self.metrics.record_tool_call(tool_name, turn);
    }

    fn record_nudge(&mut self) {
        self.metrics.record_nudge();
    }

    fn record_tool_declarations(&mut self, count: usize) {
        self.metrics.record_tool_declarations(count);
    }
}

impl Drop for FinalizeGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            debug!(
                model = %self.metrics.model(),
                turns = self.turns,
                panicking = std::thread::panicking(),
                "finalizing metrics on guard drop"
            );
        }
        self.finalize_now();
    }
}
