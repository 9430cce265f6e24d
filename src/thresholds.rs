//! Quality thresholds and caller-side assertions.
//!
//! The recorder never enforces these values. Test code owns a
//! [`QualityThresholds`] and passes it explicitly to the checks below, so the
//! same recorded run can be judged against different policies.
//!
//! # Example: asserting a run
//!
//! ```rust
//! use agent_quality::{AgentMetrics, QualityThresholds, Error};
//!
//! let mut metrics = AgentMetrics::new("test-model");
//! metrics.record_tool_call("write_file", 1);
//! metrics.finalize(9, true);
//!
//! let thresholds = QualityThresholds::default();
//! let err = thresholds.check(&metrics).unwrap_err();
//! assert!(matches!(err, Error::TooManyTurns { turns: 9, max: 8 }));
//! ```

use serde::{Deserialize, Serialize};

use crate::{AgentMetrics, Error, Result};

/// Tool declarations allowed in a single request.
pub const MAX_TOOLS_PER_REQUEST: usize = 6;
/// Latest turn on which the first tool call may happen.
pub const MAX_TURNS_TO_FIRST_TOOL: usize = 2;
/// Turns allowed to complete a run.
pub const MAX_TOTAL_TURNS: usize = 8;
/// Highest acceptable nudge rate.
pub const NUDGE_RATE_THRESHOLD: f64 = 0.3;

/// A set of quality ceilings for agent runs.
///
/// Deserializes from configuration; missing keys take the default constants.
///
/// ```rust
/// use agent_quality::QualityThresholds;
///
/// let thresholds = QualityThresholds::from_json(r#"{ "max_total_turns": 12 }"#).unwrap();
/// assert_eq!(thresholds.max_total_turns, 12);
/// assert_eq!(thresholds.max_turns_to_first_tool, 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    /// Tool declarations allowed in a single request.
    pub max_tools_per_request: usize,
    /// Latest turn on which the first tool call may happen.
    pub max_turns_to_first_tool: usize,
    /// Turns allowed to complete a run.
    pub max_total_turns: usize,
    /// Applies both to a single run's nudges-per-turn and to the fraction of
    /// runs whose nudge fired.
    pub nudge_rate_threshold: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            max_tools_per_request: MAX_TOOLS_PER_REQUEST,
            max_turns_to_first_tool: MAX_TURNS_TO_FIRST_TOOL,
            max_total_turns: MAX_TOTAL_TURNS,
            nudge_rate_threshold: NUDGE_RATE_THRESHOLD,
        }
    }
}

impl QualityThresholds {
    /// Parse thresholds from a JSON object.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the tool declaration ceiling.
    pub fn with_max_tools_per_request(mut self, max: usize) -> Self {
        self.max_tools_per_request = max;
        self
    }

    /// Set the latest acceptable first-tool turn.
    pub fn with_max_turns_to_first_tool(mut self, max: usize) -> Self {
        self.max_turns_to_first_tool = max;
        self
    }

    /// Set the turn budget.
    pub fn with_max_total_turns(mut self, max: usize) -> Self {
        self.max_total_turns = max;
        self
    }

    /// Set the highest acceptable nudge rate.
    pub fn with_nudge_rate_threshold(mut self, threshold: f64) -> Self {
        self.nudge_rate_threshold = threshold;
        self
    }

    /// Check a tool declaration count, e.g. the size of a filtered tool list.
    pub fn check_tool_declarations(&self, count: usize) -> Result<()> {
        if count > self.max_tools_per_request {
            return Err(Error::TooManyToolDeclarations {
                count,
                max: self.max_tools_per_request,
            });
        }
        Ok(())
    }

    /// Fails when the run declared more turns than allowed.
    pub fn check_total_turns(&self, metrics: &AgentMetrics) -> Result<()> {
        if metrics.turns() > self.max_total_turns {
            return Err(Error::TooManyTurns {
                turns: metrics.turns(),
                max: self.max_total_turns,
            });
        }
        Ok(())
    }

    /// Fails when no tool was called, or the first call came too late.
    pub fn check_first_tool_turn(&self, metrics: &AgentMetrics) -> Result<()> {
        match metrics.first_tool_turn() {
            None => Err(Error::NoToolUsed),
            Some(turn) if turn > self.max_turns_to_first_tool => Err(Error::FirstToolTooLate {
                turn,
                max: self.max_turns_to_first_tool,
            }),
            Some(_) => Ok(()),
        }
    }

    /// Check a single run's nudges per turn. A run with zero turns has no
    /// rate and passes.
    pub fn check_nudge_rate(&self, metrics: &AgentMetrics) -> Result<()> {
        match metrics.nudge_rate() {
            Some(rate) if rate > self.nudge_rate_threshold => Err(Error::NudgeRateExceeded {
                rate,
                threshold: self.nudge_rate_threshold,
            }),
            _ => Ok(()),
        }
    }

    /// Run every per-run check, returning the first violation.
    pub fn check(&self, metrics: &AgentMetrics) -> Result<()> {
        self.check_tool_declarations(metrics.tool_declarations_count())?;
        self.check_total_turns(metrics)?;
        self.check_first_tool_turn(metrics)?;
        self.check_nudge_rate(metrics)
    }

    /// Run every per-run check, collecting all violations.
    pub fn violations(&self, metrics: &AgentMetrics) -> Vec<Error> {
        [
            self.check_tool_declarations(metrics.tool_declarations_count()),
            self.check_total_turns(metrics),
            self.check_first_tool_turn(metrics),
            self.check_nudge_rate(metrics),
        ]
        .into_iter()
        .filter_map(Result::err)
        .collect()
    }

    /// Check the fraction of runs whose nudge fired. An empty set of runs passes.
    pub fn check_nudge_fire_rate(&self, runs: &[AgentMetrics]) -> Result<()> {
        match nudge_fire_rate(runs) {
            Some(rate) if rate > self.nudge_rate_threshold => Err(Error::NudgeRateExceeded {
                rate,
                threshold: self.nudge_rate_threshold,
            }),
            _ => Ok(()),
        }
    }
}

/// Fraction of `runs` in which at least one nudge fired, or `None` for no runs.
pub fn nudge_fire_rate(runs: &[AgentMetrics]) -> Option<f64> {
    if runs.is_empty() {
        return None;
    }
    let fired = runs.iter().filter(|m| m.nudge_fired()).count();
    Some(fired as f64 / runs.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(first_tool: Option<usize>, turns: usize, nudges: usize) -> AgentMetrics {
        let mut m = AgentMetrics::new("m");
        if let Some(turn) = first_tool {
            m.record_tool_call("write_file", turn);
        }
        for _ in 0..nudges {
            m.record_nudge();
        }
        m.finalize(turns, true);
        m
    }

    #[test]
    fn test_thresholds_reasonable() {
        assert!((1..=10).contains(&MAX_TOOLS_PER_REQUEST));
        assert!((1..=5).contains(&MAX_TURNS_TO_FIRST_TOOL));
        assert!((1..=15).contains(&MAX_TOTAL_TURNS));
        assert!(NUDGE_RATE_THRESHOLD > 0.0 && NUDGE_RATE_THRESHOLD < 1.0);
    }

    #[test]
    fn test_turn_budget() {
        let t = QualityThresholds::default();
        assert!(t.check_total_turns(&run(Some(1), 8, 0)).is_ok());
        let err = t.check_total_turns(&run(Some(1), 9, 0)).unwrap_err();
        assert!(matches!(err, Error::TooManyTurns { turns: 9, max: 8 }));
        assert!(err.is_violation());
    }

    #[test]
    fn test_first_tool_latency() {
        let t = QualityThresholds::default();
        assert!(t.check_first_tool_turn(&run(Some(2), 3, 0)).is_ok());
        assert!(matches!(
            t.check_first_tool_turn(&run(Some(3), 3, 0)),
            Err(Error::FirstToolTooLate { turn: 3, max: 2 })
        ));
        assert!(matches!(
            t.check_first_tool_turn(&run(None, 3, 0)),
            Err(Error::NoToolUsed)
        ));
    }

    #[test]
    fn test_tool_filter_effectiveness() {
        let t = QualityThresholds::default();
        let allowed = ["write_file", "create_directory", "append_file", "read_file"];
        assert!(t.check_tool_declarations(allowed.len()).is_ok());
        assert!(t.check_tool_declarations(7).is_err());
    }

    #[test]
    fn test_per_run_nudge_rate() {
        let t = QualityThresholds::default();
        assert!(t.check_nudge_rate(&run(Some(1), 10, 3)).is_ok());
        assert!(matches!(
            t.check_nudge_rate(&run(Some(1), 10, 4)),
            Err(Error::NudgeRateExceeded { .. })
        ));
        assert!(t.check_nudge_rate(&run(Some(1), 0, 4)).is_ok());
    }

    #[test]
    fn test_violations_collects_all() {
        let t = QualityThresholds::default();
        let mut m = run(None, 12, 6);
        m.record_tool_declarations(9);
        let v = t.violations(&m);
        assert_eq!(v.len(), 4);
        assert!(v.iter().all(Error::is_violation));
        assert!(t.violations(&run(Some(1), 3, 0)).is_empty());
        assert!(t.check(&run(Some(1), 3, 0)).is_ok());
    }

    #[test]
    fn test_nudge_fire_rate_across_runs() {
        let mut runs: Vec<_> = (0..8).map(|_| run(Some(1), 2, 0)).collect();
        runs.extend((0..2).map(|_| run(Some(1), 2, 1)));
        assert_eq!(nudge_fire_rate(&runs), Some(0.2));

        let t = QualityThresholds::default();
        assert!(t.check_nudge_fire_rate(&runs).is_ok());
        runs.extend((0..3).map(|_| run(Some(1), 2, 1)));
        assert!(t.check_nudge_fire_rate(&runs).is_err());

        assert_eq!(nudge_fire_rate(&[]), None);
    }

    #[test]
    fn test_from_json_and_builders() {
        let t = QualityThresholds::from_json(r#"{"nudge_rate_threshold": 0.5}"#).unwrap();
        assert_eq!(t.nudge_rate_threshold, 0.5);
        assert_eq!(t.max_total_turns, MAX_TOTAL_TURNS);

        let built = QualityThresholds::default()
            .with_max_tools_per_request(3)
            .with_max_turns_to_first_tool(1)
            .with_max_total_turns(4)
            .with_nudge_rate_threshold(0.1);
        assert_eq!(built.max_tools_per_request, 3);
        assert_eq!(built.max_turns_to_first_tool, 1);
        assert_eq!(built.max_total_turns, 4);
        assert_eq!(built.nudge_rate_threshold, 0.1);

        assert!(matches!(
            QualityThresholds::from_json("not json"),
            Err(Error::Json(_))
        ));
    }
}
