//! # agent-quality
//!
//! Behavioral metrics for tool-calling LLM agents, recorded per invocation so
//! that tests can assert quality properties about a run.
//!
//! The crate never drives an agent itself. The code running the agent loop
//! feeds observations into a recorder and finalizes it on every exit path;
//! test code then reads derived signals and checks them against thresholds.
//!
//! ## Core Concepts
//!
//! - **AgentMetrics**: The per-invocation recorder and its derived signals
//! - **RecordMetrics**: The recording surface shared by every sink
//! - **FinalizeGuard**: Finalizes a synchronous run when it goes out of scope
//! - **MetricsContext**: Shared, thread-safe handle for async agent loops
//! - **Invocation**: Runs an async agent loop and always returns finalized metrics
//! - **QualityThresholds**: Caller-owned ceilings and assertion helpers
//!
//! ## Example: Metrics that survive a failed run
//!
//! ```rust
//! use agent_quality::{Invocation, QualityThresholds, Error};
//!
//! # tokio_test::block_on(async {
//! let (result, metrics) = Invocation::new("gemini-2.5-flash")
//!     .run(|ctx| async move {
//!         ctx.set_turns(1);
//!         ctx.record_turn(200, 80);
//!         ctx.record_tool_call("write_file", 1);
//!         ctx.set_turns(2);
//!         Err::<String, _>(Error::Execution("upstream timeout".into()))
//!     })
//!     .await;
//!
//! assert!(result.is_err());
//! assert_eq!(metrics.first_tool_turn(), Some(1));
//! assert_eq!(metrics.tool_count(), 1);
//! assert!(!metrics.has_response());
//! assert!(!metrics.nudge_fired());
//!
//! let thresholds = QualityThresholds::default();
//! assert!(thresholds.check_first_tool_turn(&metrics).is_ok());
//! # });
//! ```

pub mod error;
pub mod metrics;
pub mod recorder;
pub mod guard;
pub mod context;
pub mod invocation;
pub mod thresholds;

pub use error::{Error, Result};
pub use metrics::{AgentMetrics, ToolCall, TurnRecord};
pub use recorder::RecordMetrics;
pub use guard::FinalizeGuard;
pub use context::MetricsContext;
pub use invocation::Invocation;
pub use thresholds::{
    nudge_fire_rate, QualityThresholds, MAX_TOOLS_PER_REQUEST, MAX_TOTAL_TURNS,
    MAX_TURNS_TO_FIRST_TOOL, NUDGE_RATE_THRESHOLD,
};
