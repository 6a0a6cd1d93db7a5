//! Cycle coordinator and bounded reasoning loop.
//!
//! A cycle is one orchestrator execution for one user turn: verify the
//! caller, replay prior turns, loop the model against the tool gateway under
//! a hard step cap, persist what was produced, and emit the cycle's span
//! tree. Cycles are ephemeral; nothing engine-side outlives the response.

pub mod coordinator;
pub mod cycle;
pub mod error;
pub mod runner;

pub use coordinator::{Coordinator, CoordinatorSettings, InvocationOutcome};
pub use cycle::{CycleReport, StepRecord};
pub use error::EngineError;
pub use runner::ReasoningLoop;
