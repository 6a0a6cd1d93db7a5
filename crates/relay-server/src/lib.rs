//! HTTP surface for the orchestrator.
//!
//! One route does the work: `POST /v1/invocations` runs a full cycle for the
//! caller's turn. Each request gets its own task; a dropped connection
//! cancels the cycle between steps and the partial trace still ships.

pub mod handlers;
pub mod server;

pub use server::{build_router, start, AppState, ServerConfig, ServerHandle};
