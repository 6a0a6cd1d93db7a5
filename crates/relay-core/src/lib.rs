//! Shared types for the relay workspace: branded ids, turns, tool and model
//! seams, the error taxonomy, bearer-token wrapping, and runtime
//! configuration. Everything here is adapter-agnostic; the sibling crates
//! supply the HTTP implementations.

pub mod config;
pub mod errors;
pub mod ids;
pub mod model;
pub mod security;
pub mod tools;
pub mod turns;
