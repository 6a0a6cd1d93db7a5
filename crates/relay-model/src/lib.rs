//! Model adapter.
//!
//! One request/response call per reasoning step: the full turn history and
//! the gateway's tool descriptors go up, at most one tool call or one final
//! answer comes back. Streaming is out of scope for this service.

pub mod http;
pub mod mock;

pub use http::HttpModelClient;
pub use mock::{MockModel, MockStep};
