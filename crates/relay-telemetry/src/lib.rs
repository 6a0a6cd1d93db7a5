pub mod logging;
pub mod sink;
pub mod span;

pub use sink::{CollectingSink, HttpTraceSink, NullSink, TraceEmitError, TraceSink};
pub use span::{Span, TraceBuilder};
