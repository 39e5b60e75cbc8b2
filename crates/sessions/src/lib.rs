//! Session correlation and the asynchronous log sink.
//!
//! A [`SessionHandle`] is created per request and threaded explicitly through
//! the pipeline — there is deliberately no process-wide "current session":
//! shared mutable session state misattributes log entries under concurrent
//! requests.

pub mod handle;
pub mod sink;

pub use handle::SessionHandle;
pub use sink::{CallRecord, SessionSink};
