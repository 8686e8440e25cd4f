//! NaviSafe Broadcast Layer
//!
//! Fire-and-forget delivery of tracking events to external channels:
//! - Bounded queue that drops the oldest event when full
//! - Pluggable sinks (tracing log, HTTP webhook)
//! - A drain task that forwards queued events and swallows failures

pub mod queue;
pub mod sink;
pub mod broadcaster;

pub use queue::*;
pub use sink::*;
pub use broadcaster::*;
