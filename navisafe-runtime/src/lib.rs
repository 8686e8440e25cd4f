//! NaviSafe Runtime
//!
//! Runs one tracker actor per subject. The actor is the single owner of the
//! subject's state: position samples, countdown ticks, dismissals and
//! manual injections are all processed one at a time on its task.

pub mod tracker;
pub mod registry;

pub use tracker::*;
pub use registry::*;
