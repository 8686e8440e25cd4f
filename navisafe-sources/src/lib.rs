//! NaviSafe Position Sources
//!
//! Every position feed sits behind the [`PositionSource`] trait:
//! - **Manual**: operator-injected coordinates
//! - **Simulated**: a random-walk sensor with scriptable failures
//! - **Replay**: recorded positions from a JSON-lines file

pub mod traits;
pub mod manual;
pub mod simulated;
pub mod replay;

pub use traits::*;
pub use manual::*;
pub use simulated::*;
pub use replay::*;
