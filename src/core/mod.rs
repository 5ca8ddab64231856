//! Platform-independent sound engine: effect descriptors, ambient composer
//! and the session state machine. Nothing in here touches `web_sys`, so the
//! whole module builds and tests on the host.

pub mod composer;
pub mod constants;
pub mod error;
pub mod graph;
pub mod hover;
pub mod noise;
pub mod session;
pub mod task;
pub mod tones;

pub use composer::*;
pub use constants::*;
pub use error::*;
pub use graph::*;
pub use hover::*;
pub use noise::*;
pub use session::*;
pub use task::*;
pub use tones::*;
