//! Convenience re-exports for common signal-system usage

pub use crate::event::ModelEvent;
pub use crate::manager::{ListenerId, SignalManager};
pub use crate::types::{Guard, Listener, Observer, SignalError};
pub use config::SignalConfig;
