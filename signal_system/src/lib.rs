//! Signal system for model lifecycle events
//!
//! This crate provides the per-model observer registry used by the soft-delete
//! behavior: listeners are registered for a [`ModelEvent`] and invoked
//! synchronously, in registration order, when the event fires.

// Lifecycle traces compiled in only with the `debug-logging` feature
#[cfg(feature = "debug-logging")]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod event;
pub mod manager;
pub mod prelude;
pub mod types;

pub use config::SignalConfig;
pub use event::ModelEvent;
pub use manager::{ListenerId, SignalManager};
pub use types::{Guard, Listener, Observer, SignalError};
