//! Type definitions for signal system
//!
//! This module contains the listener callback types and the registry error.

use crate::event::ModelEvent;
use std::sync::Arc;
use thiserror::Error;

/// Listener that only observes the payload
pub type Observer<P> = Arc<dyn Fn(&P) + Send + Sync>;

/// Listener whose `false` result vetoes a halting event
pub type Guard<P> = Arc<dyn Fn(&P) -> bool + Send + Sync>;

/// Registered callback
pub enum Listener<P> {
    Observer(Observer<P>),
    Guard(Guard<P>),
}

impl<P> Listener<P> {
    /// Invoke the callback; observers always allow the operation to continue
    pub fn call(&self, payload: &P) -> bool {
        match self {
            Listener::Observer(callback) => {
                callback(payload);
                true
            }
            Listener::Guard(callback) => callback(payload),
        }
    }
}

impl<P> Clone for Listener<P> {
    fn clone(&self) -> Self {
        match self {
            Listener::Observer(callback) => Listener::Observer(Arc::clone(callback)),
            Listener::Guard(callback) => Listener::Guard(Arc::clone(callback)),
        }
    }
}

/// Signal registry errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignalError {
    #[error("Listener limit of {limit} reached for event '{event}'")]
    ListenerLimit { event: ModelEvent, limit: usize },

    #[error("Listener registry lock poisoned")]
    Poisoned,
}
