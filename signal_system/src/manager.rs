use crate::event::ModelEvent;
use crate::types::{Listener, SignalError};
use config::SignalConfig;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Handle returned on registration, used to remove a listener again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Slots<P> = [Vec<(ListenerId, Listener<P>)>; 4];

/// Lifecycle event registry for one payload type
///
/// Listeners run synchronously in registration order. Dispatch works on a
/// snapshot of the registered listeners, so a listener may register or remove
/// listeners without deadlocking; such changes apply from the next dispatch.
pub struct SignalManager<P> {
    listeners: RwLock<Slots<P>>,
    next_id: AtomicU64,
    config: SignalConfig,
}

impl<P> std::fmt::Debug for SignalManager<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalManager")
            .field("listener_count", &self.total_listeners())
            .field("config", &self.config)
            .finish()
    }
}

impl<P> SignalManager<P> {
    pub fn new() -> Self {
        Self::with_config(SignalConfig::default())
    }

    pub fn with_config(config: SignalConfig) -> Self {
        Self {
            listeners: RwLock::new(Default::default()),
            next_id: AtomicU64::new(1),
            config,
        }
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    /// Register an observer; its return value never affects the operation
    pub fn observe<F>(&self, event: ModelEvent, callback: F) -> Result<ListenerId, SignalError>
    where
        F: Fn(&P) + Send + Sync + 'static,
    {
        self.register(event, Listener::Observer(Arc::new(callback)))
    }

    /// Register a guard; returning `false` from a halting event cancels the operation
    pub fn guard<F>(&self, event: ModelEvent, callback: F) -> Result<ListenerId, SignalError>
    where
        F: Fn(&P) -> bool + Send + Sync + 'static,
    {
        self.register(event, Listener::Guard(Arc::new(callback)))
    }

    fn register(&self, event: ModelEvent, listener: Listener<P>) -> Result<ListenerId, SignalError> {
        let mut slots = self.listeners.write().map_err(|_| SignalError::Poisoned)?;
        let slot = &mut slots[event.index()];

        if slot.len() >= self.config.max_listeners_per_event {
            return Err(SignalError::ListenerLimit {
                event,
                limit: self.config.max_listeners_per_event,
            });
        }

        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        slot.push((id, listener));
        trace_log!(event = event.name(), listener = id.0, "listener registered");
        Ok(id)
    }

    /// Remove a previously registered listener, returns whether it was found
    pub fn forget(&self, id: ListenerId) -> bool {
        let mut slots = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        for slot in slots.iter_mut() {
            if let Some(position) = slot.iter().position(|(listener_id, _)| *listener_id == id) {
                slot.remove(position);
                return true;
            }
        }
        false
    }

    /// Dispatch an event to its listeners
    ///
    /// Returns `false` when the event is halting and a guard vetoed it; the
    /// remaining listeners are skipped in that case.
    pub fn fire(&self, event: ModelEvent, payload: &P) -> bool {
        let snapshot: Vec<Listener<P>> = {
            let slots = self.listeners.read().unwrap_or_else(|e| e.into_inner());
            slots[event.index()]
                .iter()
                .map(|(_, listener)| listener.clone())
                .collect()
        };

        if self.config.log_dispatch {
            trace_log!(event = event.name(), listeners = snapshot.len(), "dispatching");
        }

        for listener in &snapshot {
            let proceed = listener.call(payload);
            if !proceed && event.is_halting() {
                debug_log!(event = event.name(), "event vetoed by listener");
                return false;
            }
        }
        true
    }

    /// Number of listeners registered for an event
    pub fn listener_count(&self, event: ModelEvent) -> usize {
        self.listeners
            .read()
            .map(|slots| slots[event.index()].len())
            .unwrap_or(0)
    }

    fn total_listeners(&self) -> usize {
        ModelEvent::ALL
            .iter()
            .map(|event| self.listener_count(*event))
            .sum()
    }

    /// Remove every listener
    pub fn clear(&self) {
        if let Ok(mut slots) = self.listeners.write() {
            for slot in slots.iter_mut() {
                slot.clear();
            }
        }
    }
}

impl<P> Default for SignalManager<P> {
    fn default() -> Self {
        Self::new()
    }
}
