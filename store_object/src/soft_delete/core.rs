use crate::model_query::ModelQuery;
use crate::record::Record;
use crate::storage::Storage;
use crate::traits::SoftDeletable;
use signal_system::{ListenerId, ModelEvent, SignalConfig, SignalError, SignalManager};
use std::sync::Arc;

/// How a record should be deleted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Remove the row instead of flagging it
    pub force: bool,
}

impl DeleteOptions {
    pub fn soft() -> Self {
        Self { force: false }
    }

    pub fn force() -> Self {
        Self { force: true }
    }
}

/// Record store for one soft-deletable model type
///
/// Lifecycle listeners are scoped to the store's model type; clones share
/// both the storage and the listeners.
pub struct SoftDeleteStore<T: SoftDeletable, S: Storage + ?Sized> {
    pub(crate) storage: Arc<S>,
    pub(crate) signals: Arc<SignalManager<Record<T>>>,
}

impl<T: SoftDeletable, S: Storage + ?Sized> Clone for SoftDeleteStore<T, S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            signals: Arc::clone(&self.signals),
        }
    }
}

impl<T: SoftDeletable, S: Storage + ?Sized> std::fmt::Debug for SoftDeleteStore<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftDeleteStore")
            .field("table", &T::table_name())
            .field("signals", &self.signals)
            .finish()
    }
}

impl<T: SoftDeletable, S: Storage + ?Sized> SoftDeleteStore<T, S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self::with_signal_config(storage, SignalConfig::default())
    }

    pub fn with_signal_config(storage: Arc<S>, config: SignalConfig) -> Self {
        Self::with_signal_manager(storage, Arc::new(SignalManager::with_config(config)))
    }

    /// Share an existing listener registry
    pub fn with_signal_manager(storage: Arc<S>, signals: Arc<SignalManager<Record<T>>>) -> Self {
        Self { storage, signals }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn signals(&self) -> &SignalManager<Record<T>> {
        &self.signals
    }

    /// Default query for the model: trashed rows hidden
    pub fn query(&self) -> ModelQuery<T> {
        T::query()
    }

    /// Run after a record has been soft deleted
    pub fn soft_deleted<F>(&self, callback: F) -> Result<ListenerId, SignalError>
    where
        F: Fn(&Record<T>) + Send + Sync + 'static,
    {
        self.signals.observe(ModelEvent::Trashed, callback)
    }

    /// Run before a restore; returning `false` cancels it
    pub fn restoring<F>(&self, callback: F) -> Result<ListenerId, SignalError>
    where
        F: Fn(&Record<T>) -> bool + Send + Sync + 'static,
    {
        self.signals.guard(ModelEvent::Restoring, callback)
    }

    pub fn restored<F>(&self, callback: F) -> Result<ListenerId, SignalError>
    where
        F: Fn(&Record<T>) + Send + Sync + 'static,
    {
        self.signals.observe(ModelEvent::Restored, callback)
    }

    pub fn force_deleted<F>(&self, callback: F) -> Result<ListenerId, SignalError>
    where
        F: Fn(&Record<T>) + Send + Sync + 'static,
    {
        self.signals.observe(ModelEvent::ForceDeleted, callback)
    }
}
