//! Model lifecycle event definitions
//!
//! This module defines the lifecycle events fired by the soft-delete behavior.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle event fired for a single record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelEvent {
    /// The record was soft deleted
    Trashed,
    /// The record is about to be restored; guards may veto
    Restoring,
    /// The record was restored and persisted
    Restored,
    /// The record was physically removed
    ForceDeleted,
}

impl ModelEvent {
    pub const ALL: [ModelEvent; 4] = [
        ModelEvent::Trashed,
        ModelEvent::Restoring,
        ModelEvent::Restored,
        ModelEvent::ForceDeleted,
    ];

    /// Event name as exposed to the host application
    pub fn name(&self) -> &'static str {
        match self {
            ModelEvent::Trashed => "trashed",
            ModelEvent::Restoring => "restoring",
            ModelEvent::Restored => "restored",
            ModelEvent::ForceDeleted => "forceDeleted",
        }
    }

    /// Whether a guard returning `false` stops dispatch and cancels the operation
    pub fn is_halting(&self) -> bool {
        matches!(self, ModelEvent::Restoring)
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            ModelEvent::Trashed => 0,
            ModelEvent::Restoring => 1,
            ModelEvent::Restored => 2,
            ModelEvent::ForceDeleted => 3,
        }
    }
}

impl fmt::Display for ModelEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
