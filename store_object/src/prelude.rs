//! Convenience re-exports for common store-object usage

// Core traits
pub use crate::traits::{SoftDeletable, TableMetadata};

// Error types
pub use crate::errors::StoreError;

// Records and stores
pub use crate::record::{Record, Row};
pub use crate::soft_delete::{DeleteOptions, SoftDeleteStore};

// Storage backends
pub use crate::storage::{MemoryStorage, PgStorage, Storage};

// Query building
pub use crate::model_query::ModelQuery;
pub use crate::query_builder::{QueryBuilder, QueryFilter, SortOrder, SqlCast, UpdateSet};
pub use crate::scope::SoftDeleteScope;

// Common external dependencies that are frequently used
pub use async_trait::async_trait;
pub use serde::{Deserialize, Serialize};
pub use sqlx::PgPool;
