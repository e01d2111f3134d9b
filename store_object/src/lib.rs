//! Store Object - soft-delete persistence layer for softhaus
//!
//! This crate provides the record model, the query builder, the storage
//! backends (PostgreSQL and in-memory) and the soft-delete behavior built on
//! top of them.

// Debug output compiled in only with the `debug-logging` feature
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

pub mod errors;
pub mod model_query;
pub mod prelude;
pub mod query_builder;
pub mod record;
pub mod scope;
pub mod soft_delete;
pub mod storage;
pub mod traits;
pub mod validation;

pub use errors::StoreError;
pub use model_query::{ModelQuery, SoftDeleteColumns};
pub use query_builder::{QueryBuilder, QueryFilter, QueryOperator, SortOrder, SqlCast, UpdateSet};
pub use record::{Record, Row};
pub use scope::{SoftDeleteScope, SoftDeletingScope};
pub use soft_delete::{DeleteOptions, SoftDeleteStore};
pub use storage::{MemoryStorage, PgStorage, Storage};
pub use traits::*;
pub use validation::{ValidatedFieldName, ValidatedTableName, ValidationError};

use sqlx::PgPool;

pub type DbPool = PgPool;
