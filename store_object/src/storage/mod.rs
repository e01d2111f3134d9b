//! Storage backends
//!
//! Everything above this module speaks in [`QueryBuilder`]s and JSON rows;
//! a backend turns them into statements. Each call is a single statement.

mod memory;
mod postgres;

pub use memory::MemoryStorage;
pub use postgres::PgStorage;

use crate::errors::StoreError;
use crate::query_builder::{QueryBuilder, UpdateSet};
use crate::record::Row;
use async_trait::async_trait;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Rows of the query's table matched by the query
    async fn select(&self, query: &QueryBuilder) -> Result<Vec<Row>, StoreError>;

    async fn count(&self, query: &QueryBuilder) -> Result<i64, StoreError>;

    /// Insert one row from `values` and return it as stored, including
    /// generated columns
    async fn insert(
        &self,
        table: &str,
        primary_key: &str,
        values: &UpdateSet,
    ) -> Result<Row, StoreError>;

    /// Apply `changes` to the matched rows, returns the affected row count
    ///
    /// ORDER BY, LIMIT and OFFSET narrow the affected rows exactly as they
    /// narrow a select.
    async fn update(&self, query: &QueryBuilder, changes: &UpdateSet) -> Result<u64, StoreError>;

    /// Remove the matched rows, windowed like [`Storage::update`]
    async fn delete(&self, query: &QueryBuilder) -> Result<u64, StoreError>;
}
