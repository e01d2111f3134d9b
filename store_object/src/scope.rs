//! Soft-deleting query scope
//!
//! [`SoftDeletingScope`] installs the default "not trashed" predicate and the
//! bulk-delete rewrite on a [`ModelQuery`]. [`SoftDeleteScope`] is the
//! capability queries over soft-deletable models expose for widening or
//! narrowing that predicate.

use crate::errors::StoreError;
use crate::model_query::{ModelQuery, SoftDeleteColumns};
use crate::query_builder::{QueryFilter, UpdateSet};
use crate::storage::Storage;
use crate::traits::SoftDeletable;
use async_trait::async_trait;
use serde_json::Value;

pub struct SoftDeletingScope;

impl SoftDeletingScope {
    /// Name of the global scope holding the default predicate
    pub const NAME: &'static str = "soft_deleting";

    /// Hide trashed rows
    pub fn apply<T: SoftDeletable>(query: ModelQuery<T>) -> ModelQuery<T> {
        query.with_global_scope(Self::NAME, trashed_filter::<T>(false))
    }

    /// Flag rows instead of removing them on bulk delete
    pub fn extend<T: SoftDeletable>(query: ModelQuery<T>) -> ModelQuery<T> {
        query.on_delete(SoftDeleteColumns::of::<T>())
    }

    pub fn boot<T: SoftDeletable>(query: ModelQuery<T>) -> ModelQuery<T> {
        Self::extend(Self::apply(query))
    }
}

fn trashed_filter<T: SoftDeletable>(trashed: bool) -> QueryFilter {
    QueryFilter::eq(&T::qualified_deleted_column(), trashed)
}

#[async_trait]
pub trait SoftDeleteScope: Sized + Send {
    /// Install the default predicate: qualified deleted flag = false
    fn apply_default_filter(self) -> Self;

    /// Include trashed rows, or behave like `without_trashed` when `false`
    fn with_trashed(self, include_trashed: bool) -> Self;

    /// Drop the default predicate and filter out trashed rows explicitly
    fn without_trashed(self) -> Self;

    /// Only trashed rows
    fn only_trashed(self) -> Self;

    /// Un-trash every matched row, trashed or not; returns the affected count
    async fn restore<S>(self, storage: &S) -> Result<u64, StoreError>
    where
        S: Storage + ?Sized;
}

#[async_trait]
impl<T: SoftDeletable> SoftDeleteScope for ModelQuery<T> {
    fn apply_default_filter(self) -> Self {
        SoftDeletingScope::apply(self)
    }

    fn with_trashed(self, include_trashed: bool) -> Self {
        if !include_trashed {
            return self.without_trashed();
        }
        self.without_global_scope(SoftDeletingScope::NAME)
    }

    fn without_trashed(self) -> Self {
        self.without_global_scope(SoftDeletingScope::NAME)
            .filter(trashed_filter::<T>(false))
    }

    fn only_trashed(self) -> Self {
        self.without_global_scope(SoftDeletingScope::NAME)
            .filter(trashed_filter::<T>(true))
    }

    async fn restore<S>(self, storage: &S) -> Result<u64, StoreError>
    where
        S: Storage + ?Sized,
    {
        let changes = UpdateSet::new()
            .set(T::deleted_column(), false)
            .set(T::deleted_at_column(), Value::Null);
        self.with_trashed(true).update(storage, changes).await
    }
}
