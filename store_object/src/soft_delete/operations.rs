use super::core::{DeleteOptions, SoftDeleteStore};
use crate::errors::StoreError;
use crate::model_query::ModelQuery;
use crate::query_builder::{SqlCast, UpdateSet};
use crate::record::{timestamp_value, Record, Row};
use crate::scope::SoftDeleteScope;
use crate::storage::Storage;
use crate::traits::SoftDeletable;
use chrono::Utc;
use serde_json::Value;
use signal_system::ModelEvent;

impl<T: SoftDeletable, S: Storage + ?Sized> SoftDeleteStore<T, S> {
    /// Insert a new record, not trashed
    pub async fn create(&self, attributes: Row) -> Result<Record<T>, StoreError> {
        let mut record = Record::from_attributes(attributes);
        self.save(&mut record).await?;
        Ok(record)
    }

    /// Persist a record: insert when new, otherwise update its dirty attributes
    ///
    /// Returns `true` for a clean existing record, since there is nothing to write.
    pub async fn save(&self, record: &mut Record<T>) -> Result<bool, StoreError> {
        let now = timestamp_value(Utc::now());

        if !record.exists() {
            for column in [T::deleted_column(), T::deleted_at_column()] {
                if record.get(column).is_none() {
                    let default = if column == T::deleted_column() {
                        Value::Bool(false)
                    } else {
                        Value::Null
                    };
                    record.set(column, default);
                }
            }
            if T::uses_timestamps() {
                for column in [T::created_at_field(), T::updated_at_field()].into_iter().flatten() {
                    if record.get(column).is_none() {
                        record.set(column, now.clone());
                    }
                }
            }

            let values = timestamp_casts::<T>(UpdateSet::from(record.attributes().clone()));
            let stored = self
                .storage
                .insert(T::table_name(), T::primary_key_field(), &values)
                .await?;
            record.load(stored);
            debug_log!(table = T::table_name(), key = ?record.key(), "record inserted");
            return Ok(true);
        }

        if !record.is_dirty() {
            return Ok(true);
        }

        let key = self.require_key(record)?;
        if T::uses_timestamps() {
            if let Some(updated_at) = T::updated_at_field() {
                if !record.is_dirty_attribute(updated_at) {
                    record.set(updated_at, now);
                }
            }
        }

        let changes = timestamp_casts::<T>(UpdateSet::from(record.dirty()));
        let query = ModelQuery::<T>::new().where_key(key);
        let affected = self.storage.update(&query.to_query_builder(), &changes).await?;
        if affected > 0 {
            record.sync_original();
        }
        Ok(affected > 0)
    }

    /// Find a record that is not trashed
    pub async fn find(&self, key: impl Into<Value>) -> Result<Option<Record<T>>, StoreError> {
        T::query().where_key(key).first(&*self.storage).await
    }

    /// Find a record whether trashed or not
    pub async fn find_with_trashed(
        &self,
        key: impl Into<Value>,
    ) -> Result<Option<Record<T>>, StoreError> {
        T::query()
            .with_trashed(true)
            .where_key(key)
            .first(&*self.storage)
            .await
    }

    pub async fn get(&self, query: &ModelQuery<T>) -> Result<Vec<Record<T>>, StoreError> {
        query.get(&*self.storage).await
    }

    pub async fn count(&self, query: &ModelQuery<T>) -> Result<i64, StoreError> {
        query.count(&*self.storage).await
    }

    /// Delete a record, soft unless `options.force` is set
    ///
    /// Returns `false` without touching storage when the record was never
    /// persisted. Otherwise returns whether a row was affected.
    pub async fn delete(
        &self,
        record: &mut Record<T>,
        options: DeleteOptions,
    ) -> Result<bool, StoreError> {
        if !record.exists() {
            return Ok(false);
        }
        let key = self.require_key(record)?;

        if options.force {
            self.run_force_delete(record, key).await
        } else {
            self.run_soft_delete(record, key).await
        }
    }

    /// Remove the row for good
    pub async fn force_delete(&self, record: &mut Record<T>) -> Result<bool, StoreError> {
        self.delete(record, DeleteOptions::force()).await
    }

    /// Un-trash a record
    ///
    /// Clears the deleted flag and also resets the deletion timestamp to
    /// NULL, matching bulk [`SoftDeleteScope::restore`]. Callers that relied
    /// on `deleted_at` surviving a restore must copy it beforehand.
    ///
    /// A `restoring` listener returning `false` cancels the restore, leaving
    /// the record untouched, and `false` is returned.
    pub async fn restore(&self, record: &mut Record<T>) -> Result<bool, StoreError> {
        if !self.signals.fire(ModelEvent::Restoring, record) {
            debug_log!(table = T::table_name(), key = ?record.key(), "restore cancelled");
            return Ok(false);
        }

        record.set(T::deleted_column(), false);
        record.set(T::deleted_at_column(), Value::Null);
        record.set_exists(true);

        let saved = self.save(record).await?;
        self.signals.fire(ModelEvent::Restored, record);
        Ok(saved)
    }

    async fn run_soft_delete(&self, record: &mut Record<T>, key: Value) -> Result<bool, StoreError> {
        let now = timestamp_value(Utc::now());

        let mut changes = UpdateSet::new()
            .set(T::deleted_column(), true)
            .set_cast(T::deleted_at_column(), now.clone(), SqlCast::Timestamptz);
        record.set(T::deleted_column(), true);
        record.set(T::deleted_at_column(), now.clone());

        if T::uses_timestamps() {
            if let Some(updated_at) = T::updated_at_field() {
                record.set(updated_at, now.clone());
                changes = changes.set_cast(updated_at, now, SqlCast::Timestamptz);
            }
        }

        let query = ModelQuery::<T>::new().where_key(key);
        let affected = self.storage.update(&query.to_query_builder(), &changes).await?;
        record.sync_original_attributes(&changes.columns());

        debug_log!(table = T::table_name(), key = ?record.key(), affected, "record trashed");
        self.signals.fire(ModelEvent::Trashed, record);
        Ok(affected > 0)
    }

    async fn run_force_delete(&self, record: &mut Record<T>, key: Value) -> Result<bool, StoreError> {
        let removed = {
            let mut guard = record.force_deleting();
            let query = ModelQuery::<T>::new().where_key(key);
            let removed = self.storage.delete(&query.to_query_builder()).await?;
            guard.set_exists(false);
            removed > 0
        };

        debug_log!(table = T::table_name(), key = ?record.key(), removed, "record force deleted");
        if removed {
            self.signals.fire(ModelEvent::ForceDeleted, record);
        }
        Ok(removed)
    }

    fn require_key(&self, record: &Record<T>) -> Result<Value, StoreError> {
        record.key().cloned().ok_or_else(|| StoreError::MissingPrimaryKey {
            table: T::table_name().to_string(),
            primary_key: T::primary_key_field().to_string(),
        })
    }
}

/// Cast every timestamp column the soft-delete behavior manages
fn timestamp_casts<T: SoftDeletable>(values: UpdateSet) -> UpdateSet {
    T::timestamp_columns()
        .into_iter()
        .fold(values, |values, column| values.cast(column, SqlCast::Timestamptz))
}
