//! Model-level queries
//!
//! [`ModelQuery`] wraps a [`QueryBuilder`] for one record type and adds the
//! pieces a plain builder does not know about: named global scopes that are
//! merged in when the query runs, an optional rewrite of bulk deletes into
//! updates, and `updated_at` maintenance on bulk updates.

use crate::errors::StoreError;
use crate::query_builder::{JoinClause, QueryBuilder, QueryFilter, SortOrder, UpdateSet};
use crate::record::Record;
use crate::storage::Storage;
use crate::traits::{SoftDeletable, TableMetadata};
use chrono::Utc;
use serde_json::Value;
use std::marker::PhantomData;

/// Columns written when a bulk delete is turned into an update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftDeleteColumns {
    deleted: &'static str,
    deleted_at: &'static str,
    qualified_deleted: String,
    qualified_deleted_at: String,
}

impl SoftDeleteColumns {
    pub fn of<T: SoftDeletable>() -> Self {
        Self {
            deleted: T::deleted_column(),
            deleted_at: T::deleted_at_column(),
            qualified_deleted: T::qualified_deleted_column(),
            qualified_deleted_at: T::qualified_deleted_at_column(),
        }
    }

    /// Flag and timestamp column names, qualified when the query joins other tables
    pub fn resolve(&self, has_joins: bool) -> (&str, &str) {
        if has_joins {
            (&self.qualified_deleted, &self.qualified_deleted_at)
        } else {
            (self.deleted, self.deleted_at)
        }
    }
}

pub struct ModelQuery<T> {
    builder: QueryBuilder,
    scopes: Vec<(&'static str, QueryFilter)>,
    on_delete: Option<SoftDeleteColumns>,
    _model: PhantomData<fn() -> T>,
}

impl<T> Clone for ModelQuery<T> {
    fn clone(&self) -> Self {
        Self {
            builder: self.builder.clone(),
            scopes: self.scopes.clone(),
            on_delete: self.on_delete.clone(),
            _model: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for ModelQuery<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelQuery")
            .field("builder", &self.builder)
            .field(
                "scopes",
                &self.scopes.iter().map(|(name, _)| *name).collect::<Vec<_>>(),
            )
            .field("soft_deletes", &self.on_delete.is_some())
            .finish()
    }
}

impl<T: TableMetadata> Default for ModelQuery<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TableMetadata> ModelQuery<T> {
    /// Unscoped query over the whole table
    pub fn new() -> Self {
        Self {
            builder: QueryBuilder::new(T::table_name()).primary_key(T::primary_key_field()),
            scopes: Vec::new(),
            on_delete: None,
            _model: PhantomData,
        }
    }

    pub fn filter(mut self, filter: QueryFilter) -> Self {
        self.builder = self.builder.filter(filter);
        self
    }

    /// Restrict to the row with the given primary key
    pub fn where_key(self, key: impl Into<Value>) -> Self {
        let column = T::qualify_column(T::primary_key_field());
        self.filter(QueryFilter::eq(&column, key))
    }

    pub fn order_by(mut self, field: &str, order: SortOrder) -> Self {
        self.builder = self.builder.order_by(field, order);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.builder = self.builder.limit(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.builder = self.builder.offset(offset);
        self
    }

    pub fn join(mut self, join: JoinClause) -> Self {
        self.builder = self.builder.join(join);
        self
    }

    pub fn inner_join(mut self, table: &str, left_field: &str, right_field: &str) -> Self {
        self.builder = self.builder.inner_join(table, left_field, right_field);
        self
    }

    pub fn left_join(mut self, table: &str, left_field: &str, right_field: &str) -> Self {
        self.builder = self.builder.left_join(table, left_field, right_field);
        self
    }

    /// Register a named scope, replacing any scope of the same name
    pub fn with_global_scope(mut self, name: &'static str, filter: QueryFilter) -> Self {
        match self.scopes.iter_mut().find(|(scope, _)| *scope == name) {
            Some(existing) => existing.1 = filter,
            None => self.scopes.push((name, filter)),
        }
        self
    }

    pub fn without_global_scope(mut self, name: &str) -> Self {
        self.scopes.retain(|(scope, _)| *scope != name);
        self
    }

    pub fn without_global_scopes(mut self) -> Self {
        self.scopes.clear();
        self
    }

    pub fn has_global_scope(&self, name: &str) -> bool {
        self.scopes.iter().any(|(scope, _)| *scope == name)
    }

    /// Turn bulk deletes into updates of the given columns
    pub fn on_delete(mut self, columns: SoftDeleteColumns) -> Self {
        self.on_delete = Some(columns);
        self
    }

    pub fn soft_deletes(&self) -> bool {
        self.on_delete.is_some()
    }

    pub fn has_joins(&self) -> bool {
        self.builder.has_joins()
    }

    /// Explicit conditions only, without global scopes
    pub fn builder(&self) -> &QueryBuilder {
        &self.builder
    }

    /// Builder with the global scopes applied ahead of the explicit conditions
    pub fn to_query_builder(&self) -> QueryBuilder {
        if self.scopes.is_empty() {
            return self.builder.clone();
        }

        let mut builder = self.builder.clone();
        let explicit = std::mem::take(&mut builder.conditions);
        builder.conditions = self
            .scopes
            .iter()
            .map(|(_, filter)| filter.clone())
            .chain(explicit)
            .collect();
        builder
    }

    pub async fn get<S>(&self, storage: &S) -> Result<Vec<Record<T>>, StoreError>
    where
        S: Storage + ?Sized,
    {
        let rows = storage.select(&self.to_query_builder()).await?;
        Ok(rows.into_iter().map(Record::from_storage).collect())
    }

    pub async fn first<S>(&self, storage: &S) -> Result<Option<Record<T>>, StoreError>
    where
        S: Storage + ?Sized,
    {
        let rows = storage.select(&self.to_query_builder().limit(1)).await?;
        Ok(rows.into_iter().next().map(Record::from_storage))
    }

    pub async fn count<S>(&self, storage: &S) -> Result<i64, StoreError>
    where
        S: Storage + ?Sized,
    {
        storage.count(&self.to_query_builder()).await
    }

    /// Bulk update of every matched row
    ///
    /// Timestamped models also get `updated_at` unless the caller set it.
    pub async fn update<S>(&self, storage: &S, changes: UpdateSet) -> Result<u64, StoreError>
    where
        S: Storage + ?Sized,
    {
        let changes = self.with_update_timestamp(changes);
        storage.update(&self.to_query_builder(), &changes).await
    }

    /// Bulk delete of every matched row
    ///
    /// With a soft-delete hook installed the rows are flagged instead.
    pub async fn delete<S>(&self, storage: &S) -> Result<u64, StoreError>
    where
        S: Storage + ?Sized,
    {
        match &self.on_delete {
            Some(columns) => {
                let (deleted, deleted_at) = columns.resolve(self.has_joins());
                let changes = UpdateSet::new()
                    .set(deleted, true)
                    .set_timestamp(deleted_at, Utc::now());
                debug_log!(table = T::table_name(), "bulk delete rewritten to soft delete");
                self.update(storage, changes).await
            }
            None => self.force_delete(storage).await,
        }
    }

    /// Bulk delete that always removes rows
    pub async fn force_delete<S>(&self, storage: &S) -> Result<u64, StoreError>
    where
        S: Storage + ?Sized,
    {
        storage.delete(&self.to_query_builder()).await
    }

    fn with_update_timestamp(&self, changes: UpdateSet) -> UpdateSet {
        let updated_at = match T::updated_at_field() {
            Some(column) if T::uses_timestamps() => column,
            _ => return changes,
        };
        if changes.contains(updated_at) {
            return changes;
        }

        let column = if self.has_joins() {
            T::qualify_column(updated_at)
        } else {
            updated_at.to_string()
        };
        changes.set_timestamp(column, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Row;
    use crate::storage::MemoryStorage;
    use serde_json::json;

    struct Comment;

    impl TableMetadata for Comment {
        fn table_name() -> &'static str {
            "comments"
        }
    }

    impl SoftDeletable for Comment {}

    struct AuditEntry;

    impl TableMetadata for AuditEntry {
        fn table_name() -> &'static str {
            "audit_entries"
        }

        fn uses_timestamps() -> bool {
            false
        }
    }

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    async fn seed(storage: &MemoryStorage, table: &str, rows: Vec<Value>) {
        for value in rows {
            storage
                .insert(table, "id", &UpdateSet::from(row(value)))
                .await
                .expect("insert");
        }
    }

    #[test]
    fn test_scopes_precede_explicit_conditions() {
        let query = ModelQuery::<Comment>::new()
            .filter(QueryFilter::eq("post_id", 4))
            .with_global_scope("tenant", QueryFilter::eq("tenant_id", 1));

        let builder = query.to_query_builder();
        assert_eq!(
            builder.conditions(),
            &[
                QueryFilter::eq("tenant_id", 1),
                QueryFilter::eq("post_id", 4)
            ]
        );
        assert_eq!(query.builder().conditions().len(), 1);
        assert_eq!(builder.primary_key_field(), Some("id"));
    }

    #[test]
    fn test_named_scopes_replace_and_remove() {
        let query = ModelQuery::<Comment>::new()
            .with_global_scope("tenant", QueryFilter::eq("tenant_id", 1))
            .with_global_scope("tenant", QueryFilter::eq("tenant_id", 2))
            .with_global_scope("visible", QueryFilter::eq("hidden", false));

        assert_eq!(query.to_query_builder().conditions().len(), 2);
        assert_eq!(
            query.to_query_builder().conditions()[0],
            QueryFilter::eq("tenant_id", 2)
        );

        let query = query.without_global_scope("tenant");
        assert!(!query.has_global_scope("tenant"));
        assert!(query.has_global_scope("visible"));
        assert!(query.without_global_scopes().to_query_builder().conditions().is_empty());
    }

    #[test]
    fn test_soft_delete_columns_resolution() {
        let columns = SoftDeleteColumns::of::<Comment>();
        assert_eq!(columns.resolve(false), ("deleted", "deleted_at"));
        assert_eq!(
            columns.resolve(true),
            ("comments.deleted", "comments.deleted_at")
        );
    }

    #[tokio::test]
    async fn test_update_sets_updated_at_for_timestamped_models() {
        let storage = MemoryStorage::new();
        seed(&storage, "comments", vec![json!({"body": "a", "updated_at": null})]).await;

        let affected = ModelQuery::<Comment>::new()
            .update(&storage, UpdateSet::new().set("body", "b"))
            .await
            .expect("update");
        assert_eq!(affected, 1);

        let stored = &storage.rows("comments")[0];
        assert_eq!(stored["body"], json!("b"));
        assert!(stored["updated_at"].is_string());
    }

    #[tokio::test]
    async fn test_update_leaves_untimestamped_models_alone() {
        let storage = MemoryStorage::new();
        seed(&storage, "audit_entries", vec![json!({"action": "login"})]).await;

        ModelQuery::<AuditEntry>::new()
            .update(&storage, UpdateSet::new().set("action", "logout"))
            .await
            .expect("update");

        let stored = &storage.rows("audit_entries")[0];
        assert!(stored.get("updated_at").is_none());
    }

    #[tokio::test]
    async fn test_delete_without_hook_removes_rows() {
        let storage = MemoryStorage::new();
        seed(&storage, "comments", vec![json!({"body": "a"}), json!({"body": "b"})]).await;

        let removed = ModelQuery::<Comment>::new()
            .filter(QueryFilter::eq("body", "a"))
            .delete(&storage)
            .await
            .expect("delete");
        assert_eq!(removed, 1);
        assert_eq!(storage.rows("comments").len(), 1);
    }

    #[tokio::test]
    async fn test_delete_with_hook_flags_rows() {
        let storage = MemoryStorage::new();
        seed(
            &storage,
            "comments",
            vec![
                json!({"body": "a", "deleted": false, "deleted_at": null}),
                json!({"body": "b", "deleted": false, "deleted_at": null}),
            ],
        )
        .await;

        let flagged = ModelQuery::<Comment>::new()
            .on_delete(SoftDeleteColumns::of::<Comment>())
            .delete(&storage)
            .await
            .expect("delete");
        assert_eq!(flagged, 2);

        let rows = storage.rows("comments");
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r["deleted"] == json!(true)));
        assert!(rows.iter().all(|r| r["deleted_at"].is_string()));
    }

    #[tokio::test]
    async fn test_first_and_count() {
        let storage = MemoryStorage::new();
        seed(&storage, "comments", vec![json!({"body": "x"}), json!({"body": "y"})]).await;

        let query = ModelQuery::<Comment>::new().order_by("id", SortOrder::Desc);
        let first = query.first(&storage).await.expect("first").expect("row");
        assert_eq!(first.get("body"), Some(&json!("y")));
        assert!(first.exists());
        assert_eq!(query.count(&storage).await.expect("count"), 2);

        let missing = ModelQuery::<Comment>::new()
            .where_key(99)
            .first(&storage)
            .await
            .expect("first");
        assert!(missing.is_none());
    }

    /// Records the statements the PostgreSQL backend would run
    #[derive(Default)]
    struct SqlLog(std::sync::Mutex<Vec<String>>);

    impl SqlLog {
        fn statements(&self) -> Vec<String> {
            self.0.lock().expect("log").clone()
        }
    }

    #[async_trait::async_trait]
    impl Storage for SqlLog {
        async fn select(&self, _: &QueryBuilder) -> Result<Vec<Row>, StoreError> {
            Ok(Vec::new())
        }

        async fn count(&self, _: &QueryBuilder) -> Result<i64, StoreError> {
            Ok(0)
        }

        async fn insert(&self, _: &str, _: &str, _: &UpdateSet) -> Result<Row, StoreError> {
            Ok(Row::new())
        }

        async fn update(&self, query: &QueryBuilder, changes: &UpdateSet) -> Result<u64, StoreError> {
            let (sql, _) = crate::query_builder::SqlGenerator::update_sql(query, changes)?;
            self.0.lock().expect("log").push(sql);
            Ok(1)
        }

        async fn delete(&self, query: &QueryBuilder) -> Result<u64, StoreError> {
            let (sql, _) = crate::query_builder::SqlGenerator::delete_sql(query)?;
            self.0.lock().expect("log").push(sql);
            Ok(1)
        }
    }

    #[tokio::test]
    async fn test_joined_soft_delete_flags_through_key_subselect() {
        let log = SqlLog::default();

        Comment::query()
            .inner_join("posts", "comments.post_id", "posts.id")
            .filter(QueryFilter::eq("posts.locked", true))
            .delete(&log)
            .await
            .expect("delete");

        assert_eq!(
            log.statements(),
            ["UPDATE comments SET deleted = $1, deleted_at = $2::timestamptz, updated_at = $3::timestamptz \
              WHERE comments.id IN (SELECT comments.id FROM comments \
              INNER JOIN posts ON comments.post_id = posts.id \
              WHERE comments.deleted = $4 AND posts.locked = $5)"]
        );
    }

    #[tokio::test]
    async fn test_limited_bulk_mutations_stay_within_window() {
        let log = SqlLog::default();
        let oldest = Comment::query().order_by("id", SortOrder::Asc).limit(1);

        oldest.force_delete(&log).await.expect("force delete");
        oldest.delete(&log).await.expect("soft delete");

        let statements = log.statements();
        assert_eq!(
            statements[0],
            "DELETE FROM comments WHERE comments.id IN \
             (SELECT comments.id FROM comments WHERE comments.deleted = $1 ORDER BY id ASC LIMIT 1)"
        );
        assert!(statements[1].ends_with(
            "WHERE comments.id IN (SELECT comments.id FROM comments WHERE comments.deleted = $4 ORDER BY id ASC LIMIT 1)"
        ));
    }

    #[tokio::test]
    async fn test_limited_force_delete_removes_one_row_in_memory() {
        let storage = MemoryStorage::new();
        seed(
            &storage,
            "comments",
            (1..=5)
                .map(|n| json!({"body": format!("c{n}"), "deleted": false, "deleted_at": null}))
                .collect(),
        )
        .await;

        let oldest = Comment::query().order_by("id", SortOrder::Asc).limit(1);
        assert_eq!(oldest.get(&storage).await.expect("get").len(), 1);
        assert_eq!(oldest.force_delete(&storage).await.expect("force delete"), 1);

        let bodies: Vec<Value> = storage.rows("comments").iter().map(|r| r["body"].clone()).collect();
        assert_eq!(bodies, vec![json!("c2"), json!("c3"), json!("c4"), json!("c5")]);

        let newest = Comment::query().order_by("id", SortOrder::Desc).limit(2);
        assert_eq!(newest.delete(&storage).await.expect("soft delete"), 2);
        let flagged: Vec<Value> = storage
            .rows("comments")
            .iter()
            .filter(|r| r["deleted"] == json!(true))
            .map(|r| r["body"].clone())
            .collect();
        assert_eq!(flagged, vec![json!("c4"), json!("c5")]);
    }
}
