use super::Storage;
use crate::errors::StoreError;
use crate::query_builder::{QueryBuilder, SqlGenerator, UpdateSet};
use crate::record::Row;
use crate::validation::{ValidatedFieldName, ValidatedTableName};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

// Shared parameter binding. Strings always travel as `text`; a column of
// another type gets an explicit `::type` cast in the generated SQL.
macro_rules! bind_json_param {
    ($query:expr, $param:expr) => {
        match $param {
            Value::String(s) => $query.bind(s),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    if i >= i32::MIN as i64 && i <= i32::MAX as i64 {
                        $query.bind(i as i32)
                    } else {
                        $query.bind(i)
                    }
                } else if let Some(f) = n.as_f64() {
                    $query.bind(f)
                } else {
                    $query.bind(n.to_string())
                }
            }
            Value::Bool(b) => $query.bind(b),
            Value::Null => $query.bind(Option::<String>::None),
            other => $query.bind(sqlx::types::Json(other)),
        }
    };
}

/// PostgreSQL storage over a shared connection pool
#[derive(Debug, Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Reject any identifier that is not a plain (optionally qualified) name
    fn validate_query(query: &QueryBuilder) -> Result<(), StoreError> {
        ValidatedTableName::new(query.table())?;
        if let Some(primary_key) = query.primary_key_field() {
            ValidatedFieldName::new(primary_key)?;
        }

        let mut fields: Vec<&str> = Vec::new();
        for filter in query.conditions() {
            filter.for_each_field(&mut |field| fields.push(field));
        }
        for join in query.joins() {
            ValidatedTableName::new(&join.table)?;
            if let Some(alias) = &join.alias {
                ValidatedTableName::new(alias)?;
            }
            join.for_each_field(&mut |field| fields.push(field));
        }
        fields.extend(query.ordering().iter().map(|(field, _)| field.as_str()));

        for field in fields {
            ValidatedFieldName::new(field)?;
        }
        Ok(())
    }

    fn validate_columns<'a>(columns: impl IntoIterator<Item = &'a str>) -> Result<(), StoreError> {
        for column in columns {
            ValidatedFieldName::new(column)?;
        }
        Ok(())
    }

    fn into_row(table: &str, operation: &str, value: Value) -> Result<Row, StoreError> {
        match value {
            Value::Object(row) => Ok(row),
            other => Err(StoreError::backend(
                table,
                operation,
                format!("expected a JSON row, got {}", other),
            )),
        }
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn select(&self, query: &QueryBuilder) -> Result<Vec<Row>, StoreError> {
        Self::validate_query(query)?;
        let (sql, params) = SqlGenerator::select_sql(query);
        debug_log!(table = query.table(), %sql, params = params.len(), "select");

        let mut sqlx_query = sqlx::query_scalar::<_, Value>(&sql);
        for param in params {
            sqlx_query = bind_json_param!(sqlx_query, param);
        }

        let rows = sqlx_query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::database_operation(query.table(), "select", e))?;

        rows.into_iter()
            .map(|row| Self::into_row(query.table(), "select", row))
            .collect()
    }

    async fn count(&self, query: &QueryBuilder) -> Result<i64, StoreError> {
        Self::validate_query(query)?;
        let (sql, params) = SqlGenerator::count_sql(query);
        debug_log!(table = query.table(), %sql, params = params.len(), "count");

        let mut sqlx_query = sqlx::query_scalar::<_, i64>(&sql);
        for param in params {
            sqlx_query = bind_json_param!(sqlx_query, param);
        }

        sqlx_query
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::database_operation(query.table(), "count", e))
    }

    async fn insert(
        &self,
        table: &str,
        primary_key: &str,
        values: &UpdateSet,
    ) -> Result<Row, StoreError> {
        ValidatedTableName::new(table)?;
        ValidatedFieldName::new(primary_key)?;
        Self::validate_columns(values.columns())?;

        // Let the column default generate a missing key
        let row = values.clone().without_null(primary_key);

        let (sql, params) = SqlGenerator::insert_sql(table, &row);
        debug_log!(table, %sql, params = params.len(), "insert");

        let mut sqlx_query = sqlx::query_scalar::<_, Value>(&sql);
        for param in params {
            sqlx_query = bind_json_param!(sqlx_query, param);
        }

        let stored = sqlx_query
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::database_operation(table, "insert", e))?;
        Self::into_row(table, "insert", stored)
    }

    async fn update(&self, query: &QueryBuilder, changes: &UpdateSet) -> Result<u64, StoreError> {
        Self::validate_query(query)?;
        Self::validate_columns(changes.columns())?;
        let (sql, params) = SqlGenerator::update_sql(query, changes)?;
        debug_log!(table = query.table(), %sql, params = params.len(), "update");

        let mut sqlx_query = sqlx::query(&sql);
        for param in params {
            sqlx_query = bind_json_param!(sqlx_query, param);
        }

        let result = sqlx_query
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::database_operation(query.table(), "update", e))?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, query: &QueryBuilder) -> Result<u64, StoreError> {
        Self::validate_query(query)?;
        let (sql, params) = SqlGenerator::delete_sql(query)?;
        debug_log!(table = query.table(), %sql, params = params.len(), "delete");

        let mut sqlx_query = sqlx::query(&sql);
        for param in params {
            sqlx_query = bind_json_param!(sqlx_query, param);
        }

        let result = sqlx_query
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::database_operation(query.table(), "delete", e))?;
        Ok(result.rows_affected())
    }
}
