use super::Storage;
use crate::errors::StoreError;
use crate::query_builder::{QueryBuilder, QueryCondition, QueryFilter, QueryOperator, UpdateSet};
use crate::record::Row;
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryState {
    tables: HashMap<String, Vec<Row>>,
    sequences: HashMap<String, i64>,
    fail_next: Option<String>,
}

/// In-process storage evaluating the same filter trees as the SQL backend
///
/// Comparisons follow SQL loosely: numbers compare numerically whatever
/// their JSON representation, NULL never compares equal, and LIKE patterns
/// use `%` and `_`. Joined queries are rejected.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    state: Mutex<MemoryState>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next storage call fail with a backend error
    pub fn fail_next(&self, message: impl Into<String>) {
        self.lock().fail_next = Some(message.into());
    }

    /// Raw contents of a table, ignoring every filter
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.lock().tables.get(table).cloned().unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn begin(&self, table: &str, operation: &str) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        let mut state = self.lock();
        match state.fail_next.take() {
            Some(message) => Err(StoreError::backend(table, operation, message)),
            None => Ok(state),
        }
    }

    fn matching_indices(query: &QueryBuilder, rows: &[Row]) -> Result<Vec<usize>, StoreError> {
        check_query(query)?;
        Ok(rows
            .iter()
            .enumerate()
            .filter(|(_, row)| {
                query
                    .conditions()
                    .iter()
                    .all(|filter| matches_filter(filter, row))
            })
            .map(|(index, _)| index)
            .collect())
    }

    /// Matched rows in ORDER BY order, cut to the LIMIT/OFFSET window
    ///
    /// Updates and deletes go through the same window as selects, so they
    /// touch exactly the rows a select would return.
    fn windowed_indices(query: &QueryBuilder, rows: &[Row]) -> Result<Vec<usize>, StoreError> {
        let mut indices = Self::matching_indices(query, rows)?;

        if !query.ordering().is_empty() {
            indices.sort_by(|&a, &b| {
                query
                    .ordering()
                    .iter()
                    .map(|(field, order)| {
                        order.apply(sort_compare(
                            rows[a].get(column_of(field)).unwrap_or(&Value::Null),
                            rows[b].get(column_of(field)).unwrap_or(&Value::Null),
                        ))
                    })
                    .find(|ordering| *ordering != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        let offset = query.offset_value().unwrap_or(0).max(0) as usize;
        let limit = query
            .limit_value()
            .map(|limit| limit.max(0) as usize)
            .unwrap_or(usize::MAX);
        Ok(indices.into_iter().skip(offset).take(limit).collect())
    }

    fn select_rows(&self, query: &QueryBuilder) -> Result<Vec<Row>, StoreError> {
        let state = self.begin(query.table(), "select")?;
        let rows = match state.tables.get(query.table()) {
            Some(rows) => rows,
            None => return Ok(Vec::new()),
        };

        Ok(Self::windowed_indices(query, rows)?
            .into_iter()
            .map(|index| rows[index].clone())
            .collect())
    }

    fn count_rows(&self, query: &QueryBuilder) -> Result<i64, StoreError> {
        let state = self.begin(query.table(), "count")?;
        let count = match state.tables.get(query.table()) {
            Some(rows) => Self::matching_indices(query, rows)?.len(),
            None => 0,
        };
        Ok(count as i64)
    }

    fn insert_row(&self, table: &str, primary_key: &str, values: &UpdateSet) -> Result<Row, StoreError> {
        let mut state = self.begin(table, "insert")?;
        let mut row: Row = values
            .iter()
            .map(|(column, value)| (column_of(column).to_string(), value.clone()))
            .collect();
        let state = &mut *state;
        let sequence = state.sequences.entry(table.to_string()).or_insert(0);

        match row.get(primary_key).filter(|key| !key.is_null()) {
            Some(key) => {
                if let Some(id) = key.as_i64() {
                    *sequence = (*sequence).max(id);
                }
            }
            None => {
                *sequence += 1;
                row.insert(primary_key.to_string(), Value::from(*sequence));
            }
        }

        let rows = state.tables.entry(table.to_string()).or_default();
        let key = row.get(primary_key).cloned().unwrap_or(Value::Null);
        if rows
            .iter()
            .any(|existing| existing.get(primary_key).is_some_and(|k| loose_eq(k, &key)))
        {
            return Err(StoreError::backend(
                table,
                "insert",
                format!("duplicate key value {} for '{}'", key, primary_key),
            ));
        }

        rows.push(row.clone());
        Ok(row)
    }

    fn update_rows(&self, query: &QueryBuilder, changes: &UpdateSet) -> Result<u64, StoreError> {
        let mut state = self.begin(query.table(), "update")?;
        for column in changes.columns() {
            check_field(query, column)?;
        }
        let rows = match state.tables.get_mut(query.table()) {
            Some(rows) => rows,
            None => return Ok(0),
        };

        let indices = Self::windowed_indices(query, rows)?;
        for index in &indices {
            for (column, value) in changes.iter() {
                rows[*index].insert(column_of(column).to_string(), value.clone());
            }
        }
        Ok(indices.len() as u64)
    }

    fn delete_rows(&self, query: &QueryBuilder) -> Result<u64, StoreError> {
        let mut state = self.begin(query.table(), "delete")?;
        let rows = match state.tables.get_mut(query.table()) {
            Some(rows) => rows,
            None => return Ok(0),
        };

        let mut indices = Self::windowed_indices(query, rows)?;
        indices.sort_unstable();
        for index in indices.iter().rev() {
            rows.remove(*index);
        }
        Ok(indices.len() as u64)
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn select(&self, query: &QueryBuilder) -> Result<Vec<Row>, StoreError> {
        self.select_rows(query)
    }

    async fn count(&self, query: &QueryBuilder) -> Result<i64, StoreError> {
        self.count_rows(query)
    }

    async fn insert(
        &self,
        table: &str,
        primary_key: &str,
        values: &UpdateSet,
    ) -> Result<Row, StoreError> {
        self.insert_row(table, primary_key, values)
    }

    async fn update(&self, query: &QueryBuilder, changes: &UpdateSet) -> Result<u64, StoreError> {
        self.update_rows(query, changes)
    }

    async fn delete(&self, query: &QueryBuilder) -> Result<u64, StoreError> {
        self.delete_rows(query)
    }
}

fn check_query(query: &QueryBuilder) -> Result<(), StoreError> {
    if query.has_joins() {
        return Err(StoreError::Unsupported(format!(
            "memory storage cannot join '{}'",
            query.table()
        )));
    }

    let mut result = Ok(());
    for filter in query.conditions() {
        filter.for_each_field(&mut |field| {
            if result.is_ok() {
                result = check_field(query, field);
            }
        });
    }
    for (field, _) in query.ordering() {
        check_field(query, field)?;
    }
    result
}

fn check_field(query: &QueryBuilder, field: &str) -> Result<(), StoreError> {
    match field.split_once('.') {
        Some((table, _)) if table != query.table() => Err(StoreError::Unsupported(format!(
            "column '{}' does not belong to '{}'",
            field,
            query.table()
        ))),
        _ => Ok(()),
    }
}

fn column_of(field: &str) -> &str {
    crate::validation::unqualified(field)
}

fn matches_filter(filter: &QueryFilter, row: &Row) -> bool {
    match filter {
        QueryFilter::Condition(condition) => matches_condition(condition, row),
        QueryFilter::Group { operator, filters } => match operator {
            crate::query_builder::LogicalOperator::And => {
                filters.iter().all(|f| matches_filter(f, row))
            }
            crate::query_builder::LogicalOperator::Or => {
                filters.is_empty() || filters.iter().any(|f| matches_filter(f, row))
            }
        },
    }
}

fn matches_condition(condition: &QueryCondition, row: &Row) -> bool {
    let actual = row.get(column_of(&condition.field)).unwrap_or(&Value::Null);
    let expected = condition.value.as_ref().filter(|v| !v.is_null());

    match (&condition.operator, expected) {
        (QueryOperator::Eq, None) | (QueryOperator::IsNull, _) => actual.is_null(),
        (QueryOperator::Ne, None) | (QueryOperator::IsNotNull, _) => !actual.is_null(),
        (QueryOperator::NotIn, None) => true,
        (QueryOperator::NotIn, Some(Value::Array(items))) if items.is_empty() => true,
        (_, None) => false,
        _ if actual.is_null() => false,
        (QueryOperator::Eq, Some(expected)) => loose_eq(actual, expected),
        (QueryOperator::Ne, Some(expected)) => !loose_eq(actual, expected),
        (QueryOperator::Gt, Some(expected)) => loose_cmp(actual, expected) == Some(Ordering::Greater),
        (QueryOperator::Gte, Some(expected)) => matches!(
            loose_cmp(actual, expected),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        (QueryOperator::Lt, Some(expected)) => loose_cmp(actual, expected) == Some(Ordering::Less),
        (QueryOperator::Lte, Some(expected)) => matches!(
            loose_cmp(actual, expected),
            Some(Ordering::Less | Ordering::Equal)
        ),
        (QueryOperator::Like, Some(Value::String(pattern))) => {
            as_text(actual).is_some_and(|text| like_match(&text, pattern, false))
        }
        (QueryOperator::ILike, Some(Value::String(pattern))) => {
            as_text(actual).is_some_and(|text| like_match(&text, pattern, true))
        }
        (QueryOperator::Like | QueryOperator::ILike, Some(_)) => false,
        (QueryOperator::In, Some(Value::Array(items))) => items.iter().any(|item| loose_eq(actual, item)),
        (QueryOperator::NotIn, Some(Value::Array(items))) => {
            !items.iter().any(|item| loose_eq(actual, item))
        }
        (QueryOperator::In | QueryOperator::NotIn, Some(single)) => {
            loose_eq(actual, single) == matches!(condition.operator, QueryOperator::In)
        }
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn loose_eq(a: &Value, b: &Value) -> bool {
    loose_cmp(a, b) == Some(Ordering::Equal)
}

fn loose_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => {
            (a == b).then_some(Ordering::Equal)
        }
        _ => as_number(a)?.partial_cmp(&as_number(b)?),
    }
}

/// Ordering for ORDER BY: NULL sorts after every value
fn sort_compare(a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => loose_cmp(a, b).unwrap_or_else(|| a.to_string().cmp(&b.to_string())),
    }
}

fn like_match(text: &str, pattern: &str, case_insensitive: bool) -> bool {
    let fold = |s: &str| {
        if case_insensitive {
            s.to_lowercase().chars().collect::<Vec<_>>()
        } else {
            s.chars().collect::<Vec<_>>()
        }
    };
    let text = fold(text);
    let pattern = fold(pattern);

    // matched[j]: pattern[..p] matches text[..j]
    let mut matched = vec![false; text.len() + 1];
    matched[0] = true;
    let mut p = 0;
    while p < pattern.len() {
        let (token, escaped) = match pattern[p] {
            '\\' if p + 1 < pattern.len() => {
                p += 1;
                (pattern[p], true)
            }
            c => (c, false),
        };
        p += 1;

        let mut next = vec![false; text.len() + 1];
        if token == '%' && !escaped {
            let mut any = false;
            for j in 0..=text.len() {
                any |= matched[j];
                next[j] = any;
            }
        } else {
            for j in 1..=text.len() {
                next[j] = matched[j - 1] && ((token == '_' && !escaped) || text[j - 1] == token);
            }
        }
        matched = next;
    }
    matched[text.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_builder::SortOrder;
    use serde_json::json;

    fn row(value: Value) -> UpdateSet {
        match value {
            Value::Object(map) => UpdateSet::from(map),
            _ => panic!("expected object"),
        }
    }

    async fn seeded() -> MemoryStorage {
        let storage = MemoryStorage::new();
        for (title, views, deleted) in [("alpha", 10, false), ("beta", 3, true), ("gamma", 7, false)] {
            storage
                .insert(
                    "posts",
                    "id",
                    &row(json!({"title": title, "views": views, "deleted": deleted, "deleted_at": null})),
                )
                .await
                .expect("insert");
        }
        storage
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_keys() {
        let storage = seeded().await;
        let ids: Vec<Value> = storage.rows("posts").iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!(1), json!(2), json!(3)]);

        let explicit = storage
            .insert("posts", "id", &row(json!({"id": 10, "title": "delta"})))
            .await
            .expect("insert");
        assert_eq!(explicit["id"], json!(10));

        let next = storage
            .insert("posts", "id", &row(json!({"title": "epsilon"})))
            .await
            .expect("insert");
        assert_eq!(next["id"], json!(11));
    }

    #[tokio::test]
    async fn test_duplicate_key_is_rejected() {
        let storage = seeded().await;
        let err = storage
            .insert("posts", "id", &row(json!({"id": 2})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Backend { .. }));
    }

    #[tokio::test]
    async fn test_select_filters_orders_and_pages() {
        let storage = seeded().await;
        let query = QueryBuilder::new("posts")
            .filter(QueryFilter::eq("posts.deleted", false))
            .order_by("views", SortOrder::Desc);
        let titles: Vec<Value> = storage
            .select(&query)
            .await
            .expect("select")
            .iter()
            .map(|r| r["title"].clone())
            .collect();
        assert_eq!(titles, vec![json!("alpha"), json!("gamma")]);

        let paged = QueryBuilder::new("posts")
            .order_by("id", SortOrder::Asc)
            .limit(1)
            .offset(1);
        let rows = storage.select(&paged).await.expect("select");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["title"], json!("beta"));
    }

    #[tokio::test]
    async fn test_null_and_numeric_semantics() {
        let storage = seeded().await;
        let null_query = QueryBuilder::new("posts").filter(QueryFilter::eq("deleted_at", Value::Null));
        assert_eq!(storage.count(&null_query).await.expect("count"), 3);

        let numeric = QueryBuilder::new("posts").filter(QueryFilter::gte("views", "7"));
        assert_eq!(storage.count(&numeric).await.expect("count"), 2);

        let flag = QueryBuilder::new("posts").filter(QueryFilter::eq("deleted", 1));
        assert_eq!(storage.count(&flag).await.expect("count"), 1);
    }

    #[tokio::test]
    async fn test_like_and_in() {
        let storage = seeded().await;
        let like = QueryBuilder::new("posts").filter(QueryFilter::like("title", "%m_a"));
        assert_eq!(storage.count(&like).await.expect("count"), 1);

        let ilike = QueryBuilder::new("posts").filter(QueryFilter::ilike("title", "GAM%"));
        assert_eq!(storage.count(&ilike).await.expect("count"), 1);

        let within = QueryBuilder::new("posts")
            .filter(QueryFilter::in_values("id", vec![json!(1), json!(3)]));
        assert_eq!(storage.count(&within).await.expect("count"), 2);

        let empty = QueryBuilder::new("posts").filter(QueryFilter::in_values("id", Vec::<Value>::new()));
        assert_eq!(storage.count(&empty).await.expect("count"), 0);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let storage = seeded().await;
        let trashed = QueryBuilder::new("posts").filter(QueryFilter::eq("deleted", true));
        let changes = UpdateSet::new()
            .set("posts.deleted", false)
            .set("deleted_at", Value::Null);
        assert_eq!(storage.update(&trashed, &changes).await.expect("update"), 1);
        assert!(storage.rows("posts").iter().all(|r| r["deleted"] == json!(false)));

        let by_key = QueryBuilder::new("posts").filter(QueryFilter::eq("id", 2));
        assert_eq!(storage.delete(&by_key).await.expect("delete"), 1);
        assert_eq!(storage.rows("posts").len(), 2);
    }

    #[tokio::test]
    async fn test_fail_next_is_one_shot() {
        let storage = seeded().await;
        storage.fail_next("connection reset");
        let query = QueryBuilder::new("posts");
        let err = storage.count(&query).await.unwrap_err();
        assert!(err.to_string().contains("connection reset"));
        assert_eq!(storage.count(&query).await.expect("count"), 3);
    }

    #[tokio::test]
    async fn test_joins_and_foreign_columns_are_rejected() {
        let storage = seeded().await;
        let joined = QueryBuilder::new("posts").inner_join("authors", "posts.author_id", "authors.id");
        assert!(matches!(
            storage.select(&joined).await,
            Err(StoreError::Unsupported(_))
        ));

        let foreign = QueryBuilder::new("posts").filter(QueryFilter::eq("authors.id", 1));
        assert!(matches!(
            storage.count(&foreign).await,
            Err(StoreError::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn test_limited_update_and_delete_touch_only_the_window() {
        let storage = seeded().await;
        let oldest = QueryBuilder::new("posts")
            .order_by("id", SortOrder::Asc)
            .limit(1);
        assert_eq!(
            storage
                .update(&oldest, &UpdateSet::new().set("views", 0))
                .await
                .expect("update"),
            1
        );
        let views: Vec<Value> = storage.rows("posts").iter().map(|r| r["views"].clone()).collect();
        assert_eq!(views, vec![json!(0), json!(3), json!(7)]);

        let most_viewed_after_first = QueryBuilder::new("posts")
            .order_by("views", SortOrder::Desc)
            .offset(1)
            .limit(5);
        assert_eq!(storage.delete(&most_viewed_after_first).await.expect("delete"), 2);
        let titles: Vec<Value> = storage.rows("posts").iter().map(|r| r["title"].clone()).collect();
        assert_eq!(titles, vec![json!("gamma")]);
    }

    #[test]
    fn test_like_match_escapes() {
        assert!(like_match("100%", "100\\%", false));
        assert!(!like_match("1000", "100\\%", false));
        assert!(like_match("", "%", false));
        assert!(!like_match("abc", "a_", false));
    }
}
