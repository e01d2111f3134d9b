//! SQL generation for PostgreSQL
//!
//! Rows are read back as JSON through `row_to_json`, so every statement that
//! returns rows wraps its result in a single JSON column named `row`.

use crate::errors::StoreError;
use crate::query_builder::builder::{QueryBuilder, SortOrder};
use crate::query_builder::cast::SqlCast;
use crate::query_builder::filter::{QueryCondition, QueryFilter, QueryOperator};
use crate::query_builder::join::JoinClause;
use crate::query_builder::update::UpdateSet;
use serde_json::Value;

pub struct SqlGenerator;

impl SqlGenerator {
    /// Build WHERE clause from conditions, placeholders starting at `$1`
    pub fn build_where_clause(conditions: &[QueryFilter]) -> (String, Vec<Value>) {
        Self::build_where_clause_from(conditions, 1)
    }

    /// Build WHERE clause with placeholders starting at `first_param`
    pub fn build_where_clause_from(
        conditions: &[QueryFilter],
        first_param: usize,
    ) -> (String, Vec<Value>) {
        if conditions.is_empty() {
            return ("".to_string(), Vec::new());
        }

        let mut values = Vec::new();
        let mut param_counter = first_param;

        let conditions_sql = conditions
            .iter()
            .map(|condition| Self::build_condition_sql(condition, &mut values, &mut param_counter))
            .collect::<Vec<_>>()
            .join(" AND ");

        (format!("WHERE {}", conditions_sql), values)
    }

    fn build_condition_sql(
        filter: &QueryFilter,
        values: &mut Vec<Value>,
        param_counter: &mut usize,
    ) -> String {
        match filter {
            QueryFilter::Condition(condition) => {
                Self::build_single_condition_sql(condition, values, param_counter)
            }
            QueryFilter::Group { filters, .. } if filters.is_empty() => "1=1".to_string(),
            QueryFilter::Group { operator, filters } => {
                let members = filters
                    .iter()
                    .map(|f| Self::build_condition_sql(f, values, param_counter))
                    .collect::<Vec<_>>();
                format!("({})", members.join(operator.separator()))
            }
        }
    }

    fn next_param(
        value: &Value,
        cast: Option<SqlCast>,
        values: &mut Vec<Value>,
        param_counter: &mut usize,
    ) -> String {
        values.push(value.clone());
        let param = SqlCast::placeholder(cast, *param_counter);
        *param_counter += 1;
        param
    }

    /// Render one condition
    ///
    /// `= NULL` and `!= NULL` become null tests; any other comparison with
    /// NULL matches nothing. An empty IN list matches nothing and an empty
    /// NOT IN list matches everything.
    fn build_single_condition_sql(
        condition: &QueryCondition,
        values: &mut Vec<Value>,
        param_counter: &mut usize,
    ) -> String {
        let field = &condition.field;
        let operator = condition.operator;
        let value = condition.value.as_ref().filter(|v| !v.is_null());

        match (operator, value) {
            (op, _) if op.is_null_test() => format!("{} {}", field, op.sql()),
            (QueryOperator::Eq, None) => format!("{} IS NULL", field),
            (QueryOperator::Ne, None) => format!("{} IS NOT NULL", field),
            (op, Some(Value::Array(items))) if op.takes_list() && !items.is_empty() => {
                let placeholders: Vec<String> = items
                    .iter()
                    .map(|item| Self::next_param(item, condition.cast, values, param_counter))
                    .collect();
                format!("{} {} ({})", field, op.sql(), placeholders.join(", "))
            }
            (QueryOperator::NotIn, _) => "1=1".to_string(),
            (QueryOperator::In, _) | (_, None) => "1=0".to_string(),
            (op, Some(value)) => format!(
                "{} {} {}",
                field,
                op.sql(),
                Self::next_param(value, condition.cast, values, param_counter)
            ),
        }
    }

    /// Build ORDER BY clause
    pub fn build_order_clause(order_by: &[(String, SortOrder)]) -> String {
        if order_by.is_empty() {
            return String::new();
        }

        let order_items: Vec<String> = order_by
            .iter()
            .map(|(field, order)| format!("{} {}", field, order))
            .collect();

        format!("ORDER BY {}", order_items.join(", "))
    }

    /// Build LIMIT/OFFSET clause
    pub fn build_limit_clause(limit: Option<i64>, offset: Option<i64>) -> String {
        let limit = limit.map(|limit| format!("LIMIT {}", limit));
        let offset = offset.map(|offset| format!("OFFSET {}", offset));
        limit.into_iter().chain(offset).collect::<Vec<_>>().join(" ")
    }

    pub fn build_join_clause(joins: &[JoinClause]) -> String {
        joins
            .iter()
            .map(JoinClause::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// `SELECT row_to_json(...)` over the target table's columns
    pub fn select_sql(query: &QueryBuilder) -> (String, Vec<Value>) {
        let (where_clause, values) = Self::build_where_clause(&query.conditions);
        let inner = join_parts(&[
            &format!("SELECT {}.* FROM {}", query.table, query.table),
            &Self::build_join_clause(&query.joins),
            &where_clause,
            &Self::build_order_clause(&query.order_by),
            &Self::build_limit_clause(query.limit, query.offset),
        ]);
        (
            format!("SELECT row_to_json(q) AS row FROM ({}) q", inner),
            values,
        )
    }

    pub fn count_sql(query: &QueryBuilder) -> (String, Vec<Value>) {
        let (where_clause, values) = Self::build_where_clause(&query.conditions);
        let sql = join_parts(&[
            &format!("SELECT COUNT(*) AS total FROM {}", query.table),
            &Self::build_join_clause(&query.joins),
            &where_clause,
        ]);
        (sql, values)
    }

    /// `UPDATE` of the rows matched by the query
    ///
    /// SET parameters come first, WHERE parameters are numbered after them.
    pub fn update_sql(
        query: &QueryBuilder,
        changes: &UpdateSet,
    ) -> Result<(String, Vec<Value>), StoreError> {
        if changes.is_empty() {
            return Err(StoreError::Unsupported(format!(
                "update of '{}' without assignments",
                query.table
            )));
        }

        let (set_clause, mut values) = changes.to_sql(1);
        let (where_clause, where_values) = Self::target_filter(query, values.len() + 1)?;
        values.extend(where_values);

        let sql = join_parts(&[
            &format!("UPDATE {} SET {}", query.table, set_clause),
            &where_clause,
        ]);
        Ok((sql, values))
    }

    /// `DELETE` of the rows matched by the query
    pub fn delete_sql(query: &QueryBuilder) -> Result<(String, Vec<Value>), StoreError> {
        let (where_clause, values) = Self::target_filter(query, 1)?;
        let sql = join_parts(&[&format!("DELETE FROM {}", query.table), &where_clause]);
        Ok((sql, values))
    }

    /// `INSERT ... RETURNING` the stored row as JSON
    ///
    /// NULL values are written inline, like in [`UpdateSet::to_sql`].
    pub fn insert_sql(table: &str, row: &UpdateSet) -> (String, Vec<Value>) {
        if row.is_empty() {
            return (
                format!(
                    "INSERT INTO {} DEFAULT VALUES RETURNING row_to_json({}.*) AS row",
                    table, table
                ),
                Vec::new(),
            );
        }

        let (placeholders, values) = row.placeholders(1);
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING row_to_json({}.*) AS row",
            table,
            row.unqualified_columns().join(", "),
            placeholders.join(", "),
            table
        );
        (sql, values)
    }

    /// WHERE clause selecting the rows an update or delete touches
    ///
    /// A plain query filters the table directly. Joined or paged queries
    /// select the target keys in a sub-query instead, carrying the joins,
    /// ORDER BY, LIMIT and OFFSET, so exactly the rows a select would return
    /// are affected.
    fn target_filter(
        query: &QueryBuilder,
        first_param: usize,
    ) -> Result<(String, Vec<Value>), StoreError> {
        let (where_clause, values) =
            Self::build_where_clause_from(&query.conditions, first_param);

        let windowed = query.is_windowed();
        if !query.has_joins() && !windowed {
            return Ok((where_clause, values));
        }

        let primary_key = query.primary_key.as_deref().ok_or_else(|| {
            StoreError::Unsupported(format!(
                "joined or limited update or delete on '{}' requires a primary key",
                query.table
            ))
        })?;

        let (order_clause, limit_clause) = if windowed {
            (
                Self::build_order_clause(&query.order_by),
                Self::build_limit_clause(query.limit, query.offset),
            )
        } else {
            (String::new(), String::new())
        };

        let sub_select = join_parts(&[
            &format!(
                "SELECT {}.{} FROM {}",
                query.table, primary_key, query.table
            ),
            &Self::build_join_clause(&query.joins),
            &where_clause,
            &order_clause,
            &limit_clause,
        ]);
        Ok((
            format!("WHERE {}.{} IN ({})", query.table, primary_key, sub_select),
            values,
        ))
    }
}

fn join_parts(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}
