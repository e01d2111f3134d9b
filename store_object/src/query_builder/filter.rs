//! Filter tree for WHERE clauses
//!
//! The same tree is rendered to SQL by [`SqlGenerator`](super::SqlGenerator)
//! and evaluated directly by the in-memory backend.

use super::cast::SqlCast;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOperator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    /// Case-insensitive LIKE
    ILike,
    In,
    NotIn,
    IsNull,
    IsNotNull,
}

impl QueryOperator {
    /// SQL spelling of a binary operator
    pub fn sql(self) -> &'static str {
        match self {
            QueryOperator::Eq => "=",
            QueryOperator::Ne => "!=",
            QueryOperator::Gt => ">",
            QueryOperator::Gte => ">=",
            QueryOperator::Lt => "<",
            QueryOperator::Lte => "<=",
            QueryOperator::Like => "LIKE",
            QueryOperator::ILike => "ILIKE",
            QueryOperator::In => "IN",
            QueryOperator::NotIn => "NOT IN",
            QueryOperator::IsNull => "IS NULL",
            QueryOperator::IsNotNull => "IS NOT NULL",
        }
    }

    /// Operand is an array of candidates
    pub fn takes_list(self) -> bool {
        matches!(self, QueryOperator::In | QueryOperator::NotIn)
    }

    /// No operand at all
    pub fn is_null_test(self) -> bool {
        matches!(self, QueryOperator::IsNull | QueryOperator::IsNotNull)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryCondition {
    pub field: String,
    pub operator: QueryOperator,
    /// `None` for the null tests
    pub value: Option<Value>,
    /// Type the bound operand is cast to
    pub cast: Option<SqlCast>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

impl LogicalOperator {
    /// Separator placed between the members of a group
    pub fn separator(self) -> &'static str {
        match self {
            LogicalOperator::And => " AND ",
            LogicalOperator::Or => " OR ",
        }
    }
}

/// Condition or nested AND/OR group
#[derive(Debug, Clone, PartialEq)]
pub enum QueryFilter {
    Condition(QueryCondition),
    Group {
        operator: LogicalOperator,
        filters: Vec<QueryFilter>,
    },
}

macro_rules! comparison_filters {
    ($($name:ident => $operator:ident),* $(,)?) => {
        $(
            pub fn $name(field: &str, value: impl Into<Value>) -> Self {
                Self::condition(field, QueryOperator::$operator, Some(value.into()))
            }
        )*
    };
}

impl QueryFilter {
    pub fn condition(field: &str, operator: QueryOperator, value: Option<Value>) -> Self {
        Self::Condition(QueryCondition {
            field: field.to_string(),
            operator,
            value,
            cast: None,
        })
    }

    /// All members must match; an empty group matches everything
    pub fn and(filters: Vec<QueryFilter>) -> Self {
        Self::Group {
            operator: LogicalOperator::And,
            filters,
        }
    }

    /// Any member may match; an empty group matches everything
    pub fn or(filters: Vec<QueryFilter>) -> Self {
        Self::Group {
            operator: LogicalOperator::Or,
            filters,
        }
    }

    comparison_filters! {
        eq => Eq,
        ne => Ne,
        gt => Gt,
        gte => Gte,
        lt => Lt,
        lte => Lte,
    }

    pub fn like(field: &str, pattern: impl Into<String>) -> Self {
        Self::condition(field, QueryOperator::Like, Some(Value::String(pattern.into())))
    }

    pub fn ilike(field: &str, pattern: impl Into<String>) -> Self {
        Self::condition(field, QueryOperator::ILike, Some(Value::String(pattern.into())))
    }

    pub fn in_values(field: &str, values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Self::list(field, QueryOperator::In, values)
    }

    pub fn not_in_values(field: &str, values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Self::list(field, QueryOperator::NotIn, values)
    }

    pub fn is_null(field: &str) -> Self {
        Self::condition(field, QueryOperator::IsNull, None)
    }

    pub fn is_not_null(field: &str) -> Self {
        Self::condition(field, QueryOperator::IsNotNull, None)
    }

    fn list(
        field: &str,
        operator: QueryOperator,
        values: impl IntoIterator<Item = impl Into<Value>>,
    ) -> Self {
        let items = values.into_iter().map(Into::into).collect();
        Self::condition(field, operator, Some(Value::Array(items)))
    }

    /// Cast the operands of every condition in this filter
    ///
    /// ```
    /// use store_object::query_builder::{QueryFilter, SqlCast, SqlGenerator};
    ///
    /// let filter = QueryFilter::eq("session_id", "550e8400-e29b-41d4-a716-446655440000")
    ///     .cast(SqlCast::Uuid);
    /// let (sql, _) = SqlGenerator::build_where_clause(&[filter]);
    /// assert_eq!(sql, "WHERE session_id = $1::uuid");
    /// ```
    pub fn cast(self, cast: SqlCast) -> Self {
        match self {
            QueryFilter::Condition(condition) => QueryFilter::Condition(QueryCondition {
                cast: Some(cast),
                ..condition
            }),
            QueryFilter::Group { operator, filters } => QueryFilter::Group {
                operator,
                filters: filters.into_iter().map(|f| f.cast(cast)).collect(),
            },
        }
    }

    /// Visit every field referenced by this filter
    pub fn for_each_field<'a>(&'a self, visit: &mut impl FnMut(&'a str)) {
        match self {
            QueryFilter::Condition(condition) => visit(&condition.field),
            QueryFilter::Group { filters, .. } => {
                for filter in filters {
                    filter.for_each_field(visit);
                }
            }
        }
    }
}
