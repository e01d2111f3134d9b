//! JOIN clauses
//!
//! Only inner and left joins exist: every row a model query returns comes
//! from the model's own table. Once a query has a join, bare column names may
//! be ambiguous, so soft-delete columns are written table-qualified.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
}

impl JoinType {
    fn keyword(self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinCondition {
    /// `ON left = right`
    On {
        left_field: String,
        right_field: String,
    },
    /// `USING (columns)`
    Using(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub join_type: JoinType,
    pub table: String,
    pub alias: Option<String>,
    pub condition: JoinCondition,
}

impl JoinClause {
    pub fn on(
        join_type: JoinType,
        table: impl Into<String>,
        left_field: impl Into<String>,
        right_field: impl Into<String>,
    ) -> Self {
        Self {
            join_type,
            table: table.into(),
            alias: None,
            condition: JoinCondition::On {
                left_field: left_field.into(),
                right_field: right_field.into(),
            },
        }
    }

    pub fn inner(table: &str, left_field: &str, right_field: &str) -> Self {
        Self::on(JoinType::Inner, table, left_field, right_field)
    }

    pub fn left(table: &str, left_field: &str, right_field: &str) -> Self {
        Self::on(JoinType::Left, table, left_field, right_field)
    }

    pub fn using(
        join_type: JoinType,
        table: impl Into<String>,
        columns: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            join_type,
            table: table.into(),
            alias: None,
            condition: JoinCondition::Using(columns.into_iter().map(Into::into).collect()),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Name the joined table is referred to by
    pub fn table_ref(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table)
    }

    pub fn for_each_field<'a>(&'a self, visit: &mut impl FnMut(&'a str)) {
        match &self.condition {
            JoinCondition::On {
                left_field,
                right_field,
            } => {
                visit(left_field);
                visit(right_field);
            }
            JoinCondition::Using(columns) => columns.iter().for_each(|column| visit(column)),
        }
    }
}

impl fmt::Display for JoinClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.join_type.keyword(), self.table)?;
        if let Some(alias) = &self.alias {
            write!(f, " AS {}", alias)?;
        }
        match &self.condition {
            JoinCondition::On {
                left_field,
                right_field,
            } => write!(f, " ON {} = {}", left_field, right_field),
            JoinCondition::Using(columns) => write!(f, " USING ({})", columns.join(", ")),
        }
    }
}
