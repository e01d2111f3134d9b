use super::cast::SqlCast;
use crate::record::{timestamp_value, Row};
use crate::validation::unqualified;
use chrono::{DateTime, Utc};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
struct Assignment {
    column: String,
    value: Value,
    cast: Option<SqlCast>,
}

/// Ordered column assignments for an UPDATE or INSERT
///
/// Setting a column twice keeps its first position and the last value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSet {
    assignments: Vec<Assignment>,
}

impl UpdateSet {
    pub fn new() -> Self {
        Self {
            assignments: Vec::new(),
        }
    }

    /// Set a field to a specific value
    pub fn set(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.assign(field.into(), value.into(), None)
    }

    /// Set a field, casting the bound value to `cast`
    pub fn set_cast(self, field: impl Into<String>, value: impl Into<Value>, cast: SqlCast) -> Self {
        self.assign(field.into(), value.into(), Some(cast))
    }

    /// Set a `timestamptz` column
    pub fn set_timestamp(self, field: impl Into<String>, at: DateTime<Utc>) -> Self {
        self.set_cast(field, timestamp_value(at), SqlCast::Timestamptz)
    }

    /// Cast an already assigned column, ignoring any table qualifier
    pub fn cast(mut self, field: &str, cast: SqlCast) -> Self {
        let wanted = unqualified(field);
        for assignment in &mut self.assignments {
            if unqualified(&assignment.column) == wanted {
                assignment.cast = Some(cast);
            }
        }
        self
    }

    /// Drop a column when it is assigned NULL
    pub fn without_null(mut self, field: &str) -> Self {
        self.assignments
            .retain(|a| a.column != field || !a.value.is_null());
        self
    }

    fn assign(mut self, column: String, value: Value, cast: Option<SqlCast>) -> Self {
        match self.assignments.iter_mut().find(|a| a.column == column) {
            Some(existing) => {
                existing.value = value;
                existing.cast = cast;
            }
            None => self.assignments.push(Assignment {
                column,
                value,
                cast,
            }),
        }
        self
    }

    /// Whether a column is assigned, ignoring any table qualifier
    pub fn contains(&self, field: &str) -> bool {
        let wanted = unqualified(field);
        self.assignments
            .iter()
            .any(|a| unqualified(&a.column) == wanted)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.assignments
            .iter()
            .find(|a| a.column == field)
            .map(|a| &a.value)
    }

    pub fn cast_of(&self, field: &str) -> Option<SqlCast> {
        self.assignments
            .iter()
            .find(|a| a.column == field)
            .and_then(|a| a.cast)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.assignments
            .iter()
            .map(|a| (a.column.as_str(), &a.value))
    }

    /// Assigned column names as given
    pub fn columns(&self) -> Vec<&str> {
        self.assignments.iter().map(|a| a.column.as_str()).collect()
    }

    /// Assigned column names with table qualifiers dropped
    pub fn unqualified_columns(&self) -> Vec<&str> {
        self.assignments.iter().map(|a| unqualified(&a.column)).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// One value expression per assignment, numbered from `first_param`
    ///
    /// NULL is written inline so the column type decides the NULL type.
    pub fn placeholders(&self, first_param: usize) -> (Vec<String>, Vec<Value>) {
        let mut values = Vec::with_capacity(self.assignments.len());
        let expressions = self
            .assignments
            .iter()
            .map(|a| {
                if a.value.is_null() {
                    "NULL".to_string()
                } else {
                    values.push(a.value.clone());
                    SqlCast::placeholder(a.cast, first_param + values.len() - 1)
                }
            })
            .collect();
        (expressions, values)
    }

    /// Render the SET list with placeholders starting at `first_param`
    ///
    /// PostgreSQL rejects qualified SET targets, so qualifiers are dropped.
    pub fn to_sql(&self, first_param: usize) -> (String, Vec<Value>) {
        let (expressions, values) = self.placeholders(first_param);
        let clause = self
            .unqualified_columns()
            .into_iter()
            .zip(expressions)
            .map(|(column, expression)| format!("{} = {}", column, expression))
            .collect::<Vec<_>>()
            .join(", ");
        (clause, values)
    }
}

impl From<Row> for UpdateSet {
    fn from(row: Row) -> Self {
        row.into_iter()
            .fold(UpdateSet::new(), |set, (column, value)| set.set(column, value))
    }
}
