//! In-memory record with change tracking
//!
//! A [`Record`] holds the attribute map of one row together with the values
//! last synchronised with storage, so callers can tell which attributes are
//! dirty and persist only those.

use crate::errors::StoreError;
use crate::traits::{SoftDeletable, TableMetadata};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

/// A row as stored: column name to JSON value
pub type Row = Map<String, Value>;

/// Format a timestamp the way records store them
pub fn timestamp_value(at: DateTime<Utc>) -> Value {
    Value::String(at.to_rfc3339_opts(SecondsFormat::Micros, true))
}

pub struct Record<T> {
    attributes: Row,
    original: Row,
    exists: bool,
    force_deleting: bool,
    _model: PhantomData<fn() -> T>,
}

impl<T> Clone for Record<T> {
    fn clone(&self) -> Self {
        Self {
            attributes: self.attributes.clone(),
            original: self.original.clone(),
            exists: self.exists,
            force_deleting: self.force_deleting,
            _model: PhantomData,
        }
    }
}

impl<T: TableMetadata> std::fmt::Debug for Record<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("table", &T::table_name())
            .field("attributes", &self.attributes)
            .field("exists", &self.exists)
            .field("force_deleting", &self.force_deleting)
            .finish()
    }
}

impl<T: TableMetadata> Default for Record<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TableMetadata> Record<T> {
    /// Empty record not yet persisted
    pub fn new() -> Self {
        Self::from_attributes(Row::new())
    }

    /// Record not yet persisted, every attribute counts as dirty
    pub fn from_attributes(attributes: Row) -> Self {
        Self {
            attributes,
            original: Row::new(),
            exists: false,
            force_deleting: false,
            _model: PhantomData,
        }
    }

    /// Record built from a serializable model value
    pub fn from_model<M: Serialize>(model: &M) -> Result<Self, StoreError> {
        match serde_json::to_value(model)? {
            Value::Object(attributes) => Ok(Self::from_attributes(attributes)),
            other => Err(StoreError::validation(
                T::table_name(),
                "*",
                format!("model serialized to {} instead of an object", json_kind(&other)),
            )),
        }
    }

    /// Record loaded from storage, clean and existing
    pub(crate) fn from_storage(attributes: Row) -> Self {
        Self {
            original: attributes.clone(),
            attributes,
            exists: true,
            force_deleting: false,
            _model: PhantomData,
        }
    }

    /// Replace the attributes with a row just written to storage
    pub(crate) fn load(&mut self, attributes: Row) {
        self.original = attributes.clone();
        self.attributes = attributes;
        self.exists = true;
    }

    /// Deserialize the attributes into a model value
    pub fn to_model<M: DeserializeOwned>(&self) -> Result<M, StoreError> {
        Ok(serde_json::from_value(Value::Object(self.attributes.clone()))?)
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.attributes.get(column)
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(column.into(), value.into());
    }

    /// Primary key value, `None` when missing or null
    pub fn key(&self) -> Option<&Value> {
        self.attributes
            .get(T::primary_key_field())
            .filter(|value| !value.is_null())
    }

    pub fn attributes(&self) -> &Row {
        &self.attributes
    }

    pub fn into_attributes(self) -> Row {
        self.attributes
    }

    /// Whether the row is known to exist in storage
    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn set_exists(&mut self, exists: bool) {
        self.exists = exists;
    }

    /// Value of a column as last synchronised with storage
    pub fn original(&self, column: &str) -> Option<&Value> {
        self.original.get(column)
    }

    pub fn is_dirty(&self) -> bool {
        self.attributes
            .iter()
            .any(|(column, value)| self.original.get(column) != Some(value))
    }

    pub fn is_dirty_attribute(&self, column: &str) -> bool {
        self.attributes.get(column) != self.original.get(column)
    }

    /// Attributes that differ from their original value
    pub fn dirty(&self) -> Row {
        self.attributes
            .iter()
            .filter(|(column, value)| self.original.get(*column) != Some(*value))
            .map(|(column, value)| (column.clone(), value.clone()))
            .collect()
    }

    /// Treat every current attribute as persisted
    pub fn sync_original(&mut self) {
        self.original = self.attributes.clone();
    }

    /// Treat only the given attributes as persisted
    pub fn sync_original_attributes(&mut self, columns: &[&str]) {
        for column in columns {
            match self.attributes.get(*column) {
                Some(value) => {
                    self.original.insert(column.to_string(), value.clone());
                }
                None => {
                    self.original.remove(*column);
                }
            }
        }
    }

    /// True only while a forced delete of this instance is running
    pub fn is_force_deleting(&self) -> bool {
        self.force_deleting
    }

    /// Mark the record as force deleting until the guard is dropped
    pub(crate) fn force_deleting(&mut self) -> ForceDeleteGuard<'_, T> {
        self.force_deleting = true;
        ForceDeleteGuard { record: self }
    }
}

impl<T: SoftDeletable> Record<T> {
    /// Whether the deleted flag is set
    pub fn trashed(&self) -> bool {
        match self.attributes.get(T::deleted_column()) {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
            _ => false,
        }
    }

    /// Deletion timestamp, `None` when null or unparseable
    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        match self.attributes.get(T::deleted_at_column()) {
            Some(Value::String(raw)) => parse_timestamp(raw),
            _ => None,
        }
    }
}

/// Resets the force-deleting indicator when dropped
///
/// Dropping happens on success, on error and when the owning future is
/// cancelled mid-await.
pub(crate) struct ForceDeleteGuard<'a, T: TableMetadata> {
    record: &'a mut Record<T>,
}

impl<T: TableMetadata> Deref for ForceDeleteGuard<'_, T> {
    type Target = Record<T>;

    fn deref(&self) -> &Record<T> {
        self.record
    }
}

impl<T: TableMetadata> DerefMut for ForceDeleteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Record<T> {
        self.record
    }
}

impl<T: TableMetadata> Drop for ForceDeleteGuard<'_, T> {
    fn drop(&mut self) {
        self.record.force_deleting = false;
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
