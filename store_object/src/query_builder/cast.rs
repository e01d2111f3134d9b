//! Explicit parameter types
//!
//! Every JSON string is bound as `text`. A parameter written to, or compared
//! with, a column of another type carries a [`SqlCast`] and is rendered as
//! `$n::type` so PostgreSQL converts the text itself.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlCast {
    Timestamptz,
    Timestamp,
    Date,
    Uuid,
    Jsonb,
}

impl SqlCast {
    pub fn type_name(self) -> &'static str {
        match self {
            SqlCast::Timestamptz => "timestamptz",
            SqlCast::Timestamp => "timestamp",
            SqlCast::Date => "date",
            SqlCast::Uuid => "uuid",
            SqlCast::Jsonb => "jsonb",
        }
    }

    /// `$n`, followed by `::type` when a cast is given
    pub fn placeholder(cast: Option<SqlCast>, index: usize) -> String {
        match cast {
            Some(cast) => format!("${}::{}", index, cast),
            None => format!("${}", index),
        }
    }
}

impl fmt::Display for SqlCast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}
