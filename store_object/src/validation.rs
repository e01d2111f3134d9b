//! Identifier validation
//!
//! Table and column names are interpolated into generated SQL, so every
//! identifier is checked before it reaches a statement.

use std::fmt;
use thiserror::Error;

/// PostgreSQL identifier length limit
const MAX_LENGTH: usize = 63;

const RESERVED_KEYWORDS: &[&str] = &[
    "ALL", "AND", "ANY", "AS", "ASC", "BETWEEN", "BY", "CASE", "CHECK", "COLUMN", "CONSTRAINT",
    "CREATE", "CROSS", "DEFAULT", "DELETE", "DESC", "DISTINCT", "DROP", "ELSE", "END", "EXISTS",
    "FALSE", "FOR", "FOREIGN", "FROM", "FULL", "GRANT", "GROUP", "HAVING", "IN", "INNER",
    "INSERT", "INTO", "IS", "JOIN", "LEFT", "LIKE", "LIMIT", "NOT", "NULL", "OFFSET", "ON", "OR",
    "ORDER", "OUTER", "PRIMARY", "REFERENCES", "RETURNING", "RIGHT", "SELECT", "SET", "TABLE",
    "THEN", "TRUE", "UNION", "UNIQUE", "UPDATE", "USING", "VALUES", "WHEN", "WHERE", "WITH",
];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("identifier cannot be empty")]
    Empty,

    #[error("identifier '{name}' is {length} characters long (max {max_length})")]
    TooLong {
        name: String,
        length: usize,
        max_length: usize,
    },

    #[error("identifier '{0}' must start with a letter or underscore")]
    InvalidStartCharacter(String),

    #[error("identifier '{0}' may only contain ASCII letters, digits and underscores")]
    InvalidCharacters(String),

    #[error("identifier '{0}' is a reserved SQL keyword")]
    ReservedKeyword(String),
}

fn validate_identifier(name: &str) -> Result<(), ValidationError> {
    let reject = |make: fn(String) -> ValidationError| Err(make(name.to_string()));

    let Some(first) = name.chars().next() else {
        return Err(ValidationError::Empty);
    };
    if name.len() > MAX_LENGTH {
        return Err(ValidationError::TooLong {
            name: name.to_string(),
            length: name.len(),
            max_length: MAX_LENGTH,
        });
    }
    if !(first.is_ascii_alphabetic() || first == '_') {
        return reject(ValidationError::InvalidStartCharacter);
    }
    if name.chars().any(|c| !(c.is_ascii_alphanumeric() || c == '_')) {
        return reject(ValidationError::InvalidCharacters);
    }
    if RESERVED_KEYWORDS
        .iter()
        .any(|keyword| keyword.eq_ignore_ascii_case(name))
    {
        return reject(ValidationError::ReservedKeyword);
    }
    Ok(())
}

macro_rules! identifier_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

identifier_newtype! {
    /// Table name checked for safe interpolation into SQL
    ValidatedTableName
}

identifier_newtype! {
    /// Column reference, either `column` or `table.column`
    ValidatedFieldName
}

impl ValidatedTableName {
    pub fn new(name: &str) -> Result<Self, ValidationError> {
        validate_identifier(name)?;
        Ok(Self(name.to_string()))
    }
}

impl ValidatedFieldName {
    pub fn new(name: &str) -> Result<Self, ValidationError> {
        if let Some((table, column)) = name.split_once('.') {
            validate_identifier(table)?;
            validate_identifier(column)?;
        } else {
            validate_identifier(name)?;
        }
        Ok(Self(name.to_string()))
    }

    /// Column part without any table qualifier
    pub fn column(&self) -> &str {
        unqualified(&self.0)
    }
}

/// Strip a `table.` qualifier from a column reference
pub fn unqualified(column: &str) -> &str {
    column.rsplit_once('.').map_or(column, |(_, name)| name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_table_names() {
        let long = "a".repeat(63);
        for name in ["posts", "_audit", "user_profiles2", long.as_str()] {
            assert!(ValidatedTableName::new(name).is_ok(), "rejected {name}");
        }
    }

    #[test]
    fn test_invalid_table_names() {
        let cases = [
            ("", ValidationError::Empty),
            (
                "123table",
                ValidationError::InvalidStartCharacter("123table".to_string()),
            ),
            (
                "user-name",
                ValidationError::InvalidCharacters("user-name".to_string()),
            ),
            (
                "posts; DROP TABLE posts",
                ValidationError::InvalidCharacters("posts; DROP TABLE posts".to_string()),
            ),
            (
                "select",
                ValidationError::ReservedKeyword("select".to_string()),
            ),
        ];

        for (name, expected) in cases {
            assert_eq!(ValidatedTableName::new(name), Err(expected));
        }
    }

    #[test]
    fn test_too_long_name() {
        let name = "a".repeat(64);
        assert!(matches!(
            ValidatedTableName::new(&name),
            Err(ValidationError::TooLong { length: 64, max_length: 63, .. })
        ));
    }

    #[test]
    fn test_qualified_field_names() {
        let field = ValidatedFieldName::new("posts.deleted_at").expect("qualified column");
        assert_eq!(field.as_str(), "posts.deleted_at");
        assert_eq!(field.column(), "deleted_at");

        assert!(ValidatedFieldName::new("posts.").is_err());
        assert!(ValidatedFieldName::new("a.b.c").is_err());
        assert!(ValidatedFieldName::new("posts.where").is_err());
    }

    #[test]
    fn test_unqualified() {
        assert_eq!(unqualified("posts.deleted"), "deleted");
        assert_eq!(unqualified("deleted"), "deleted");
    }
}
