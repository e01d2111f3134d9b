//! Table metadata
//!
//! Static description of a persisted record type.

/// Metadata about a record type's table
///
/// Only `table_name` is required; the remaining items default to the usual
/// conventions (`id` primary key, `created_at` / `updated_at` timestamps).
///
/// ```
/// use store_object::TableMetadata;
///
/// pub struct Customer;
///
/// impl TableMetadata for Customer {
///     fn table_name() -> &'static str {
///         "customers"
///     }
///
///     fn uses_timestamps() -> bool {
///         false
///     }
/// }
///
/// assert_eq!(Customer::qualify_column("email"), "customers.email");
/// ```
pub trait TableMetadata: Send + Sync + 'static {
    /// The table name in the database
    fn table_name() -> &'static str;

    /// Get the primary key field name
    fn primary_key_field() -> &'static str {
        "id"
    }

    /// Whether the record type maintains created/updated timestamps
    fn uses_timestamps() -> bool {
        true
    }

    /// Column receiving the creation time on insert
    fn created_at_field() -> Option<&'static str> {
        Some("created_at")
    }

    /// Column refreshed on every update
    fn updated_at_field() -> Option<&'static str> {
        Some("updated_at")
    }

    /// Prefix a column with the table name unless it is already qualified
    fn qualify_column(column: &str) -> String {
        if column.contains('.') {
            column.to_string()
        } else {
            format!("{}.{}", Self::table_name(), column)
        }
    }
}
