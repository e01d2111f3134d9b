//! Soft deletion opt-in
//!
//! Record types implementing [`SoftDeletable`] are never removed by a plain
//! delete; the row is flagged instead and hidden from default queries.

use super::table_metadata::TableMetadata;
use crate::model_query::ModelQuery;
use crate::scope::SoftDeletingScope;

/// Record type whose rows are flagged rather than removed on delete
///
/// Column names are configured through the associated constants:
///
/// ```
/// use store_object::{SoftDeletable, TableMetadata};
///
/// pub struct Invoice;
///
/// impl TableMetadata for Invoice {
///     fn table_name() -> &'static str {
///         "invoices"
///     }
/// }
///
/// impl SoftDeletable for Invoice {
///     const DELETED: &'static str = "is_void";
///     const DELETED_AT: &'static str = "voided_at";
/// }
///
/// assert_eq!(Invoice::deleted_column(), "is_void");
/// assert_eq!(Invoice::qualified_deleted_at_column(), "invoices.voided_at");
/// ```
pub trait SoftDeletable: TableMetadata + Sized {
    /// Boolean flag column
    const DELETED: &'static str = "deleted";

    /// Nullable deletion timestamp column
    const DELETED_AT: &'static str = "deleted_at";

    fn deleted_column() -> &'static str {
        Self::DELETED
    }

    fn deleted_at_column() -> &'static str {
        Self::DELETED_AT
    }

    fn qualified_deleted_column() -> String {
        Self::qualify_column(Self::deleted_column())
    }

    fn qualified_deleted_at_column() -> String {
        Self::qualify_column(Self::deleted_at_column())
    }

    /// Columns the soft-delete behavior writes timestamps to
    fn timestamp_columns() -> Vec<&'static str> {
        let mut columns = vec![Self::deleted_at_column()];
        if Self::uses_timestamps() {
            columns.extend(Self::created_at_field());
            columns.extend(Self::updated_at_field());
        }
        columns
    }

    /// New query with the soft-deleting scope booted: trashed rows are
    /// filtered out and bulk deletes flag rows instead of removing them
    fn query() -> ModelQuery<Self> {
        SoftDeletingScope::boot(ModelQuery::new())
    }
}
