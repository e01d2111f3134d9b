//! Traits describing persisted record types
//!
//! `TableMetadata` names the table and its bookkeeping columns, and
//! `SoftDeletable` opts a record type into soft deletion.

pub mod soft_deletable;
pub mod table_metadata;

pub use soft_deletable::SoftDeletable;
pub use table_metadata::TableMetadata;
