//! Soft-delete record store
//!
//! [`SoftDeleteStore`] runs single-record deletes and restores for a
//! [`SoftDeletable`](crate::traits::SoftDeletable) model and fires the
//! lifecycle events (`trashed`, `restoring`, `restored`, `forceDeleted`).
//!
//! A soft delete is one update scoped to the record's primary key, setting
//! the deleted flag, the deletion timestamp and `updated_at` together.

mod core;
mod operations;


pub use self::core::{DeleteOptions, SoftDeleteStore};
