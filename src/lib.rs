//! # SoftHaus
//!
//! Soft deletion for PostgreSQL-backed records. Deleting a soft-deletable
//! record flags its row instead of removing it; default queries hide flagged
//! rows, trashed records can be restored, and lifecycle listeners observe
//! every transition. A small converter turns flat parent/child rows into
//! nested trees.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use softhaus::prelude::*;
//! use serde_json::json;
//!
//! pub struct Post;
//!
//! impl TableMetadata for Post {
//!     fn table_name() -> &'static str {
//!         "posts"
//!     }
//! }
//!
//! impl SoftDeletable for Post {}
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::new(
//!         "localhost".to_string(), 5432, "softhaus".to_string(),
//!         "postgres".to_string(), "password".to_string(),
//!         1, 5, 30, 600, 3600,
//!     );
//!
//!     let mut haus = SoftHaus::new(config).await?;
//!     let posts = haus.register::<Post>()?;
//!     posts.soft_deleted(|post| println!("trashed post {:?}", post.key()))?;
//!
//!     let mut post = posts.create(Row::from_iter([
//!         ("title".to_string(), json!("Hello")),
//!     ])).await?;
//!
//!     posts.delete(&mut post, DeleteOptions::soft()).await?;
//!     assert!(post.trashed());
//!
//!     posts.restore(&mut post).await?;
//!     Ok(())
//! }
//! ```

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod core;
pub mod errors;
pub mod prelude;

// Re-export the main public types for convenience
pub use core::SoftHaus;
pub use errors::SoftHausError;

// Re-export centralized config
pub use config::{AppConfig, DatabaseConfig, SignalConfig};

// Re-export member crates
pub use signal_system;
pub use store_object;
pub use tree_convert;

// Re-export external dependencies used in public API
pub use async_trait;
pub use sqlx;
