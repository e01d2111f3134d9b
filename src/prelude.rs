//! Convenience re-exports for common SoftHaus usage
//!
//! ```rust
//! use softhaus::prelude::*;
//!
//! let options = TreeOptions::default().root_id(1);
//! assert!(list_to_tree(Vec::new(), &options).is_empty());
//! ```

// Core SoftHaus components
pub use crate::core::SoftHaus;
pub use crate::errors::SoftHausError;

// Re-export centralized config
pub use config::{AppConfig, DatabaseConfig, SignalConfig};

// Records, stores, queries and storage backends
pub use store_object::prelude::*;

// Lifecycle events
pub use signal_system::prelude::*;

// Tree conversion
pub use tree_convert::{
    build_tree, list_to_tree, list_to_tree_value, object_to_array, ConvertError, TreeItem,
    TreeNode, TreeOptions,
};

// Common external dependencies
pub use sqlx;
pub use tokio;
