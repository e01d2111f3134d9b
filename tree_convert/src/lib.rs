//! Tree conversion utilities
//!
//! Reshapes flat parent-pointer lists into nested trees and normalizes
//! arbitrary serializable values into plain JSON maps and arrays.
//!
//! ```
//! use serde_json::json;
//! use tree_convert::{list_to_tree_value, TreeOptions};
//!
//! let flat = json!([
//!     {"id": 1, "parent_id": 0},
//!     {"id": 2, "parent_id": 1},
//!     {"id": 3, "parent_id": 99},
//! ]);
//!
//! let tree = list_to_tree_value(flat, &TreeOptions::default()).unwrap();
//! assert_eq!(
//!     tree,
//!     json!([{"id": 1, "parent_id": 0, "children": [{"id": 2, "parent_id": 1}]}])
//! );
//! ```

// Drop counts are reported only with the `debug-logging` feature
#[cfg(feature = "debug-logging")]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

pub mod errors;
pub mod list;
pub mod object;
pub mod typed;

pub use errors::ConvertError;
pub use list::{list_to_tree, list_to_tree_value, TreeOptions};
pub use object::object_to_array;
pub use typed::{build_tree, TreeItem, TreeNode};

/// A record as a JSON object
pub type Row = serde_json::Map<String, serde_json::Value>;
