//! Query builder utilities
//!
//! Backend-neutral description of a query over one table: filters, joins,
//! ordering and paging, plus the SQL generator used by the PostgreSQL backend.

pub mod builder;
pub mod cast;
pub mod filter;
pub mod join;
pub mod sql_generation;
pub mod update;


pub use builder::{QueryBuilder, SortOrder};
pub use cast::SqlCast;
pub use filter::{LogicalOperator, QueryCondition, QueryFilter, QueryOperator};
pub use join::{JoinClause, JoinCondition, JoinType};
pub use sql_generation::SqlGenerator;
pub use update::UpdateSet;
