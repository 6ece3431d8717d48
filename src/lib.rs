//! cypher-builder - 类型检查的流式 Cypher 查询构建器
//!
//! 提供子句顺序校验、自动参数化的过滤条件编译，以及可组合的查询规格，
//! 产出 (查询文本, 参数表) 交给外部执行器。
//!
//! ```
//! use cypher_builder::query::{node, QueryBuilder};
//!
//! let query = QueryBuilder::new()
//!     .match_(node("Person", "n"))
//!     .and_then(|b| b.where_param("n.age > {}", 30))
//!     .and_then(|b| b.return_("n"))
//!     .and_then(QueryBuilder::build)
//!     .unwrap();
//! assert_eq!(query.text, "MATCH (n:Person) WHERE n.age > $p0 RETURN n");
//! ```

pub mod config;
pub mod core;
pub mod query;
pub mod utils;

pub use crate::core::error::{BuilderError, BuilderResult};
pub use crate::core::value::Value;
pub use crate::query::{BuiltQuery, QueryBuilder};
