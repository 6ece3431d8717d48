//! Cypher 查询构建器
//!
//! - `clause` / `state`：子句种类与语法状态机
//! - `parameters` / `fragment`：参数表与原始片段
//! - `pattern`：节点、关系与路径模式
//! - `facade`：流式构建器，以及 `helpers`、`vector` 中的扩展方法
//! - `executor`：执行器边界

pub mod clause;
pub mod executor;
pub mod facade;
pub mod fragment;
pub mod helpers;
pub mod parameters;
pub mod pattern;
pub mod state;
pub mod vector;

pub use clause::{ClauseKind, ClauseList};
pub use executor::QueryExecutor;
pub use facade::{BuiltQuery, IntoItems, QueryBuilder};
pub use fragment::Fragment;
pub use parameters::{ParamRef, ParameterTable, DEFAULT_PARAMETER_PREFIX};
pub use pattern::{node, relationship, Direction, NodePattern, Pattern, PatternBuilder, PropertyValue, RelationshipPattern};
pub use state::QueryGrammarState;
pub use vector::{HybridSearch, VectorSearch};
