//! 查询构建：流式构建器、过滤条件与规格代数

pub mod builder;
pub mod entity;
pub mod filter;
pub mod specification;

pub use builder::{node, relationship, BuiltQuery, QueryBuilder};
pub use entity::Entity;
pub use filter::{Filter, FilterCompiler, FilterDict};
pub use specification::Specification;
