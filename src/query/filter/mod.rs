//! 过滤条件
//!
//! - `ast`：类型化过滤树
//! - `dict`：字典式过滤条件及其降级
//! - `compiler`：参数化条件渲染

pub mod ast;
pub mod compiler;
pub mod dict;

pub use ast::{CompareOp, Filter, TextOp};
pub use compiler::{compile, render_filter, CompiledFilter, FilterCompiler};
pub use dict::{FilterDict, FilterEntry, UnknownOperatorPolicy};
