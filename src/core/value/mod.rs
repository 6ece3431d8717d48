//! Value 模块 - 查询参数值类型
//!
//! - 核心类型定义 (`types.rs`)
//! - 比较逻辑 (`comparison.rs`)，供规约在内存中求值使用
//! - 类型转换 (`conversion.rs`)

pub mod comparison;
pub mod conversion;
pub mod types;

pub use types::*;
