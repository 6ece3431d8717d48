//! 过滤条件错误类型

use thiserror::Error;

/// 过滤字典或条件模板错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("未知的过滤操作符 '{operator}' (字段 '{field}')")]
    UnknownOperator { field: String, operator: String },

    #[error("无效的逻辑分组 '{key}': {reason}")]
    InvalidGroup { key: String, reason: String },

    #[error("无效的过滤键 '{0}'")]
    InvalidKey(String),

    #[error("过滤条件必须是对象, 实际为 {0}")]
    NotAnObject(String),

    #[error("条件模板占位符数量不匹配: 模板中有 {expected} 个 '{{}}', 提供了 {actual} 个值")]
    PlaceholderMismatch { expected: usize, actual: usize },
}
