//! 统一错误处理
//!
//! 1. **分类**：语法错误 (`GrammarError`) 与过滤错误 (`FilterError`) 使用结构化枚举，
//!    参数校验等简单错误使用字符串
//! 2. **转换**：子错误通过 `#[from]` 自动转换为 `BuilderError`
//! 3. **统一接口**：`BuilderResult<T>` 作为所有构建操作的返回类型
//!
//! 构建错误对当前查询是致命的：出错后构建器实例被消费，调用方必须重新开始。

pub mod codes;
pub mod filter;
pub mod grammar;

pub use codes::{ErrorCategory, ErrorCode, PublicError, ToPublicError};
pub use filter::FilterError;
pub use grammar::GrammarError;

use thiserror::Error;

/// 查询构建错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuilderError {
    #[error("语法错误: {0}")]
    Grammar(#[from] GrammarError),

    #[error("过滤条件错误: {0}")]
    Filter(#[from] FilterError),

    #[error("验证错误: {0}")]
    Validation(String),

    /// 输入的 JSON 文本无法解析
    #[error("JSON 解析错误: {0}")]
    Serialization(String),
}

/// 统一的结果类型
pub type BuilderResult<T> = Result<T, BuilderError>;

impl BuilderError {
    pub fn validation(message: impl Into<String>) -> Self {
        BuilderError::Validation(message.into())
    }
}

impl From<serde_json::Error> for BuilderError {
    fn from(err: serde_json::Error) -> Self {
        BuilderError::Serialization(err.to_string())
    }
}

impl ToPublicError for BuilderError {
    fn to_error_code(&self) -> ErrorCode {
        match self {
            BuilderError::Grammar(GrammarError::Incomplete { .. }) => {
                ErrorCode::IncompleteStatement
            }
            BuilderError::Grammar(_) => ErrorCode::InvalidStatement,
            BuilderError::Filter(_) => ErrorCode::InvalidInput,
            BuilderError::Validation(_) => ErrorCode::ValidationError,
            BuilderError::Serialization(_) => ErrorCode::InvalidInput,
        }
    }

    fn to_public_message(&self) -> String {
        self.to_string()
    }
}
