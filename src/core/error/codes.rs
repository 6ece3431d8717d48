//! 对外错误码定义
//!
//! 查询构建器本身不对外提供服务，但调用它的 API 层需要把构建失败映射为稳定的错误码。
//!
//! 错误码格式: XXYY
//! - XX: 错误类别 (00=成功, 01=语法, 03=验证, 09=系统)
//! - YY: 具体错误

use serde::{Deserialize, Serialize};

/// 对外错误码 - 用于客户端响应
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    Success = 0,

    // ==================== 语法错误 (01xx) ====================
    /// 通用语法错误
    SyntaxError = 100,
    /// 子句顺序非法
    InvalidStatement = 102,
    /// 查询不完整
    IncompleteStatement = 104,

    // ==================== 验证错误 (03xx) ====================
    /// 通用验证错误
    ValidationError = 300,
    /// 无效输入（过滤条件等）
    InvalidInput = 302,

    // ==================== 系统错误 (09xx) ====================
    /// 内部错误
    InternalError = 900,
    /// 未知错误
    Unknown = 999,
}

impl ErrorCode {
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    pub fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(ErrorCode::Success),
            100 => Some(ErrorCode::SyntaxError),
            102 => Some(ErrorCode::InvalidStatement),
            104 => Some(ErrorCode::IncompleteStatement),
            300 => Some(ErrorCode::ValidationError),
            302 => Some(ErrorCode::InvalidInput),
            900 => Some(ErrorCode::InternalError),
            999 => Some(ErrorCode::Unknown),
            _ => None,
        }
    }

    /// 获取错误类别
    pub fn category(&self) -> ErrorCategory {
        match self.as_i32() {
            0 => ErrorCategory::Success,
            100..=199 => ErrorCategory::Syntax,
            300..=399 => ErrorCategory::Validation,
            900..=999 => ErrorCategory::System,
            _ => ErrorCategory::Unknown,
        }
    }

    /// 获取默认的错误消息
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::Success => "成功",
            ErrorCode::SyntaxError => "语法错误",
            ErrorCode::InvalidStatement => "无效语句",
            ErrorCode::IncompleteStatement => "查询不完整",
            ErrorCode::ValidationError => "验证错误",
            ErrorCode::InvalidInput => "无效输入",
            ErrorCode::InternalError => "内部错误",
            ErrorCode::Unknown => "未知错误",
        }
    }

    /// 构建失败都发生在本地，没有可重试的错误
    pub fn is_client_error(&self) -> bool {
        (100..=499).contains(&self.as_i32())
    }
}

impl Default for ErrorCode {
    fn default() -> Self {
        ErrorCode::Success
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.as_i32(), self.default_message())
    }
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Success,
    Syntax,
    Validation,
    System,
    Unknown,
}

impl ErrorCategory {
    /// 获取类别的 HTTP 状态码映射
    pub fn to_http_status(&self) -> u16 {
        match self {
            ErrorCategory::Success => 200,
            ErrorCategory::Syntax => 400,
            ErrorCategory::Validation => 422,
            ErrorCategory::System => 500,
            ErrorCategory::Unknown => 500,
        }
    }
}

/// 对外错误信息 - 用于序列化到响应中
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicError {
    pub code: ErrorCode,
    pub message: String,
}

impl PublicError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn with_default_message(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.default_message().to_string(),
        }
    }
}

/// 内部错误到对外错误的转换 trait
pub trait ToPublicError {
    fn to_public_error(&self) -> PublicError {
        PublicError::new(self.to_error_code(), self.to_public_message())
    }

    fn to_error_code(&self) -> ErrorCode;

    /// 获取对外错误消息（过滤敏感信息）
    fn to_public_message(&self) -> String;
}
