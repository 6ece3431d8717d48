//! 查询语法错误类型
//!
//! 子句添加顺序非法或查询未完成时产生，在出错的调用处立即返回

use thiserror::Error;

use crate::query::builder::clause::{ClauseKind, ClauseList};

/// 查询语法错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GrammarError {
    #[error("查询必须以 {allowed} 之一开始, 实际为 {attempted}")]
    InvalidStart {
        attempted: ClauseKind,
        allowed: ClauseList,
    },

    #[error("不能在 {current} 之后添加 {attempted}, 合法的后续子句: {allowed}")]
    InvalidTransition {
        current: ClauseKind,
        attempted: ClauseKind,
        allowed: ClauseList,
    },

    #[error("{clause} 在同一查询段中只能出现一次")]
    DuplicateInSegment { clause: ClauseKind },

    #[error("查询不完整: 必须以 RETURN 或写操作 (CREATE, MERGE, DELETE, SET 等) 结尾, 当前最后子句: {last}")]
    Incomplete { last: String },
}

impl GrammarError {
    /// 触发错误的子句
    pub fn attempted(&self) -> Option<ClauseKind> {
        match self {
            GrammarError::InvalidStart { attempted, .. }
            | GrammarError::InvalidTransition { attempted, .. } => Some(*attempted),
            GrammarError::DuplicateInSegment { clause } => Some(*clause),
            GrammarError::Incomplete { .. } => None,
        }
    }

    pub fn is_incomplete(&self) -> bool {
        matches!(self, GrammarError::Incomplete { .. })
    }
}
