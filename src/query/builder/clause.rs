//! 子句类型定义
//!
//! `ClauseKind` 只作为语法状态机的符号使用，本身不携带任何子句内容。

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cypher 子句类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClauseKind {
    // 读取
    Match,
    OptionalMatch,
    Where,
    Return,
    With,

    // 写入
    Create,
    Merge,
    Delete,
    DetachDelete,
    Set,
    Remove,

    // 分页与排序
    Skip,
    Limit,
    OrderBy,

    // 其他
    Call,
    Union,
    Unwind,
}

impl ClauseKind {
    /// 全部子句类型，按声明顺序
    pub const ALL: [ClauseKind; 17] = [
        ClauseKind::Match,
        ClauseKind::OptionalMatch,
        ClauseKind::Where,
        ClauseKind::Return,
        ClauseKind::With,
        ClauseKind::Create,
        ClauseKind::Merge,
        ClauseKind::Delete,
        ClauseKind::DetachDelete,
        ClauseKind::Set,
        ClauseKind::Remove,
        ClauseKind::Skip,
        ClauseKind::Limit,
        ClauseKind::OrderBy,
        ClauseKind::Call,
        ClauseKind::Union,
        ClauseKind::Unwind,
    ];

    /// 子句在查询文本中的关键字
    pub fn keyword(&self) -> &'static str {
        match self {
            ClauseKind::Match => "MATCH",
            ClauseKind::OptionalMatch => "OPTIONAL MATCH",
            ClauseKind::Where => "WHERE",
            ClauseKind::Return => "RETURN",
            ClauseKind::With => "WITH",
            ClauseKind::Create => "CREATE",
            ClauseKind::Merge => "MERGE",
            ClauseKind::Delete => "DELETE",
            ClauseKind::DetachDelete => "DETACH DELETE",
            ClauseKind::Set => "SET",
            ClauseKind::Remove => "REMOVE",
            ClauseKind::Skip => "SKIP",
            ClauseKind::Limit => "LIMIT",
            ClauseKind::OrderBy => "ORDER BY",
            ClauseKind::Call => "CALL",
            ClauseKind::Union => "UNION",
            ClauseKind::Unwind => "UNWIND",
        }
    }

    /// 是否为写操作子句
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            ClauseKind::Create
                | ClauseKind::Merge
                | ClauseKind::Delete
                | ClauseKind::DetachDelete
                | ClauseKind::Set
                | ClauseKind::Remove
        )
    }

    /// 是否为 RETURN 之后的结果修饰子句
    pub fn is_result_modifier(&self) -> bool {
        matches!(self, ClauseKind::OrderBy | ClauseKind::Skip | ClauseKind::Limit)
    }

    /// 按名称解析子句类型，接受 `order_by`、`ORDER BY`、`detach-delete` 等写法
    pub fn parse(name: &str) -> Option<ClauseKind> {
        let normalized: String = name
            .trim()
            .chars()
            .map(|c| if c == ' ' || c == '-' { '_' } else { c.to_ascii_lowercase() })
            .collect();
        ClauseKind::ALL.into_iter().find(|kind| {
            let keyword: String = kind
                .keyword()
                .chars()
                .map(|c| if c == ' ' { '_' } else { c.to_ascii_lowercase() })
                .collect();
            keyword == normalized
        })
    }
}

impl fmt::Display for ClauseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

/// 子句列表，用于错误消息中列出合法的候选子句
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClauseList(pub Vec<ClauseKind>);

impl ClauseList {
    pub fn contains(&self, kind: ClauseKind) -> bool {
        self.0.contains(&kind)
    }
}

impl From<&[ClauseKind]> for ClauseList {
    fn from(kinds: &[ClauseKind]) -> Self {
        ClauseList(kinds.to_vec())
    }
}

impl fmt::Display for ClauseList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "无");
        }
        let names: Vec<&str> = self.0.iter().map(ClauseKind::keyword).collect();
        write!(f, "{}", names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords() {
        assert_eq!(ClauseKind::OptionalMatch.to_string(), "OPTIONAL MATCH");
        assert_eq!(ClauseKind::DetachDelete.keyword(), "DETACH DELETE");
    }

    #[test]
    fn test_parse_accepts_several_spellings() {
        assert_eq!(ClauseKind::parse("order_by"), Some(ClauseKind::OrderBy));
        assert_eq!(ClauseKind::parse("ORDER BY"), Some(ClauseKind::OrderBy));
        assert_eq!(ClauseKind::parse("detach-delete"), Some(ClauseKind::DetachDelete));
        assert_eq!(ClauseKind::parse("match"), Some(ClauseKind::Match));
        assert_eq!(ClauseKind::parse("select"), None);
    }

    #[test]
    fn test_clause_list_display() {
        let list = ClauseList(vec![ClauseKind::Skip, ClauseKind::Limit]);
        assert_eq!(list.to_string(), "SKIP, LIMIT");
        assert_eq!(ClauseList::default().to_string(), "无");
    }
}
