//! 查询语法状态机
//!
//! 状态就是已添加子句的有序历史，合法性只取决于 (上一个子句 → 下一个子句) 的邻接表。
//! 状态机只能前进，不支持回滚；状态对象按值传递，`advance` 消费旧状态并返回新状态。

use crate::core::error::GrammarError;
use crate::query::builder::clause::{ClauseKind, ClauseList};

use ClauseKind::*;

/// MATCH 等读取子句之后可接的子句
const AFTER_READ: &[ClauseKind] = &[
    Match,
    OptionalMatch,
    Where,
    With,
    Return,
    Create,
    Merge,
    Delete,
    DetachDelete,
    Set,
    Remove,
    Call,
    Unwind,
];

const AFTER_WHERE: &[ClauseKind] = &[
    With,
    Return,
    Create,
    Merge,
    Delete,
    DetachDelete,
    Set,
    Remove,
    Call,
    Unwind,
];

const AFTER_RETURN: &[ClauseKind] = &[OrderBy, Skip, Limit, Union];

const AFTER_WITH: &[ClauseKind] = &[
    Match,
    OptionalMatch,
    Where,
    With,
    Return,
    Create,
    Merge,
    Delete,
    DetachDelete,
    Set,
    Remove,
    Call,
    Unwind,
    OrderBy,
];

/// CREATE / MERGE 之后不能直接删除
const AFTER_CREATE: &[ClauseKind] = &[
    Match,
    OptionalMatch,
    Where,
    With,
    Return,
    Create,
    Merge,
    Set,
    Remove,
    Call,
    Unwind,
];

const AFTER_DELETE: &[ClauseKind] = &[With, Return, Set, Remove, Call, Unwind];

const AFTER_SET: &[ClauseKind] = &[
    With,
    Return,
    Set,
    Remove,
    Delete,
    DetachDelete,
    Call,
    Unwind,
];

const AFTER_ORDER_BY: &[ClauseKind] = &[Skip, Limit];
const AFTER_SKIP: &[ClauseKind] = &[Limit];
const AFTER_LIMIT: &[ClauseKind] = &[];
const AFTER_UNION: &[ClauseKind] = &[Match, OptionalMatch];

/// 查询语法状态
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryGrammarState {
    clauses: Vec<ClauseKind>,
    segment: Vec<ClauseKind>,
    complete: bool,
}

impl QueryGrammarState {
    /// 查询可以开始的子句
    pub const VALID_START: &'static [ClauseKind] =
        &[Match, OptionalMatch, Create, Merge, Call, Unwind];

    /// 每个查询段中最多出现一次的子句
    pub const ONCE_PER_SEGMENT: &'static [ClauseKind] = &[Return];

    /// 开启新查询段的子句
    pub const SEGMENT_RESET: &'static [ClauseKind] = &[With, Union];

    pub fn new() -> Self {
        Self::default()
    }

    /// 邻接表：`prev` 之后合法的子句
    pub fn allowed_after(prev: ClauseKind) -> &'static [ClauseKind] {
        match prev {
            Match | OptionalMatch | Call | Unwind => AFTER_READ,
            Where => AFTER_WHERE,
            Return => AFTER_RETURN,
            With => AFTER_WITH,
            Create | Merge => AFTER_CREATE,
            Delete | DetachDelete => AFTER_DELETE,
            Set | Remove => AFTER_SET,
            OrderBy => AFTER_ORDER_BY,
            Skip => AFTER_SKIP,
            Limit => AFTER_LIMIT,
            Union => AFTER_UNION,
        }
    }

    /// 当前状态下合法的下一个子句
    pub fn allowed_next(&self) -> ClauseList {
        let candidates = match self.current_clause() {
            None => Self::VALID_START,
            Some(prev) => Self::allowed_after(prev),
        };
        ClauseList(
            candidates
                .iter()
                .copied()
                .filter(|kind| !self.violates_segment(*kind))
                .collect(),
        )
    }

    pub fn current_clause(&self) -> Option<ClauseKind> {
        self.clauses.last().copied()
    }

    /// 已添加的全部子句
    pub fn clauses(&self) -> &[ClauseKind] {
        &self.clauses
    }

    /// 最近一次分段之后的子句
    pub fn segment(&self) -> &[ClauseKind] {
        &self.segment
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// 检查能否添加子句，不修改状态
    pub fn check(&self, kind: ClauseKind) -> Result<(), GrammarError> {
        match self.current_clause() {
            None => {
                if !Self::VALID_START.contains(&kind) {
                    return Err(GrammarError::InvalidStart {
                        attempted: kind,
                        allowed: ClauseList::from(Self::VALID_START),
                    });
                }
            }
            Some(prev) => {
                let allowed = Self::allowed_after(prev);
                if !allowed.contains(&kind) {
                    return Err(GrammarError::InvalidTransition {
                        current: prev,
                        attempted: kind,
                        allowed: ClauseList::from(allowed),
                    });
                }
            }
        }

        if self.violates_segment(kind) {
            return Err(GrammarError::DuplicateInSegment { clause: kind });
        }
        Ok(())
    }

    /// 添加子句并返回推进后的状态
    pub fn advance(mut self, kind: ClauseKind) -> Result<Self, GrammarError> {
        self.check(kind)?;

        if Self::SEGMENT_RESET.contains(&kind) {
            self.segment.clear();
        } else {
            self.segment.push(kind);
        }
        self.clauses.push(kind);
        self.complete = self.compute_complete();
        Ok(self)
    }

    /// 校验查询已处于可终结状态
    pub fn validate_complete(&self) -> Result<(), GrammarError> {
        if self.complete {
            return Ok(());
        }
        Err(GrammarError::Incomplete {
            last: self
                .current_clause()
                .map(|kind| kind.keyword().to_string())
                .unwrap_or_else(|| "无".to_string()),
        })
    }

    fn violates_segment(&self, kind: ClauseKind) -> bool {
        Self::ONCE_PER_SEGMENT.contains(&kind) && self.segment.contains(&kind)
    }

    fn compute_complete(&self) -> bool {
        match self.current_clause() {
            Some(Return) => true,
            Some(kind) if kind.is_result_modifier() => self.segment.contains(&Return),
            Some(kind) => kind.is_write(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(kinds: &[ClauseKind]) -> Result<QueryGrammarState, GrammarError> {
        kinds
            .iter()
            .try_fold(QueryGrammarState::new(), |state, kind| state.advance(*kind))
    }

    #[test]
    fn test_valid_start_clauses() {
        for kind in ClauseKind::ALL {
            let result = QueryGrammarState::new().advance(kind);
            if QueryGrammarState::VALID_START.contains(&kind) {
                assert!(result.is_ok(), "{} 应该可以作为起始子句", kind);
            } else {
                assert!(
                    matches!(result, Err(GrammarError::InvalidStart { .. })),
                    "{} 不应该作为起始子句",
                    kind
                );
            }
        }
    }

    #[test]
    fn test_transition_table_is_exhaustive() {
        // 对每个 (prev, next) 组合，合法性必须与邻接表一致
        for prev in ClauseKind::ALL {
            let prefix: Vec<ClauseKind> = match prev {
                Match | OptionalMatch | Create | Merge | Call | Unwind => vec![prev],
                Union => vec![Match, Return, Union],
                Return => vec![Match, Return],
                OrderBy | Skip | Limit => vec![Match, Return, prev],
                _ => vec![Match, prev],
            };
            let state = run(&prefix).expect("前缀应该合法");
            for next in ClauseKind::ALL {
                let allowed = QueryGrammarState::allowed_after(prev).contains(&next);
                let result = state.clone().advance(next);
                if allowed && !(next == Return && state.segment().contains(&Return)) {
                    assert!(result.is_ok(), "{} -> {} 应该合法", prev, next);
                } else if !allowed {
                    assert!(
                        matches!(result, Err(GrammarError::InvalidTransition { .. })),
                        "{} -> {} 应该非法",
                        prev,
                        next
                    );
                }
            }
        }
    }

    #[test]
    fn test_return_once_per_segment() {
        let state = run(&[Match, Return]).expect("MATCH RETURN 应该合法");
        assert!(state.check(Return).is_err());

        let state = run(&[Match, With, Return]).expect("应该合法");
        assert_eq!(state.segment(), &[Return]);
    }

    #[test]
    fn test_with_resets_segment() {
        // RETURN 之后不能直接 WITH，分段重置只能通过合法路径验证
        let state = run(&[Match, Where, With, Match, Return]).expect("应该合法");
        assert!(state.is_complete());
        assert_eq!(state.segment(), &[Match, Return]);
    }

    #[test]
    fn test_union_starts_new_segment() {
        let state = run(&[Match, Return, Union, Match, Return]).expect("UNION 之后可以再次 RETURN");
        assert!(state.is_complete());
    }

    #[test]
    fn test_completeness() {
        assert!(!run(&[Match]).expect("合法").is_complete());
        assert!(run(&[Match, Return]).expect("合法").is_complete());
        assert!(run(&[Match, Return, OrderBy, Skip, Limit]).expect("合法").is_complete());
        assert!(run(&[Create]).expect("合法").is_complete());
        assert!(run(&[Match, DetachDelete]).expect("合法").is_complete());
        assert!(!run(&[Match, With, OrderBy]).expect("合法").is_complete());
        assert!(!run(&[Match, Where]).expect("合法").is_complete());
    }

    #[test]
    fn test_validate_complete_names_last_clause() {
        let state = run(&[Match]).expect("合法");
        let err = state.validate_complete().expect_err("MATCH 之后不完整");
        assert!(err.is_incomplete());
        assert!(err.to_string().contains("MATCH"));

        let empty = QueryGrammarState::new();
        assert!(empty.validate_complete().is_err());
    }

    #[test]
    fn test_nothing_after_limit() {
        let state = run(&[Match, Return, Limit]).expect("合法");
        assert!(state.allowed_next().0.is_empty());
        for kind in ClauseKind::ALL {
            assert!(state.check(kind).is_err());
        }
    }

    #[test]
    fn test_allowed_next_excludes_duplicate_return() {
        let state = run(&[Match, Return]).expect("合法");
        assert!(!state.allowed_next().contains(Return));
        let state = run(&[Match]).expect("合法");
        assert!(state.allowed_next().contains(Return));
    }
}
