//! 集成测试共享工具模块
//!
//! 提供测试夹具和辅助函数，供所有集成测试使用

#![allow(dead_code)]

pub mod assertions;

use std::collections::BTreeMap;

use cypher_builder::core::value::Value;
use cypher_builder::query::builder::{ClauseKind, QueryGrammarState};

/// 以属性列表构造内存实体
pub fn entity(properties: &[(&str, Value)]) -> BTreeMap<String, Value> {
    properties
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

/// 一条典型的记忆节点
pub fn memory(salience: f64, topic_id: i64, access_count: i64) -> BTreeMap<String, Value> {
    entity(&[
        ("content", Value::from("今天讨论了查询构建器")),
        ("salience", Value::Float(salience)),
        ("topic_id", Value::Int(topic_id)),
        ("access_count", Value::Int(access_count)),
        ("role", Value::from("user")),
    ])
}

/// 依次推进状态机，任何一步失败都会 panic
pub fn reach(kinds: &[ClauseKind]) -> QueryGrammarState {
    kinds.iter().fold(QueryGrammarState::new(), |state, kind| {
        state
            .advance(*kind)
            .unwrap_or_else(|e| panic!("无法到达 {:?}: {}", kinds, e))
    })
}

/// 以 `kind` 结尾的一条合法子句序列
pub fn path_to(kind: ClauseKind) -> Vec<ClauseKind> {
    use ClauseKind::*;
    match kind {
        Match | OptionalMatch | Create | Merge | Call | Unwind => vec![kind],
        Where | Return | With | Delete | DetachDelete | Set | Remove => vec![Match, kind],
        OrderBy | Skip | Limit | Union => vec![Match, Return, kind],
    }
}
