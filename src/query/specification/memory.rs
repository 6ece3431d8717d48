//! 记忆领域的规格构造函数
//!
//! 字段名与记忆节点的属性保持一致：`salience`、`topic_id`、`conversation_id`、
//! `timestamp`、`emotional_intensity`、`emotional_valence`、`access_count`、
//! `role`、`concepts`、`last_accessed`、`ontology_path`。
//! 时间属性按 RFC 3339 字符串存储，查询中通过 `datetime()` 比较。

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::error::{BuilderError, BuilderResult};
use crate::core::value::Value;
use crate::query::builder::helpers::MEMORY_LABEL;
use crate::query::entity::Entity;
use crate::query::filter::Filter;
use crate::query::specification::predicate::CustomCondition;
use crate::query::specification::Specification;

/// 记忆的创建者角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryRole {
    User,
    Assistant,
    System,
}

impl MemoryRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryRole::User => "user",
            MemoryRole::Assistant => "assistant",
            MemoryRole::System => "system",
        }
    }
}

/// 记忆之间的关系类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationType {
    Follows,
    Precedes,
    Elaborates,
    Contradicts,
    References,
    Summarizes,
    ResonatesWith,
    ContrastsWith,
    BelongsTo,
    Contains,
    RemindsOf,
    LearnedFrom,
    Protects,
    CoCreates,
}

impl RelationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::Follows => "FOLLOWS",
            RelationType::Precedes => "PRECEDES",
            RelationType::Elaborates => "ELABORATES",
            RelationType::Contradicts => "CONTRADICTS",
            RelationType::References => "REFERENCES",
            RelationType::Summarizes => "SUMMARIZES",
            RelationType::ResonatesWith => "RESONATES_WITH",
            RelationType::ContrastsWith => "CONTRASTS_WITH",
            RelationType::BelongsTo => "BELONGS_TO",
            RelationType::Contains => "CONTAINS",
            RelationType::RemindsOf => "REMINDS_OF",
            RelationType::LearnedFrom => "LEARNED_FROM",
            RelationType::Protects => "PROTECTS",
            RelationType::CoCreates => "CO_CREATES",
        }
    }
}

fn timestamp_of(entity: &dyn Entity, field: &str) -> Option<DateTime<Utc>> {
    let raw = entity.property(field)?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn custom(condition: Result<CustomCondition, crate::core::error::FilterError>) -> Specification {
    // 模板由本模块给出，占位符数量固定
    match condition {
        Ok(condition) => Specification::custom(condition),
        Err(e) => {
            log::error!("内置条件模板错误: {}", e);
            Specification::AlwaysFalse
        }
    }
}

/// 显著度不低于阈值
pub fn salient(min_salience: f64) -> Specification {
    Filter::gte("salience", min_salience).into()
}

/// 属于给定主题之一，空列表不匹配任何记忆
pub fn topics(topic_ids: &[i64]) -> Specification {
    if topic_ids.is_empty() {
        return Specification::AlwaysFalse;
    }
    Filter::is_in("topic_id", topic_ids.to_vec()).into()
}

/// 来自指定会话
pub fn conversation(conversation_id: Uuid) -> Specification {
    Filter::eq("conversation_id", conversation_id).into()
}

/// 时间戳不早于 `cutoff`
pub fn recent_since(cutoff: DateTime<Utc>) -> Specification {
    let cutoff_value = Value::from(cutoff);
    custom(
        CustomCondition::new("recent", "{alias}.timestamp >= datetime({})", vec![cutoff_value])
            .map(|condition| {
                condition.with_evaluator(move |entity| {
                    timestamp_of(entity, "timestamp").is_some_and(|ts| ts >= cutoff)
                })
            }),
    )
}

/// 最近 `days` 天 `hours` 小时内的记忆
pub fn recent(days: i64, hours: i64) -> Specification {
    recent_since(Utc::now() - Duration::days(days) - Duration::hours(hours))
}

/// 情绪强度不低于阈值且效价在区间内
pub fn emotional(min_intensity: f64, valence_min: f64, valence_max: f64) -> Specification {
    Filter::and(vec![
        Filter::gte("emotional_intensity", min_intensity),
        Filter::gte("emotional_valence", valence_min),
        Filter::lte("emotional_valence", valence_max),
    ])
    .into()
}

pub fn frequently_accessed(min_access_count: i64) -> Specification {
    Filter::gte("access_count", min_access_count).into()
}

pub fn role(role: MemoryRole) -> Specification {
    Filter::eq("role", role.as_str()).into()
}

/// 概念列表与给定概念有交集，空列表不匹配任何记忆
pub fn concepts<S: AsRef<str>>(concepts: &[S]) -> Specification {
    if concepts.is_empty() {
        return Specification::AlwaysFalse;
    }
    let values: Vec<Value> = concepts.iter().map(|c| Value::from(c.as_ref())).collect();
    Filter::overlap("concepts", values).into()
}

/// 自 `cutoff` 起未被访问且显著度不高于 `max_salience`
pub fn decaying_since(cutoff: DateTime<Utc>, max_salience: f64) -> Specification {
    let stale = custom(
        CustomCondition::new(
            "stale",
            "({alias}.last_accessed IS NULL OR {alias}.last_accessed < datetime({}))",
            vec![Value::from(cutoff)],
        )
        .map(|condition| {
            condition.with_evaluator(move |entity| {
                match entity.property("last_accessed") {
                    None | Some(Value::Null) => true,
                    Some(_) => timestamp_of(entity, "last_accessed").is_some_and(|ts| ts < cutoff),
                }
            })
        }),
    );
    stale.and_(&Filter::lte("salience", max_salience).into())
}

pub fn decaying(days_since_access: i64, max_salience: f64) -> Specification {
    decaying_since(Utc::now() - Duration::days(days_since_access), max_salience)
}

/// 本体路径以给定前缀开头
pub fn ontology_path<S: AsRef<str>>(prefix: &[S]) -> Specification {
    let prefix: Vec<String> = prefix.iter().map(|s| s.as_ref().to_string()).collect();
    if prefix.is_empty() {
        return Specification::AlwaysTrue;
    }
    let template = format!("{{alias}}.ontology_path[0..{}] = {{}}", prefix.len());
    let expected = Value::from(prefix.clone());
    custom(
        CustomCondition::new("ontology_path", template, vec![expected]).map(|condition| {
            condition.with_evaluator(move |entity| {
                entity
                    .property("ontology_path")
                    .and_then(Value::as_list)
                    .is_some_and(|path| {
                        path.len() >= prefix.len()
                            && path
                                .iter()
                                .zip(&prefix)
                                .all(|(actual, wanted)| actual.as_str() == Some(wanted.as_str()))
                    })
            })
        }),
    )
}

/// 存在一条从源记忆指向当前记忆的关系
///
/// 关系类型为空时不限类型，`min_strength` 大于 0 时要求 `strength` 不低于它。
/// 条件渲染为 `EXISTS { ... }` 子查询；判断依赖图遍历，内存求值永不成立，也不能导出为过滤字典。
pub fn related(
    source_id: Uuid,
    relationship_types: &[RelationType],
    min_strength: f64,
) -> BuilderResult<Specification> {
    if !(0.0..=1.0).contains(&min_strength) {
        return Err(BuilderError::validation(format!(
            "min_strength 必须在 0 到 1 之间: {}",
            min_strength
        )));
    }
    let types = if relationship_types.is_empty() {
        String::new()
    } else {
        let names: Vec<&str> = relationship_types.iter().map(RelationType::as_str).collect();
        format!(":{}", names.join("|"))
    };
    let mut values = vec![Value::from(source_id)];
    let strength = if min_strength > 0.0 {
        values.push(Value::Float(min_strength));
        " WHERE related_edge.strength >= {}"
    } else {
        ""
    };
    let template = format!(
        "EXISTS {{ MATCH (related_source:{} {{id: {{}}}})-[related_edge{}]->({{alias}}){} }}",
        MEMORY_LABEL, types, strength
    );
    Ok(custom(CustomCondition::new("related", template, values)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn memory() -> BTreeMap<String, Value> {
        let mut m = BTreeMap::new();
        m.insert("salience".to_string(), Value::Float(0.2));
        m.insert("topic_id".to_string(), Value::Int(7));
        m.insert("role".to_string(), Value::from("user"));
        m.insert("concepts".to_string(), Value::from(vec!["rust", "graphs"]));
        m.insert(
            "timestamp".to_string(),
            Value::from("2026-10-01T10:00:00.000000Z"),
        );
        m.insert("last_accessed".to_string(), Value::Null);
        m.insert(
            "ontology_path".to_string(),
            Value::from(vec!["science", "cs", "databases"]),
        );
        m.insert("emotional_intensity".to_string(), Value::Float(0.6));
        m.insert("emotional_valence".to_string(), Value::Float(-0.2));
        m
    }

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .expect("合法的时间")
            .with_timezone(&Utc)
    }

    #[test]
    fn test_topics() {
        assert!(topics(&[1, 7]).is_satisfied_by(&memory()));
        assert_eq!(topics(&[]).to_condition("m").text, "false");
        assert_eq!(topics(&[1, 2]).to_condition("m").text, "m.topic_id IN $p0");
    }

    #[test]
    fn test_recent_since() {
        let spec = recent_since(at("2026-09-30T00:00:00Z"));
        assert!(spec.is_satisfied_by(&memory()));
        assert!(!recent_since(at("2026-10-02T00:00:00Z")).is_satisfied_by(&memory()));
        let condition = spec.to_condition("m");
        assert_eq!(condition.text, "m.timestamp >= datetime($p0)");
        assert_eq!(
            condition.parameters.get("p0"),
            Some(&Value::from("2026-09-30T00:00:00.000000Z"))
        );
    }

    #[test]
    fn test_decaying() {
        let spec = decaying_since(at("2026-09-01T00:00:00Z"), 0.3);
        assert!(spec.is_satisfied_by(&memory()));
        assert_eq!(
            spec.to_condition("m").text,
            "(m.last_accessed IS NULL OR m.last_accessed < datetime($p0)) AND m.salience <= $p1"
        );
    }

    #[test]
    fn test_role_and_concepts() {
        assert!(role(MemoryRole::User).is_satisfied_by(&memory()));
        assert!(!role(MemoryRole::Assistant).is_satisfied_by(&memory()));
        assert!(concepts(&["graphs", "cooking"]).is_satisfied_by(&memory()));
        assert!(!concepts(&["cooking"]).is_satisfied_by(&memory()));
        let none: [&str; 0] = [];
        assert!(!concepts(&none).is_satisfied_by(&memory()));
    }

    #[test]
    fn test_emotional() {
        assert!(emotional(0.5, -0.5, 0.5).is_satisfied_by(&memory()));
        assert_eq!(
            emotional(0.5, -0.5, 0.5).to_condition("m").text,
            "m.emotional_intensity >= $p0 AND m.emotional_valence >= $p1 AND m.emotional_valence <= $p2"
        );
    }

    #[test]
    fn test_ontology_path() {
        assert!(ontology_path(&["science", "cs"]).is_satisfied_by(&memory()));
        assert!(!ontology_path(&["science", "bio"]).is_satisfied_by(&memory()));
        assert_eq!(
            ontology_path(&["science"]).to_condition("m").text,
            "m.ontology_path[0..1] = $p0"
        );
    }

    #[test]
    fn test_related_renders_exists_subquery() {
        let source = Uuid::new_v4();
        let spec = related(source, &[RelationType::Follows, RelationType::References], 0.5)
            .expect("强度在范围内");
        let condition = spec.to_condition("m");
        assert_eq!(
            condition.text,
            "EXISTS { MATCH (related_source:Memory {id: $p0})-[related_edge:FOLLOWS|REFERENCES]->(m) \
             WHERE related_edge.strength >= $p1 }"
        );
        assert_eq!(condition.parameters.get("p0"), Some(&Value::from(source)));
        assert_eq!(condition.parameters.get("p1"), Some(&Value::Float(0.5)));
        assert!(!spec.is_satisfied_by(&memory()));
        assert!(spec.to_filter().is_none());
    }

    #[test]
    fn test_related_without_types_or_strength() {
        let spec = related(Uuid::nil(), &[], 0.0).expect("强度在范围内");
        assert_eq!(
            spec.to_condition("m").text,
            "EXISTS { MATCH (related_source:Memory {id: $p0})-[related_edge]->(m) }"
        );
        assert!(matches!(
            related(Uuid::nil(), &[], 1.5),
            Err(BuilderError::Validation(_))
        ));
    }

    #[test]
    fn test_salient_composition() {
        let spec = salient(0.7).or_(&frequently_accessed(5));
        assert!(!spec.is_satisfied_by(&memory()));
    }
}
