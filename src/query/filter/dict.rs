//! 过滤字典
//!
//! 字典式的临时过滤条件，键的语法：
//! - `field`：相等比较，值为 null 时为 `IS NULL`
//! - `field__op`：op 为 lt/lte/gt/gte/ne/in/contains/startswith/endswith/overlap
//! - `$and` / `$or`：子字典列表
//!
//! 条目保持插入顺序，编译结果中的条件顺序与之一致。

use serde::{Deserialize, Serialize};

use crate::core::error::{BuilderResult, FilterError};
use crate::core::value::Value;
use crate::query::filter::ast::{CompareOp, Filter, TextOp};

pub const AND_KEY: &str = "$and";
pub const OR_KEY: &str = "$or";
const OPERATOR_SEPARATOR: &str = "__";

/// 未知操作符后缀的处理策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownOperatorPolicy {
    /// 返回 `FilterError::UnknownOperator`
    #[default]
    Reject,
    /// 降级为对复合键名的相等比较并记录警告
    Degrade,
}

/// 字典条目
#[derive(Debug, Clone, PartialEq)]
pub enum FilterEntry {
    Value(Value),
    Group(Vec<FilterDict>),
}

/// 过滤字典
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterDict {
    entries: Vec<(String, FilterEntry)>,
}

impl FilterDict {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个 `key: value` 条目，键可以带操作符后缀
    pub fn insert(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.push((key.into(), FilterEntry::Value(value.into())));
        self
    }

    pub fn eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.insert(field, value)
    }

    /// 追加 `field__op: value` 条目
    pub fn op(self, field: &str, op: &str, value: impl Into<Value>) -> Self {
        self.insert(format!("{}{}{}", field, OPERATOR_SEPARATOR, op), value)
    }

    pub fn or(mut self, groups: Vec<FilterDict>) -> Self {
        self.entries.push((OR_KEY.to_string(), FilterEntry::Group(groups)));
        self
    }

    pub fn and(mut self, groups: Vec<FilterDict>) -> Self {
        self.entries.push((AND_KEY.to_string(), FilterEntry::Group(groups)));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[(String, FilterEntry)] {
        &self.entries
    }

    /// 从 JSON 对象解析，保持键顺序
    pub fn from_json(json: &serde_json::Value) -> Result<Self, FilterError> {
        let object = json
            .as_object()
            .ok_or_else(|| FilterError::NotAnObject(json_kind(json).to_string()))?;

        let mut dict = FilterDict::new();
        for (key, value) in object {
            if key == AND_KEY || key == OR_KEY {
                let items = value.as_array().ok_or_else(|| FilterError::InvalidGroup {
                    key: key.clone(),
                    reason: format!("需要子字典列表, 实际为 {}", json_kind(value)),
                })?;
                let groups = items
                    .iter()
                    .map(|item| {
                        if item.is_object() {
                            FilterDict::from_json(item)
                        } else {
                            Err(FilterError::InvalidGroup {
                                key: key.clone(),
                                reason: format!("列表元素必须是对象, 实际为 {}", json_kind(item)),
                            })
                        }
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                dict.entries.push((key.clone(), FilterEntry::Group(groups)));
            } else {
                dict.entries
                    .push((key.clone(), FilterEntry::Value(Value::from(value.clone()))));
            }
        }
        Ok(dict)
    }

    /// 解析 JSON 文本；文本本身不是合法 JSON 时返回 `BuilderError::Serialization`
    pub fn from_json_str(text: &str) -> BuilderResult<Self> {
        let json: serde_json::Value = serde_json::from_str(text)?;
        Ok(Self::from_json(&json)?)
    }

    /// 导出为 JSON 对象
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .entries
            .iter()
            .map(|(key, entry)| {
                let value = match entry {
                    FilterEntry::Value(v) => serde_json::Value::from(v),
                    FilterEntry::Group(groups) => {
                        serde_json::Value::Array(groups.iter().map(FilterDict::to_json).collect())
                    }
                };
                (key.clone(), value)
            })
            .collect();
        serde_json::Value::Object(map)
    }

    /// 降级为类型化的过滤树，顶层条目之间是 AND 关系
    pub fn lower(&self, policy: UnknownOperatorPolicy) -> Result<Filter, FilterError> {
        let children = self
            .entries
            .iter()
            .map(|(key, entry)| lower_entry(key, entry, policy))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Filter::And(children))
    }
}

fn lower_entry(
    key: &str,
    entry: &FilterEntry,
    policy: UnknownOperatorPolicy,
) -> Result<Filter, FilterError> {
    match (key, entry) {
        (OR_KEY, FilterEntry::Group(groups)) => Ok(Filter::Or(
            groups
                .iter()
                .map(|group| group.lower(policy))
                .collect::<Result<Vec<_>, _>>()?,
        )),
        (AND_KEY, FilterEntry::Group(groups)) => {
            // $and 的各子字典展开到同一个 AND 组中
            let mut children = Vec::new();
            for group in groups {
                match group.lower(policy)? {
                    Filter::And(inner) => children.extend(inner),
                    other => children.push(other),
                }
            }
            Ok(Filter::And(children))
        }
        (OR_KEY | AND_KEY, FilterEntry::Value(value)) => Err(FilterError::InvalidGroup {
            key: key.to_string(),
            reason: format!("需要子字典列表, 实际为 {:?}", value),
        }),
        (_, FilterEntry::Group(_)) => Err(FilterError::InvalidGroup {
            key: key.to_string(),
            reason: "只有 $and 与 $or 可以包含子字典".to_string(),
        }),
        (_, FilterEntry::Value(value)) => lower_field(key, value.clone(), policy),
    }
}

fn lower_field(key: &str, value: Value, policy: UnknownOperatorPolicy) -> Result<Filter, FilterError> {
    if key.starts_with('$') {
        return Err(FilterError::InvalidKey(key.to_string()));
    }

    let Some((field, op)) = key.split_once(OPERATOR_SEPARATOR) else {
        if key.is_empty() {
            return Err(FilterError::InvalidKey(key.to_string()));
        }
        return Ok(Filter::eq(key, value));
    };
    if field.is_empty() {
        return Err(FilterError::InvalidKey(key.to_string()));
    }

    let filter = match op {
        "lt" => Filter::compare(field, CompareOp::Lt, value),
        "lte" => Filter::compare(field, CompareOp::Lte, value),
        "gt" => Filter::compare(field, CompareOp::Gt, value),
        "gte" => Filter::compare(field, CompareOp::Gte, value),
        "ne" => Filter::compare(field, CompareOp::Ne, value),
        "in" => Filter::is_in(field, value),
        "overlap" => Filter::overlap(field, value),
        "contains" => Filter::text(field, TextOp::Contains, value),
        "startswith" => Filter::text(field, TextOp::StartsWith, value),
        "endswith" => Filter::text(field, TextOp::EndsWith, value),
        _ => match policy {
            UnknownOperatorPolicy::Reject => {
                return Err(FilterError::UnknownOperator {
                    field: field.to_string(),
                    operator: op.to_string(),
                })
            }
            UnknownOperatorPolicy::Degrade => {
                log::warn!(
                    "未知的过滤操作符 '{}' (字段 '{}'), 降级为对 '{}' 的相等比较",
                    op,
                    field,
                    key
                );
                metrics::counter!("cypher_builder_degraded_filters_total").increment(1);
                Filter::Degraded {
                    key: key.to_string(),
                    value,
                }
            }
        },
    };
    Ok(filter)
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "布尔值",
        serde_json::Value::Number(_) => "数值",
        serde_json::Value::String(_) => "字符串",
        serde_json::Value::Array(_) => "数组",
        serde_json::Value::Object(_) => "对象",
    }
}

/// 把类型化过滤树导出为过滤字典
///
/// 同一层的相同键无法在字典中共存，遇到重复键时改用 `$and` 分组。
pub(crate) fn filter_to_dict(filter: &Filter) -> FilterDict {
    let mut dict = FilterDict::new();
    append_to_dict(&mut dict, filter);
    dict
}

fn append_to_dict(dict: &mut FilterDict, filter: &Filter) {
    let (key, entry) = match filter {
        Filter::Eq { field, value } => (field.clone(), FilterEntry::Value(value.clone())),
        Filter::IsNull { field } => (field.clone(), FilterEntry::Value(Value::Null)),
        Filter::Compare { field, op, value } => (
            format!("{}{}{}", field, OPERATOR_SEPARATOR, op.suffix()),
            FilterEntry::Value(value.clone()),
        ),
        Filter::In { field, values } => (
            format!("{}{}in", field, OPERATOR_SEPARATOR),
            FilterEntry::Value(values.clone()),
        ),
        Filter::Overlap { field, values } => (
            format!("{}{}overlap", field, OPERATOR_SEPARATOR),
            FilterEntry::Value(values.clone()),
        ),
        Filter::Text { field, op, value } => (
            format!("{}{}{}", field, OPERATOR_SEPARATOR, op.suffix()),
            FilterEntry::Value(value.clone()),
        ),
        Filter::Degraded { key, value } => (key.clone(), FilterEntry::Value(value.clone())),
        Filter::And(children) => {
            for child in children {
                append_to_dict(dict, child);
            }
            return;
        }
        Filter::Or(children) => (
            OR_KEY.to_string(),
            FilterEntry::Group(children.iter().map(filter_to_dict).collect()),
        ),
    };

    if !dict.entries.iter().any(|(existing, _)| *existing == key) {
        dict.entries.push((key, entry));
        return;
    }

    let mut single = FilterDict::new();
    single.entries.push((key, entry));
    // 每层只保留一个 `$and` 分组，后续重复键都追加进去
    let group = dict.entries.iter_mut().find_map(|(existing, value)| match value {
        FilterEntry::Group(groups) if existing.as_str() == AND_KEY => Some(groups),
        _ => None,
    });
    match group {
        Some(groups) => groups.push(single),
        None => dict
            .entries
            .push((AND_KEY.to_string(), FilterEntry::Group(vec![single]))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lower_preserves_order() {
        let dict = FilterDict::new()
            .op("salience", "gte", 0.7)
            .or(vec![
                FilterDict::new().eq("topic_id", 1),
                FilterDict::new().eq("topic_id", 2),
            ]);
        let filter = dict.lower(UnknownOperatorPolicy::Reject).expect("合法的字典");
        let Filter::And(children) = filter else {
            panic!("顶层应该是 AND");
        };
        assert_eq!(children.len(), 2);
        assert!(matches!(children[0], Filter::Compare { op: CompareOp::Gte, .. }));
        assert!(matches!(children[1], Filter::Or(_)));
    }

    #[test]
    fn test_unknown_operator_rejected_by_default() {
        let dict = FilterDict::new().op("salience", "between", 1);
        let err = dict
            .lower(UnknownOperatorPolicy::default())
            .expect_err("未知操作符应该报错");
        assert_eq!(
            err,
            FilterError::UnknownOperator {
                field: "salience".to_string(),
                operator: "between".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_operator_degrades() {
        let dict = FilterDict::new().op("salience", "between", 1);
        let filter = dict.lower(UnknownOperatorPolicy::Degrade).expect("降级不报错");
        assert_eq!(
            filter,
            Filter::And(vec![Filter::Degraded {
                key: "salience__between".to_string(),
                value: Value::Int(1)
            }])
        );
    }

    #[test]
    fn test_from_json_keeps_key_order() {
        let dict = FilterDict::from_json(&json!({"z": 1, "a__gt": 2, "$or": [{"m": 3}]}))
            .expect("合法的 JSON");
        let keys: Vec<&str> = dict.entries().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["z", "a__gt", "$or"]);
    }

    #[test]
    fn test_from_json_rejects_bad_groups() {
        assert!(matches!(
            FilterDict::from_json(&json!([1, 2])),
            Err(FilterError::NotAnObject(_))
        ));
        assert!(matches!(
            FilterDict::from_json(&json!({"$or": {"a": 1}})),
            Err(FilterError::InvalidGroup { .. })
        ));
        assert!(matches!(
            FilterDict::from_json(&json!({"$and": [1]})),
            Err(FilterError::InvalidGroup { .. })
        ));
    }

    #[test]
    fn test_invalid_keys() {
        let policy = UnknownOperatorPolicy::Reject;
        assert!(FilterDict::new().insert("$not", 1).lower(policy).is_err());
        assert!(FilterDict::new().insert("__gt", 1).lower(policy).is_err());
    }

    #[test]
    fn test_filter_to_dict_splits_duplicate_keys() {
        let filter = Filter::and(vec![Filter::gt("x", 1), Filter::gt("x", 5)]);
        let dict = filter_to_dict(&filter);
        assert_eq!(dict.to_json(), json!({"x__gt": 1, "$and": [{"x__gt": 5}]}));
        let lowered = dict.lower(UnknownOperatorPolicy::Reject).expect("可以重新降级");
        assert_eq!(
            lowered,
            Filter::And(vec![Filter::gt("x", 1), Filter::And(vec![Filter::gt("x", 5)])])
        );
    }

    #[test]
    fn test_filter_to_dict_keeps_every_repeated_condition() {
        let filter = Filter::and(vec![Filter::gt("x", 1), Filter::gt("x", 5), Filter::gt("x", 9)]);
        let dict = filter_to_dict(&filter);
        assert_eq!(
            dict.to_json(),
            json!({"x__gt": 1, "$and": [{"x__gt": 5}, {"x__gt": 9}]})
        );

        let lowered = dict.lower(UnknownOperatorPolicy::Reject).expect("可以重新降级");
        let entity: std::collections::BTreeMap<String, Value> =
            [("x".to_string(), Value::Int(7))].into_iter().collect();
        assert_eq!(filter.matches(&entity), lowered.matches(&entity));
        assert!(!lowered.matches(&entity));
    }
}
