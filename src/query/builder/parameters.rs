//! 查询参数表
//!
//! 所有用户提供的值都通过参数表绑定，查询文本中只出现 `$p0`、`$p1` 这样的占位符。
//! 参数名由单调递增的计数器生成，同一个构建器内永不重复。

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

use crate::core::error::{BuilderError, BuilderResult};
use crate::core::value::Value;

/// 默认参数名前缀
pub const DEFAULT_PARAMETER_PREFIX: &str = "p";

/// 指向参数表中某个参数的引用，显示为 `$name`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParamRef(String);

impl ParamRef {
    pub fn name(&self) -> &str {
        &self.0
    }

    /// 用于直接拼接进查询文本的占位符
    pub fn placeholder(&self) -> String {
        format!("${}", self.0)
    }
}

impl fmt::Display for ParamRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

/// 按插入顺序保存的参数表
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterTable {
    prefix: String,
    counter: usize,
    entries: Vec<(String, Value)>,
}

impl Default for ParameterTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterTable {
    pub fn new() -> Self {
        Self::with_prefix(DEFAULT_PARAMETER_PREFIX)
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: 0,
            entries: Vec::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// 绑定一个值并返回新生成的占位符
    pub fn add(&mut self, value: impl Into<Value>) -> ParamRef {
        let name = format!("{}{}", self.prefix, self.counter);
        self.counter += 1;
        self.entries.push((name.clone(), value.into()));
        ParamRef(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        let name = name.strip_prefix('$').unwrap_or(name);
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// 合并另一张参数表
    ///
    /// 同名同值的参数视为同一个绑定，同名不同值时报错而不是覆盖。
    pub fn merge_checked(&mut self, other: ParameterTable) -> BuilderResult<()> {
        for (name, value) in &other.entries {
            if let Some(existing) = self.get(name) {
                if existing != value {
                    return Err(BuilderError::validation(format!(
                        "参数名冲突: ${} 已绑定为 {:?}, 新值为 {:?}",
                        name, existing, value
                    )));
                }
            }
        }
        for (name, value) in other.entries {
            if !self.contains(&name) {
                self.reserve(&name);
                self.entries.push((name, value));
            }
        }
        Ok(())
    }

    /// 名字形如 `<prefix><n>` 时把计数器推到 n 之后，保证后续 `add` 不会复用它
    fn reserve(&mut self, name: &str) {
        let index = name
            .strip_prefix(self.prefix.as_str())
            .filter(|suffix| !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|suffix| suffix.parse::<usize>().ok());
        if let Some(index) = index {
            self.counter = self.counter.max(index + 1);
        }
    }

    /// 以 JSON 对象形式导出，键顺序与插入顺序一致
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .entries
            .iter()
            .map(|(key, value)| (key.clone(), serde_json::Value::from(value)))
            .collect();
        serde_json::Value::Object(map)
    }

    pub fn into_entries(self) -> Vec<(String, Value)> {
        self.entries
    }
}

impl Serialize for ParameterTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_sequential() {
        let mut table = ParameterTable::new();
        let a = table.add(1);
        let b = table.add("x");
        assert_eq!(a.to_string(), "$p0");
        assert_eq!(b.name(), "p1");
        assert_eq!(table.get("p0"), Some(&Value::Int(1)));
        assert_eq!(table.get("$p1"), Some(&Value::from("x")));
    }

    #[test]
    fn test_custom_prefix() {
        let mut table = ParameterTable::with_prefix("param");
        assert_eq!(table.add(true).placeholder(), "$param0");
    }

    #[test]
    fn test_to_json_preserves_order() {
        let mut table = ParameterTable::new();
        for i in 0..12 {
            table.add(i);
        }
        let json = table.to_json();
        let keys: Vec<&String> = json.as_object().expect("对象").keys().collect();
        assert_eq!(keys[10], "p10");
        assert_eq!(keys[2], "p2");
    }

    #[test]
    fn test_merge_checked_rejects_conflicts() {
        let mut left = ParameterTable::new();
        left.add(1);
        let mut right = ParameterTable::new();
        right.add(2);
        assert!(left.merge_checked(right).is_err());

        let mut same = ParameterTable::new();
        same.add(1);
        left.merge_checked(same).expect("同名同值应该可以合并");
        assert_eq!(left.len(), 1);

        let mut other = ParameterTable::with_prefix("q");
        other.add(3);
        left.merge_checked(other).expect("不冲突的参数表应该可以合并");
        assert_eq!(left.len(), 2);
        assert_eq!(left.get("q0"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_add_after_merge_skips_merged_names() {
        let mut incoming = ParameterTable::new();
        incoming.add(1);
        incoming.add(2);

        let mut table = ParameterTable::new();
        table.merge_checked(incoming).expect("合并到空表不应失败");
        let fresh = table.add(99);

        assert_eq!(fresh.name(), "p2");
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["p0", "p1", "p2"]);
        assert_eq!(table.get("p0"), Some(&Value::Int(1)));
        assert_eq!(
            table.to_json(),
            serde_json::json!({"p0": 1, "p1": 2, "p2": 99})
        );
    }

    #[test]
    fn test_merge_ignores_foreign_prefix_for_counter() {
        let mut incoming = ParameterTable::with_prefix("q");
        incoming.add(1);
        incoming.add(2);

        let mut table = ParameterTable::new();
        table.merge_checked(incoming).expect("合并到空表不应失败");
        assert_eq!(table.add(3).name(), "p0");

        let mut odd = ParameterTable::new();
        odd.entries.push(("px".to_string(), Value::Int(4)));
        table.merge_checked(odd).expect("非数字后缀不影响计数器");
        assert_eq!(table.add(5).name(), "p1");
    }
}
