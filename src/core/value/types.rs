use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value类型定义枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueTypeDef {
    Null,
    Bool,
    Int,
    Float,
    String,
    List,
    Map,
}

/// 查询参数值
///
/// 参数表中的值对查询构建器是不透明的：构建器只负责为其分配占位符名称，
/// 类型检查交给外部执行器。序列化时不带标签，参数表可以直接输出为扁平的 JSON 对象。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl Value {
    /// 获取值的类型
    pub fn get_type(&self) -> ValueTypeDef {
        match self {
            Value::Null => ValueTypeDef::Null,
            Value::Bool(_) => ValueTypeDef::Bool,
            Value::Int(_) => ValueTypeDef::Int,
            Value::Float(_) => ValueTypeDef::Float,
            Value::String(_) => ValueTypeDef::String,
            Value::List(_) => ValueTypeDef::List,
            Value::Map(_) => ValueTypeDef::Map,
        }
    }

    /// 检查值是否为null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// 获取布尔值
    pub fn bool_value(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// 以 f64 读取数值，整数会被提升
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(values) => Some(values.as_slice()),
            _ => None,
        }
    }

    /// 把数值列表读取为向量，任何非数值元素都会使结果为 None
    pub fn as_vector(&self) -> Option<Vec<f64>> {
        self.as_list()?.iter().map(Value::as_f64).collect()
    }
}
