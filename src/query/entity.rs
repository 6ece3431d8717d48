//! 内存求值的实体抽象
//!
//! 规格与过滤条件既可以渲染为查询条件，也可以直接在内存中的属性集合上求值。

use std::collections::{BTreeMap, HashMap};

use crate::core::value::Value;

/// 可以按属性名读取值的对象
pub trait Entity {
    fn property(&self, name: &str) -> Option<&Value>;
}

impl Entity for BTreeMap<String, Value> {
    fn property(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

impl Entity for HashMap<String, Value> {
    fn property(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

impl Entity for Value {
    fn property(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Map(map) => map.get(name),
            _ => None,
        }
    }
}
