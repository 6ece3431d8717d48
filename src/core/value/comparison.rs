use super::types::Value;
use std::cmp::Ordering as CmpOrdering;

// 手动实现PartialEq以正确处理f64比较
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => (a == b) || (a.is_nan() && b.is_nan()),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    /// 按查询语义比较两个值
    ///
    /// 整数与浮点数之间可以互相比较；类型不兼容或任一侧为 null 时返回 None，
    /// 对应查询语言中比较结果为 null 的情形。
    pub fn compare(&self, other: &Value) -> Option<CmpOrdering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                a.as_f64()?.partial_cmp(&b.as_f64()?)
            }
            _ => None,
        }
    }

    /// 等值判断，数值跨类型比较 (1 = 1.0)
    pub fn loose_eq(&self, other: &Value) -> bool {
        if self.is_numeric() && other.is_numeric() {
            return self.compare(other) == Some(CmpOrdering::Equal);
        }
        match (self, other) {
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            _ => self == other,
        }
    }

    /// 列表成员判断
    pub fn list_contains(&self, needle: &Value) -> bool {
        match self {
            Value::List(items) => items.iter().any(|item| item.loose_eq(needle)),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_cross_type_compare() {
        assert_eq!(Value::Int(1).compare(&Value::Float(1.5)), Some(CmpOrdering::Less));
        assert!(Value::Int(2).loose_eq(&Value::Float(2.0)));
        assert_ne!(Value::Int(2), Value::Float(2.0));
    }

    #[test]
    fn test_incompatible_compare_is_none() {
        assert_eq!(Value::Int(1).compare(&Value::String("1".into())), None);
        assert_eq!(Value::Null.compare(&Value::Null), None);
    }

    #[test]
    fn test_list_contains() {
        let list = Value::List(vec![Value::Int(1), Value::String("a".into())]);
        assert!(list.list_contains(&Value::Float(1.0)));
        assert!(list.list_contains(&Value::String("a".into())));
        assert!(!list.list_contains(&Value::Int(3)));
    }
}
