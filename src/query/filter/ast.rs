//! 类型化过滤条件树
//!
//! 过滤字典在编译前先降级为这棵树，编译器对其做穷尽匹配。

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::value::Value;
use crate::query::entity::Entity;

/// 比较操作符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Lt,
    Lte,
    Gt,
    Gte,
    Ne,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Ne => "<>",
        }
    }

    /// 过滤字典中的后缀名
    pub fn suffix(&self) -> &'static str {
        match self {
            CompareOp::Lt => "lt",
            CompareOp::Lte => "lte",
            CompareOp::Gt => "gt",
            CompareOp::Gte => "gte",
            CompareOp::Ne => "ne",
        }
    }
}

/// 文本操作符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextOp {
    Contains,
    StartsWith,
    EndsWith,
}

impl TextOp {
    pub fn keyword(&self) -> &'static str {
        match self {
            TextOp::Contains => "CONTAINS",
            TextOp::StartsWith => "STARTS WITH",
            TextOp::EndsWith => "ENDS WITH",
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            TextOp::Contains => "contains",
            TextOp::StartsWith => "startswith",
            TextOp::EndsWith => "endswith",
        }
    }
}

/// 过滤条件
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `alias.field = $p`
    Eq { field: String, value: Value },
    /// `alias.field IS NULL`，显式 null 不等于"无约束"
    IsNull { field: String },
    Compare {
        field: String,
        op: CompareOp,
        value: Value,
    },
    /// 整个集合作为一个参数绑定
    In { field: String, values: Value },
    /// 列表属性与参数集合有交集
    Overlap { field: String, values: Value },
    Text {
        field: String,
        op: TextOp,
        value: Value,
    },
    /// 未知操作符降级为对复合键名的相等比较
    Degraded { key: String, value: Value },
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        let value = value.into();
        let field = field.into();
        if value.is_null() {
            Filter::IsNull { field }
        } else {
            Filter::Eq { field, value }
        }
    }

    pub fn compare(field: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Filter::Compare {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Lt, value)
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Lte, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Gt, value)
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Gte, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Ne, value)
    }

    pub fn is_in(field: impl Into<String>, values: impl Into<Value>) -> Self {
        Filter::In {
            field: field.into(),
            values: values.into(),
        }
    }

    pub fn overlap(field: impl Into<String>, values: impl Into<Value>) -> Self {
        Filter::Overlap {
            field: field.into(),
            values: values.into(),
        }
    }

    pub fn text(field: impl Into<String>, op: TextOp, value: impl Into<Value>) -> Self {
        Filter::Text {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And(filters)
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Or(filters)
    }

    /// 是否不施加任何约束 (空的逻辑组)
    pub fn is_unconstrained(&self) -> bool {
        match self {
            Filter::And(children) | Filter::Or(children) => {
                children.iter().all(Filter::is_unconstrained)
            }
            _ => false,
        }
    }

    /// 在内存实体上求值
    ///
    /// 缺失的属性按 Cypher 的 null 语义处理：除 `IS NULL` 外的比较都不成立。
    /// 空逻辑组与渲染结果保持一致，视为无约束。
    pub fn matches(&self, entity: &dyn Entity) -> bool {
        match self {
            Filter::Eq { field, value } => entity
                .property(field)
                .is_some_and(|actual| actual.loose_eq(value)),
            Filter::IsNull { field } => entity.property(field).map_or(true, Value::is_null),
            Filter::Compare { field, op, value } => {
                let Some(actual) = entity.property(field) else {
                    return false;
                };
                if actual.is_null() || value.is_null() {
                    return false;
                }
                match op {
                    CompareOp::Ne => !actual.loose_eq(value),
                    _ => match actual.compare(value) {
                        Some(ordering) => match op {
                            CompareOp::Lt => ordering.is_lt(),
                            CompareOp::Lte => ordering.is_le(),
                            CompareOp::Gt => ordering.is_gt(),
                            CompareOp::Gte => ordering.is_ge(),
                            CompareOp::Ne => ordering.is_ne(),
                        },
                        None => false,
                    },
                }
            }
            Filter::In { field, values } => entity
                .property(field)
                .is_some_and(|actual| values.list_contains(actual)),
            Filter::Overlap { field, values } => {
                let (Some(actual), Some(candidates)) = (entity.property(field), values.as_list())
                else {
                    return false;
                };
                candidates.iter().any(|candidate| actual.list_contains(candidate))
            }
            Filter::Text { field, op, value } => {
                let (Some(actual), Some(needle)) = (
                    entity.property(field).and_then(Value::as_str),
                    value.as_str(),
                ) else {
                    return false;
                };
                match op {
                    TextOp::Contains => actual.contains(needle),
                    TextOp::StartsWith => actual.starts_with(needle),
                    TextOp::EndsWith => actual.ends_with(needle),
                }
            }
            Filter::Degraded { key, value } => entity
                .property(key)
                .is_some_and(|actual| actual.loose_eq(value)),
            Filter::And(children) => children.iter().all(|child| child.matches(entity)),
            Filter::Or(children) => {
                let constrained: Vec<&Filter> =
                    children.iter().filter(|c| !c.is_unconstrained()).collect();
                constrained.is_empty() || constrained.iter().any(|child| child.matches(entity))
            }
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Eq { field, value } => write!(f, "{} = {:?}", field, value),
            Filter::IsNull { field } => write!(f, "{} IS NULL", field),
            Filter::Compare { field, op, value } => {
                write!(f, "{} {} {:?}", field, op.symbol(), value)
            }
            Filter::In { field, values } => write!(f, "{} IN {:?}", field, values),
            Filter::Overlap { field, values } => write!(f, "{} OVERLAP {:?}", field, values),
            Filter::Text { field, op, value } => {
                write!(f, "{} {} {:?}", field, op.keyword(), value)
            }
            Filter::Degraded { key, value } => write!(f, "{} = {:?}", key, value),
            Filter::And(children) | Filter::Or(children) => {
                let sep = if matches!(self, Filter::And(_)) {
                    " AND "
                } else {
                    " OR "
                };
                let parts: Vec<String> = children.iter().map(|c| c.to_string()).collect();
                write!(f, "({})", parts.join(sep))
            }
        }
    }
}
