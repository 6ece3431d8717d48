//! 规格代数
//!
//! 规格是一棵不可变的表达式树：原子谓词、AND、OR、NOT 以及两个常量。
//! `and_` / `or_` / `not_` 总是返回新树，不修改操作数，同一个规格可以安全地
//! 在多个查询中复用。规格既可以渲染为参数化条件，也可以在内存实体上求值。

pub mod memory;
pub mod predicate;
pub mod similarity;

pub use predicate::{CustomCondition, Evaluator, Predicate};
pub use similarity::{SimilarityFunction, SimilarityPredicate};

use std::sync::Arc;

use crate::core::error::FilterError;
use crate::query::builder::parameters::ParameterTable;
use crate::query::entity::Entity;
use crate::query::filter::dict::filter_to_dict;
use crate::query::filter::{Filter, FilterDict, UnknownOperatorPolicy};

/// 规格表达式树
#[derive(Debug, Clone)]
pub enum Specification {
    Atomic(Predicate),
    And(Arc<Specification>, Arc<Specification>),
    Or(Arc<Specification>, Arc<Specification>),
    Not(Arc<Specification>),
    AlwaysTrue,
    AlwaysFalse,
}

/// 渲染得到的条件与参数
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub text: String,
    pub parameters: ParameterTable,
}

/// 运算符优先级，从低到高
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Or,
    And,
    Not,
    Atom,
}

impl Specification {
    pub fn filter(filter: Filter) -> Self {
        Specification::Atomic(Predicate::Filter(filter))
    }

    /// 由过滤字典构造
    pub fn from_dict(dict: &FilterDict, policy: UnknownOperatorPolicy) -> Result<Self, FilterError> {
        Ok(Self::filter(dict.lower(policy)?))
    }

    pub fn similarity(predicate: SimilarityPredicate) -> Self {
        Specification::Atomic(Predicate::Similarity(predicate))
    }

    pub fn custom(condition: CustomCondition) -> Self {
        Specification::Atomic(Predicate::Custom(condition))
    }

    pub fn and_(&self, other: &Specification) -> Specification {
        Specification::And(Arc::new(self.clone()), Arc::new(other.clone()))
    }

    pub fn or_(&self, other: &Specification) -> Specification {
        Specification::Or(Arc::new(self.clone()), Arc::new(other.clone()))
    }

    pub fn not_(&self) -> Specification {
        Specification::Not(Arc::new(self.clone()))
    }

    /// 全部成立，空集合为 `AlwaysTrue`
    pub fn all<I: IntoIterator<Item = Specification>>(specs: I) -> Specification {
        specs
            .into_iter()
            .reduce(|acc, spec| acc.and_(&spec))
            .unwrap_or(Specification::AlwaysTrue)
    }

    /// 任一成立，空集合为 `AlwaysFalse`
    pub fn any<I: IntoIterator<Item = Specification>>(specs: I) -> Specification {
        specs
            .into_iter()
            .reduce(|acc, spec| acc.or_(&spec))
            .unwrap_or(Specification::AlwaysFalse)
    }

    /// 折叠常量并消去双重否定，返回新树
    pub fn simplify(&self) -> Specification {
        use Specification::*;
        match self {
            Atomic(Predicate::Filter(filter)) if filter.is_unconstrained() => AlwaysTrue,
            And(left, right) => match (left.simplify(), right.simplify()) {
                (AlwaysFalse, _) | (_, AlwaysFalse) => AlwaysFalse,
                (AlwaysTrue, other) | (other, AlwaysTrue) => other,
                (l, r) => And(Arc::new(l), Arc::new(r)),
            },
            Or(left, right) => match (left.simplify(), right.simplify()) {
                (AlwaysTrue, _) | (_, AlwaysTrue) => AlwaysTrue,
                (AlwaysFalse, other) | (other, AlwaysFalse) => other,
                (l, r) => Or(Arc::new(l), Arc::new(r)),
            },
            Not(inner) => match inner.simplify() {
                AlwaysTrue => AlwaysFalse,
                AlwaysFalse => AlwaysTrue,
                Not(twice) => (*twice).clone(),
                other => Not(Arc::new(other)),
            },
            other => other.clone(),
        }
    }

    /// 渲染到共享参数表中
    pub fn render(&self, alias: &str, parameters: &mut ParameterTable) -> String {
        self.simplify().render_prec(alias, parameters).0
    }

    /// 使用独立参数表渲染
    pub fn to_condition(&self, alias: &str) -> Condition {
        let mut parameters = ParameterTable::new();
        let text = self.render(alias, &mut parameters);
        Condition { text, parameters }
    }

    fn render_prec(&self, alias: &str, parameters: &mut ParameterTable) -> (String, Precedence) {
        match self {
            Specification::AlwaysTrue => ("true".to_string(), Precedence::Atom),
            Specification::AlwaysFalse => ("false".to_string(), Precedence::Atom),
            Specification::Atomic(predicate) => {
                let text = predicate
                    .render(alias, parameters)
                    .unwrap_or_else(|| "true".to_string());
                let precedence = match predicate {
                    Predicate::Custom(_) if is_parenthesized(&text) => Precedence::Atom,
                    _ => atomic_precedence(predicate),
                };
                (text, precedence)
            }
            Specification::Not(inner) => {
                let inner = wrap(inner.render_prec(alias, parameters), Precedence::Not);
                (format!("NOT {}", inner), Precedence::Not)
            }
            Specification::And(left, right) => {
                let l = wrap(left.render_prec(alias, parameters), Precedence::And);
                let r = wrap(right.render_prec(alias, parameters), Precedence::And);
                (format!("{} AND {}", l, r), Precedence::And)
            }
            Specification::Or(left, right) => {
                let l = wrap(left.render_prec(alias, parameters), Precedence::Or);
                let r = wrap(right.render_prec(alias, parameters), Precedence::Or);
                (format!("{} OR {}", l, r), Precedence::Or)
            }
        }
    }

    /// 是否需要在过滤前投影派生分数列
    pub fn requires_projection(&self) -> bool {
        !self.similarity_predicates().is_empty()
    }

    /// 树中的全部相似度谓词，按从左到右的顺序
    pub fn similarity_predicates(&self) -> Vec<&SimilarityPredicate> {
        let mut found = Vec::new();
        self.collect_similarity(&mut found);
        found
    }

    fn collect_similarity<'a>(&'a self, found: &mut Vec<&'a SimilarityPredicate>) {
        match self {
            Specification::Atomic(Predicate::Similarity(similarity)) => found.push(similarity),
            Specification::And(left, right) | Specification::Or(left, right) => {
                left.collect_similarity(found);
                right.collect_similarity(found);
            }
            Specification::Not(inner) => inner.collect_similarity(found),
            _ => {}
        }
    }

    pub fn is_satisfied_by(&self, entity: &dyn Entity) -> bool {
        match self {
            Specification::Atomic(predicate) => predicate.is_satisfied_by(entity),
            Specification::And(left, right) => {
                left.is_satisfied_by(entity) && right.is_satisfied_by(entity)
            }
            Specification::Or(left, right) => {
                left.is_satisfied_by(entity) || right.is_satisfied_by(entity)
            }
            Specification::Not(inner) => !inner.is_satisfied_by(entity),
            Specification::AlwaysTrue => true,
            Specification::AlwaysFalse => false,
        }
    }

    /// 导出为过滤字典
    ///
    /// 只有字段条件与 AND/OR 组合可以用字典表达；包含 NOT、自定义条件、
    /// 相似度或 `AlwaysFalse` 的树返回 None。
    pub fn to_filter(&self) -> Option<FilterDict> {
        self.simplify().as_filter().map(|filter| filter_to_dict(&filter))
    }

    fn as_filter(&self) -> Option<Filter> {
        match self {
            Specification::Atomic(Predicate::Filter(filter)) => Some(filter.clone()),
            Specification::And(left, right) => {
                Some(Filter::And(vec![left.as_filter()?, right.as_filter()?]))
            }
            Specification::Or(left, right) => {
                Some(Filter::Or(vec![left.as_filter()?, right.as_filter()?]))
            }
            Specification::AlwaysTrue => Some(Filter::And(Vec::new())),
            _ => None,
        }
    }
}

impl From<Filter> for Specification {
    fn from(filter: Filter) -> Self {
        Specification::filter(filter)
    }
}

impl From<SimilarityPredicate> for Specification {
    fn from(predicate: SimilarityPredicate) -> Self {
        Specification::similarity(predicate)
    }
}

impl From<CustomCondition> for Specification {
    fn from(condition: CustomCondition) -> Self {
        Specification::custom(condition)
    }
}

fn atomic_precedence(predicate: &Predicate) -> Precedence {
    match predicate {
        // 顶层 AND 渲染时不带括号
        Predicate::Filter(Filter::And(children)) => {
            let constrained = children.iter().filter(|c| !c.is_unconstrained()).count();
            if constrained > 1 {
                Precedence::And
            } else {
                Precedence::Atom
            }
        }
        Predicate::Filter(_) | Predicate::Similarity(_) => Precedence::Atom,
        // 模板内容未知，按最低优先级处理
        Predicate::Custom(_) => Precedence::Or,
    }
}

/// 整个文本是否被一对匹配的括号包围
fn is_parenthesized(text: &str) -> bool {
    if !text.starts_with('(') || !text.ends_with(')') {
        return false;
    }
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 && i + 1 < text.len() {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

fn wrap((text, precedence): (String, Precedence), required: Precedence) -> String {
    if precedence < required {
        format!("({})", text)
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::Value;
    use std::collections::BTreeMap;

    fn salience(min: f64) -> Specification {
        Filter::gte("salience", min).into()
    }

    fn topic(id: i64) -> Specification {
        Filter::eq("topic_id", id).into()
    }

    #[test]
    fn test_and_or_rendering() {
        let spec = salience(0.5).and_(&topic(1).or_(&topic(2)));
        let condition = spec.to_condition("m");
        assert_eq!(
            condition.text,
            "m.salience >= $p0 AND (m.topic_id = $p1 OR m.topic_id = $p2)"
        );
        assert_eq!(condition.parameters.len(), 3);
    }

    #[test]
    fn test_not_wraps_compound() {
        let spec = salience(0.5).and_(&topic(1)).not_();
        assert_eq!(
            spec.to_condition("m").text,
            "NOT (m.salience >= $p0 AND m.topic_id = $p1)"
        );
        assert_eq!(salience(0.5).not_().to_condition("m").text, "NOT m.salience >= $p0");
    }

    #[test]
    fn test_combinators_do_not_mutate() {
        let a = salience(0.5);
        let before = a.to_condition("m");
        let _ = a.and_(&topic(1));
        let _ = a.not_();
        assert_eq!(a.to_condition("m"), before);
    }

    #[test]
    fn test_rendering_is_repeatable() {
        let spec = salience(0.5).and_(&topic(3));
        assert_eq!(spec.to_condition("m"), spec.to_condition("m"));
    }

    #[test]
    fn test_constants() {
        assert_eq!(Specification::AlwaysTrue.to_condition("m").text, "true");
        assert_eq!(Specification::AlwaysFalse.to_condition("m").text, "false");
        let spec = salience(0.5).and_(&Specification::AlwaysFalse);
        let condition = spec.to_condition("m");
        assert_eq!(condition.text, "false");
        assert!(condition.parameters.is_empty());
        assert_eq!(
            salience(0.5).or_(&Specification::AlwaysFalse).to_condition("m").text,
            "m.salience >= $p0"
        );
    }

    #[test]
    fn test_double_negation_removed() {
        assert_eq!(
            salience(0.5).not_().not_().to_condition("m").text,
            "m.salience >= $p0"
        );
    }

    #[test]
    fn test_nested_filter_and_is_parenthesized_under_or() {
        let emotional: Specification =
            Filter::and(vec![Filter::gte("a", 1), Filter::lte("b", 2)]).into();
        let spec = emotional.or_(&topic(1));
        assert_eq!(
            spec.to_condition("m").text,
            "m.a >= $p0 AND m.b <= $p1 OR m.topic_id = $p2"
        );
        let spec = topic(1).not_().or_(&emotional.not_());
        assert_eq!(
            spec.to_condition("m").text,
            "NOT m.topic_id = $p0 OR NOT (m.a >= $p1 AND m.b <= $p2)"
        );
    }

    #[test]
    fn test_is_parenthesized() {
        assert!(is_parenthesized("(a OR b)"));
        assert!(!is_parenthesized("(a) OR (b)"));
        assert!(!is_parenthesized("a OR b"));
    }

    #[test]
    fn test_in_memory_evaluation() {
        let mut entity = BTreeMap::new();
        entity.insert("salience".to_string(), Value::Float(0.9));
        entity.insert("topic_id".to_string(), Value::Int(2));
        assert!(salience(0.5).and_(&topic(2)).is_satisfied_by(&entity));
        assert!(!salience(0.5).and_(&topic(1)).is_satisfied_by(&entity));
        assert!(topic(1).or_(&topic(2)).is_satisfied_by(&entity));
        assert!(topic(1).not_().is_satisfied_by(&entity));
    }

    #[test]
    fn test_to_filter() {
        let dict = salience(0.5)
            .and_(&topic(1).or_(&topic(2)))
            .to_filter()
            .expect("可以表达为字典");
        assert_eq!(
            dict.to_json(),
            serde_json::json!({
                "salience__gte": 0.5,
                "$or": [{"topic_id": 1}, {"topic_id": 2}]
            })
        );
        assert!(salience(0.5).not_().to_filter().is_none());
        assert!(Specification::AlwaysTrue.to_filter().expect("空字典").is_empty());
    }

    #[test]
    fn test_similarity_requires_projection() {
        let spec = salience(0.5).and_(&SimilarityPredicate::new(vec![1.0], 0.7).into());
        assert!(spec.requires_projection());
        assert!(!salience(0.5).requires_projection());
        assert_eq!(spec.similarity_predicates().len(), 1);
    }
}
