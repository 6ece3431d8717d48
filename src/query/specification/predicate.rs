//! 原子谓词

use std::fmt;
use std::sync::Arc;

use crate::core::error::FilterError;
use crate::core::value::Value;
use crate::query::builder::fragment::{count_placeholders, fill_placeholders};
use crate::query::builder::parameters::{ParamRef, ParameterTable};
use crate::query::entity::Entity;
use crate::query::filter::{render_filter, Filter};
use crate::query::specification::similarity::SimilarityPredicate;
use crate::utils::string_utils::quote_identifier;

/// 自定义条件模板中的别名占位符
pub const ALIAS_PLACEHOLDER: &str = "{alias}";

/// 内存求值函数
pub type Evaluator = Arc<dyn Fn(&dyn Entity) -> bool + Send + Sync>;

/// 自定义条件
///
/// 模板由开发者编写，`{alias}` 替换为节点别名，`{}` 按顺序替换为绑定参数；
/// 值从不拼接进文本。没有求值函数的条件在内存中永不成立。
#[derive(Clone)]
pub struct CustomCondition {
    name: String,
    template: String,
    values: Vec<Value>,
    evaluator: Option<Evaluator>,
}

impl CustomCondition {
    pub fn new(
        name: impl Into<String>,
        template: impl Into<String>,
        values: Vec<Value>,
    ) -> Result<Self, FilterError> {
        let template = template.into();
        let expected = count_placeholders(&template);
        if expected != values.len() {
            return Err(FilterError::PlaceholderMismatch {
                expected,
                actual: values.len(),
            });
        }
        Ok(Self {
            name: name.into(),
            template,
            values,
            evaluator: None,
        })
    }

    pub fn with_evaluator<F>(mut self, evaluator: F) -> Self
    where
        F: Fn(&dyn Entity) -> bool + Send + Sync + 'static,
    {
        self.evaluator = Some(Arc::new(evaluator));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn render(&self, alias: &str, parameters: &mut ParameterTable) -> String {
        let params: Vec<ParamRef> = self
            .values
            .iter()
            .map(|value| parameters.add(value.clone()))
            .collect();
        // 先填参数再替换别名，别名里的 `{}` 不会占用参数位
        fill_placeholders(&self.template, &params).replace(ALIAS_PLACEHOLDER, &quote_identifier(alias))
    }

    pub fn evaluate(&self, entity: &dyn Entity) -> bool {
        self.evaluator
            .as_ref()
            .is_some_and(|evaluator| evaluator(entity))
    }
}

impl fmt::Debug for CustomCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomCondition")
            .field("name", &self.name)
            .field("template", &self.template)
            .field("values", &self.values)
            .field("has_evaluator", &self.evaluator.is_some())
            .finish()
    }
}

/// 原子谓词
#[derive(Debug, Clone)]
pub enum Predicate {
    /// 经过滤编译器渲染的字段条件
    Filter(Filter),
    /// 需要前置投影的相似度条件
    Similarity(SimilarityPredicate),
    Custom(CustomCondition),
}

impl Predicate {
    /// 渲染条件，返回 None 表示无约束
    pub fn render(&self, alias: &str, parameters: &mut ParameterTable) -> Option<String> {
        match self {
            Predicate::Filter(filter) => render_filter(filter, alias, parameters),
            Predicate::Similarity(similarity) => Some(similarity.condition(parameters)),
            Predicate::Custom(custom) => Some(custom.render(alias, parameters)),
        }
    }

    pub fn requires_projection(&self) -> bool {
        matches!(self, Predicate::Similarity(_))
    }

    pub fn is_satisfied_by(&self, entity: &dyn Entity) -> bool {
        match self {
            Predicate::Filter(filter) => filter.matches(entity),
            Predicate::Similarity(similarity) => similarity.is_satisfied_by(entity),
            Predicate::Custom(custom) => custom.evaluate(entity),
        }
    }
}
