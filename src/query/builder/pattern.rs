//! 节点与关系模式
//!
//! 把节点/关系的形状描述 (标签、变量名、属性、方向、可变长度) 渲染为 Cypher 模式文本。
//! 模式构建器只负责语法拼装，不做语义校验：空标签会被忽略而不是报错。

use std::fmt;

use crate::core::error::{BuilderError, BuilderResult};
use crate::core::value::Value;
use crate::query::builder::parameters::ParamRef;
use crate::utils::string_utils::{is_identifier, quote_identifier, quote_string_literal};

/// 可渲染为模式文本的对象
pub trait Pattern {
    fn render(&self) -> String;

    /// 内联字面量无法表示为 Cypher 字面量时报错，例如 NaN 与无穷大
    fn check(&self) -> BuilderResult<()> {
        Ok(())
    }
}

/// 模式属性值
///
/// 字面量在模式中直接内联 (字符串会转义并加引号)，占位符原样输出为 `$name`。
/// 需要参数化的值应先通过参数表绑定，再以 `Placeholder` 传入。
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Literal(Value),
    Placeholder(String),
}

impl PropertyValue {
    fn render(&self) -> String {
        match self {
            PropertyValue::Literal(value) => render_literal(value),
            PropertyValue::Placeholder(name) => format!("${}", name),
        }
    }
}

impl From<Value> for PropertyValue {
    fn from(value: Value) -> Self {
        PropertyValue::Literal(value)
    }
}

impl From<&ParamRef> for PropertyValue {
    fn from(param: &ParamRef) -> Self {
        PropertyValue::Placeholder(param.name().to_string())
    }
}

impl From<ParamRef> for PropertyValue {
    fn from(param: ParamRef) -> Self {
        PropertyValue::from(&param)
    }
}

/// `$name` 形式的字符串视为占位符引用，其余字符串都是字面量
impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        match s.strip_prefix('$') {
            Some(name) if is_identifier(name) => PropertyValue::Placeholder(name.to_string()),
            _ => PropertyValue::Literal(Value::String(s.to_string())),
        }
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::from(s.as_str())
    }
}

macro_rules! literal_property_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for PropertyValue {
                fn from(v: $ty) -> Self {
                    PropertyValue::Literal(Value::from(v))
                }
            }
        )*
    };
}

literal_property_from!(bool, i64, i32, u32, usize, f64, f32);

fn render_literal(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => render_float(*f),
        Value::String(s) => quote_string_literal(s),
        Value::List(items) => format!(
            "[{}]",
            items.iter().map(render_literal).collect::<Vec<_>>().join(", ")
        ),
        Value::Map(map) => format!(
            "{{{}}}",
            map.iter()
                .map(|(k, v)| format!("{}: {}", quote_identifier(k), render_literal(v)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

/// 浮点字面量总是带小数点或指数，`1.0` 不会退化成整数 `1`
fn render_float(f: f64) -> String {
    if f.is_nan() {
        "(0.0 / 0.0)".to_string()
    } else if f.is_infinite() && f.is_sign_positive() {
        "(1.0 / 0.0)".to_string()
    } else if f.is_infinite() {
        "(-1.0 / 0.0)".to_string()
    } else {
        format!("{:?}", f)
    }
}

fn find_non_finite(value: &Value) -> Option<f64> {
    match value {
        Value::Float(f) if !f.is_finite() => Some(*f),
        Value::List(items) => items.iter().find_map(find_non_finite),
        Value::Map(map) => map.values().find_map(find_non_finite),
        _ => None,
    }
}

fn non_finite_message(properties: &[(String, PropertyValue)]) -> Option<String> {
    properties.iter().find_map(|(key, value)| match value {
        PropertyValue::Literal(literal) => find_non_finite(literal).map(|f| {
            format!("属性 '{}' 的值 {} 不能内联为 Cypher 字面量，请改用参数绑定", key, f)
        }),
        PropertyValue::Placeholder(_) => None,
    })
}

fn check_properties(properties: &[(String, PropertyValue)]) -> BuilderResult<()> {
    match non_finite_message(properties) {
        Some(message) => Err(BuilderError::validation(message)),
        None => Ok(()),
    }
}

fn render_properties(properties: &[(String, PropertyValue)]) -> String {
    if properties.is_empty() {
        return String::new();
    }
    let body = properties
        .iter()
        .map(|(key, value)| format!("{}: {}", quote_identifier(key), value.render()))
        .collect::<Vec<_>>()
        .join(", ");
    format!(" {{{}}}", body)
}

fn render_names(names: &[String], separator: &str) -> String {
    let names: Vec<String> = names
        .iter()
        .filter(|name| !name.is_empty())
        .map(|name| quote_identifier(name))
        .collect();
    if names.is_empty() {
        String::new()
    } else {
        format!(":{}", names.join(separator))
    }
}

fn render_variable(variable: &Option<String>) -> String {
    match variable {
        Some(v) if !v.is_empty() => quote_identifier(v),
        _ => String::new(),
    }
}

/// 节点模式 `(n:Label {key: value})`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodePattern {
    variable: Option<String>,
    labels: Vec<String>,
    properties: Vec<(String, PropertyValue)>,
}

impl NodePattern {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn variable(mut self, variable: impl Into<String>) -> Self {
        self.variable = Some(variable.into());
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    pub fn labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels.extend(labels.into_iter().map(Into::into));
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.push((key.into(), value.into()));
        self
    }

    pub fn variable_name(&self) -> Option<&str> {
        self.variable.as_deref()
    }
}

impl Pattern for NodePattern {
    fn render(&self) -> String {
        format!(
            "({}{}{})",
            render_variable(&self.variable),
            render_names(&self.labels, ":"),
            render_properties(&self.properties)
        )
    }

    fn check(&self) -> BuilderResult<()> {
        check_properties(&self.properties)
    }
}

/// 关系方向
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Outgoing,
    Incoming,
    Either,
}

/// 关系模式 `-[r:TYPE*1..3 {key: value}]->`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationshipPattern {
    variable: Option<String>,
    types: Vec<String>,
    properties: Vec<(String, PropertyValue)>,
    direction: Direction,
    min_hops: Option<u32>,
    max_hops: Option<u32>,
}

impl RelationshipPattern {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn variable(mut self, variable: impl Into<String>) -> Self {
        self.variable = Some(variable.into());
        self
    }

    /// 添加关系类型，多个类型以 `|` 连接
    pub fn rel_type(mut self, rel_type: impl Into<String>) -> Self {
        self.types.push(rel_type.into());
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.push((key.into(), value.into()));
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// 可变长度范围，两端可以分别省略
    pub fn hops(mut self, min_hops: Option<u32>, max_hops: Option<u32>) -> Self {
        self.min_hops = min_hops;
        self.max_hops = max_hops;
        self
    }

    pub fn get_direction(&self) -> Direction {
        self.direction
    }

    fn render_body(&self) -> String {
        let mut body = String::from("[");
        body.push_str(&render_variable(&self.variable));
        body.push_str(&render_names(&self.types, "|"));
        if self.min_hops.is_some() || self.max_hops.is_some() {
            body.push('*');
            if let Some(min) = self.min_hops {
                body.push_str(&min.to_string());
            }
            body.push_str("..");
            if let Some(max) = self.max_hops {
                body.push_str(&max.to_string());
            }
        }
        body.push_str(&render_properties(&self.properties));
        body.push(']');
        body
    }
}

impl Pattern for RelationshipPattern {
    fn render(&self) -> String {
        let body = self.render_body();
        match self.direction {
            Direction::Outgoing => format!("-{}->", body),
            Direction::Incoming => format!("<-{}-", body),
            Direction::Either => format!("-{}-", body),
        }
    }

    fn check(&self) -> BuilderResult<()> {
        check_properties(&self.properties)
    }
}

/// 路径模式构建器，按调用顺序从左到右拼接节点与关系
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatternBuilder {
    parts: Vec<String>,
    rejected: Option<String>,
}

impl PatternBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(mut self, node: NodePattern) -> Self {
        self.remember(&node.properties);
        self.parts.push(node.render());
        self
    }

    pub fn relationship(mut self, rel: RelationshipPattern) -> Self {
        self.remember(&rel.properties);
        self.parts.push(rel.render());
        self
    }

    /// 记录第一个检查失败的片段，渲染结果只保留文本
    fn remember(&mut self, properties: &[(String, PropertyValue)]) {
        if self.rejected.is_none() {
            self.rejected = non_finite_message(properties);
        }
    }

    /// 出方向关系 `-[..]->`
    pub fn rel_to(self, rel: RelationshipPattern) -> Self {
        self.relationship(rel.direction(Direction::Outgoing))
    }

    /// 入方向关系 `<-[..]-`
    pub fn rel_from(self, rel: RelationshipPattern) -> Self {
        self.relationship(rel.direction(Direction::Incoming))
    }

    /// 无方向关系 `-[..]-`
    pub fn rel(self, rel: RelationshipPattern) -> Self {
        self.relationship(rel.direction(Direction::Either))
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn build(&self) -> String {
        self.parts.concat()
    }
}

impl Pattern for PatternBuilder {
    fn render(&self) -> String {
        self.build()
    }

    fn check(&self) -> BuilderResult<()> {
        match &self.rejected {
            Some(message) => Err(BuilderError::validation(message.clone())),
            None => Ok(()),
        }
    }
}

impl<P: Pattern + ?Sized> Pattern for &P {
    fn render(&self) -> String {
        (**self).render()
    }

    fn check(&self) -> BuilderResult<()> {
        (**self).check()
    }
}

impl fmt::Display for NodePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl fmt::Display for RelationshipPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// 节点模式快捷构造，空字符串表示省略
pub fn node(label: &str, variable: &str) -> NodePattern {
    let mut pattern = NodePattern::new();
    if !label.is_empty() {
        pattern = pattern.label(label);
    }
    if !variable.is_empty() {
        pattern = pattern.variable(variable);
    }
    pattern
}

/// 关系模式快捷构造，默认出方向
pub fn relationship(rel_type: &str, variable: &str) -> RelationshipPattern {
    let mut pattern = RelationshipPattern::new();
    if !rel_type.is_empty() {
        pattern = pattern.rel_type(rel_type);
    }
    if !variable.is_empty() {
        pattern = pattern.variable(variable);
    }
    pattern
}
