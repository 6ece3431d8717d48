//! 流式查询构建器
//!
//! 每个子句方法都遵循同一个流程：
//! 1. 询问语法状态机能否添加该子句，不能则立即返回语法错误
//! 2. 渲染子句主体，所有字面量都通过参数表绑定
//! 3. 追加片段并推进状态机
//!
//! 子句方法按值消费构建器并返回 `BuilderResult<Self>`，出错后构建器随之销毁，
//! 调用方必须重新开始。`build` 同样消费构建器，构建结果生成后不可能再追加子句。

use serde::Serialize;
use std::fmt;

use crate::config::BuilderConfig;
use crate::core::error::{BuilderError, BuilderResult, FilterError};
use crate::core::value::Value;
use crate::query::builder::clause::ClauseKind;
use crate::query::builder::fragment::{self, count_placeholders, fill_placeholders, Fragment};
use crate::query::builder::parameters::{ParamRef, ParameterTable};
use crate::query::builder::pattern::{NodePattern, Pattern, PatternBuilder, PropertyValue};
use crate::query::builder::state::QueryGrammarState;
use crate::query::filter::{render_filter, Filter, FilterCompiler, FilterDict, UnknownOperatorPolicy};
use crate::query::specification::Specification;
use crate::utils::string_utils::{property_access, quote_identifier};

/// 可以转换为子句项列表的参数，例如 `"n"`、`["n", "m"]`、`vec![..]`
pub trait IntoItems {
    fn into_items(self) -> Vec<String>;
}

impl IntoItems for &str {
    fn into_items(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoItems for String {
    fn into_items(self) -> Vec<String> {
        vec![self]
    }
}

impl<S: AsRef<str>> IntoItems for Vec<S> {
    fn into_items(self) -> Vec<String> {
        self.iter().map(|s| s.as_ref().to_string()).collect()
    }
}

impl<S: AsRef<str>> IntoItems for &[S] {
    fn into_items(self) -> Vec<String> {
        self.iter().map(|s| s.as_ref().to_string()).collect()
    }
}

impl<S: AsRef<str>, const N: usize> IntoItems for [S; N] {
    fn into_items(self) -> Vec<String> {
        self.iter().map(|s| s.as_ref().to_string()).collect()
    }
}

/// 构建结果：查询文本与参数表
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuiltQuery {
    pub text: String,
    pub parameters: ParameterTable,
}

impl BuiltQuery {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn parameters(&self) -> &ParameterTable {
        &self.parameters
    }

    /// 参数表的 JSON 形式，交给执行器使用
    pub fn parameters_json(&self) -> serde_json::Value {
        self.parameters.to_json()
    }

    pub fn into_parts(self) -> (String, ParameterTable) {
        (self.text, self.parameters)
    }
}

impl fmt::Display for BuiltQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// 流式查询构建器
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    state: QueryGrammarState,
    fragments: Vec<Fragment>,
    parameters: ParameterTable,
    config: BuilderConfig,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::from_config(BuilderConfig::default())
    }

    /// 使用自定义配置；配置中的名字会原样进入查询文本，先做标识符校验
    pub fn with_config(config: BuilderConfig) -> BuilderResult<Self> {
        config.validate().map_err(BuilderError::Validation)?;
        Ok(Self::from_config(config))
    }

    fn from_config(config: BuilderConfig) -> Self {
        Self {
            state: QueryGrammarState::new(),
            fragments: Vec::new(),
            parameters: ParameterTable::with_prefix(config.parameter_prefix.clone()),
            config,
        }
    }

    /// 设置未知过滤操作符的处理策略
    pub fn with_policy(mut self, policy: UnknownOperatorPolicy) -> Self {
        self.config.unknown_operator = policy;
        self
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    pub fn state(&self) -> &QueryGrammarState {
        &self.state
    }

    pub fn parameters(&self) -> &ParameterTable {
        &self.parameters
    }

    /// 当前已渲染的片段
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// 绑定一个参数但不添加子句，用于开发者自行编写的表达式
    pub fn bind(&mut self, value: impl Into<Value>) -> ParamRef {
        self.parameters.add(value)
    }

    fn ensure(&self, kind: ClauseKind) -> BuilderResult<()> {
        self.state.check(kind).map_err(|e| {
            log::debug!("拒绝子句 {}: {}", kind, e);
            metrics::counter!("cypher_builder_grammar_violations_total", "clause" => kind.keyword())
                .increment(1);
            BuilderError::from(e)
        })
    }

    fn append(mut self, kind: ClauseKind, body: &str) -> BuilderResult<Self> {
        self.ensure(kind)?;
        let state = std::mem::take(&mut self.state);
        self.state = state.advance(kind)?;
        self.fragments.push(Fragment::clause(kind.keyword(), body));
        Ok(self)
    }

    fn items(kind: ClauseKind, items: impl IntoItems) -> BuilderResult<String> {
        let items = items.into_items();
        if items.is_empty() || items.iter().any(|item| item.trim().is_empty()) {
            return Err(BuilderError::validation(format!("{} 子句至少需要一个非空项", kind)));
        }
        Ok(items.join(", "))
    }

    fn bind_properties<I, K, V>(&mut self, mut node: NodePattern, properties: I) -> NodePattern
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (key, value) in properties {
            let param = self.parameters.add(value);
            node = node.property(key, PropertyValue::from(param));
        }
        node
    }

    // ==================== 模式子句 ====================

    /// `MATCH <pattern>`
    pub fn match_(self, pattern: impl Pattern) -> BuilderResult<Self> {
        pattern.check()?;
        self.append(ClauseKind::Match, &pattern.render())
    }

    /// 以闭包构造路径模式的 `MATCH`
    pub fn match_with<F>(self, build: F) -> BuilderResult<Self>
    where
        F: FnOnce(PatternBuilder) -> PatternBuilder,
    {
        self.match_(build(PatternBuilder::new()))
    }

    pub fn optional_match(self, pattern: impl Pattern) -> BuilderResult<Self> {
        pattern.check()?;
        self.append(ClauseKind::OptionalMatch, &pattern.render())
    }

    pub fn optional_match_with<F>(self, build: F) -> BuilderResult<Self>
    where
        F: FnOnce(PatternBuilder) -> PatternBuilder,
    {
        self.optional_match(build(PatternBuilder::new()))
    }

    /// 匹配节点，属性值全部参数化
    pub fn match_node<I, K, V>(mut self, label: &str, alias: &str, properties: I) -> BuilderResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.ensure(ClauseKind::Match)?;
        let node = self.bind_properties(crate::query::builder::pattern::node(label, alias), properties);
        self.match_(node)
    }

    pub fn create(self, pattern: impl Pattern) -> BuilderResult<Self> {
        pattern.check()?;
        self.append(ClauseKind::Create, &pattern.render())
    }

    pub fn create_with<F>(self, build: F) -> BuilderResult<Self>
    where
        F: FnOnce(PatternBuilder) -> PatternBuilder,
    {
        self.create(build(PatternBuilder::new()))
    }

    /// 创建节点，属性值全部参数化
    pub fn create_node<I, K, V>(mut self, label: &str, alias: &str, properties: I) -> BuilderResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.ensure(ClauseKind::Create)?;
        let node = self.bind_properties(crate::query::builder::pattern::node(label, alias), properties);
        self.create(node)
    }

    pub fn merge(self, pattern: impl Pattern) -> BuilderResult<Self> {
        pattern.check()?;
        self.append(ClauseKind::Merge, &pattern.render())
    }

    pub fn merge_with<F>(self, build: F) -> BuilderResult<Self>
    where
        F: FnOnce(PatternBuilder) -> PatternBuilder,
    {
        self.merge(build(PatternBuilder::new()))
    }

    pub fn merge_node<I, K, V>(mut self, label: &str, alias: &str, properties: I) -> BuilderResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.ensure(ClauseKind::Merge)?;
        let node = self.bind_properties(crate::query::builder::pattern::node(label, alias), properties);
        self.merge(node)
    }

    // ==================== 过滤子句 ====================

    /// 开发者编写的、不含任何值的条件，例如 `a.id <> b.id`
    pub fn where_(self, condition: &str) -> BuilderResult<Self> {
        if condition.trim().is_empty() {
            return Err(BuilderError::validation("WHERE 条件不能为空"));
        }
        self.append(ClauseKind::Where, condition)
    }

    /// 模板中的每个 `{}` 都替换为同一个绑定参数
    pub fn where_param(mut self, template: &str, value: impl Into<Value>) -> BuilderResult<Self> {
        self.ensure(ClauseKind::Where)?;
        let count = count_placeholders(template);
        if count == 0 {
            return Err(BuilderError::validation(format!(
                "WHERE 模板中没有 '{{}}' 占位符: {}",
                template
            )));
        }
        let param = self.parameters.add(value);
        let condition = fill_placeholders(template, &vec![param; count]);
        self.append(ClauseKind::Where, &condition)
    }

    /// 模板中的 `{}` 按顺序替换为各个绑定参数
    pub fn where_params(mut self, template: &str, values: Vec<Value>) -> BuilderResult<Self> {
        self.ensure(ClauseKind::Where)?;
        let expected = count_placeholders(template);
        if expected != values.len() {
            return Err(FilterError::PlaceholderMismatch {
                expected,
                actual: values.len(),
            }
            .into());
        }
        let params: Vec<ParamRef> = values
            .into_iter()
            .map(|value| self.parameters.add(value))
            .collect();
        let condition = fill_placeholders(template, &params);
        self.append(ClauseKind::Where, &condition)
    }

    /// 编译过滤字典作为 `WHERE`；字典为空时不添加任何子句
    pub fn where_filter(mut self, filter: &FilterDict, alias: &str) -> BuilderResult<Self> {
        self.ensure(ClauseKind::Where)?;
        let compiler = FilterCompiler::with_policy(self.config.unknown_operator);
        match compiler.compile_into(filter, alias, &mut self.parameters)? {
            Some(condition) => self.append(ClauseKind::Where, &condition),
            None => Ok(self),
        }
    }

    /// 类型化过滤条件作为 `WHERE`；无约束时不添加任何子句
    pub fn where_typed(mut self, filter: &Filter, alias: &str) -> BuilderResult<Self> {
        self.ensure(ClauseKind::Where)?;
        match render_filter(filter, alias, &mut self.parameters) {
            Some(condition) => self.append(ClauseKind::Where, &condition),
            None => Ok(self),
        }
    }

    /// 规格作为 `WHERE`
    ///
    /// 规格包含相似度谓词时，先插入 `WITH *, <score> AS similarity` 投影分数列，
    /// 已绑定的变量全部保留在作用域内。恒真的规格不添加任何子句。
    pub fn where_spec(mut self, spec: &Specification, alias: &str) -> BuilderResult<Self> {
        let spec = spec.simplify();
        if matches!(spec, Specification::AlwaysTrue) {
            return Ok(self);
        }

        let similarities = spec.similarity_predicates();
        if !similarities.is_empty() {
            self.ensure(ClauseKind::With)?;
            let mut seen: Vec<&str> = Vec::new();
            for similarity in &similarities {
                if seen.contains(&similarity.score_alias()) {
                    return Err(BuilderError::validation(format!(
                        "多个相似度谓词使用了同一个分数列名 '{}'",
                        similarity.score_alias()
                    )));
                }
                seen.push(similarity.score_alias());
            }
            let mut items = vec!["*".to_string()];
            for similarity in &similarities {
                items.push(similarity.projection(alias, &mut self.parameters));
            }
            self = self.append(ClauseKind::With, &items.join(", "))?;
        }

        self.ensure(ClauseKind::Where)?;
        let condition = spec.render(alias, &mut self.parameters);
        self.append(ClauseKind::Where, &condition)
    }

    // ==================== 投影子句 ====================

    pub fn return_(self, items: impl IntoItems) -> BuilderResult<Self> {
        let body = Self::items(ClauseKind::Return, items)?;
        self.append(ClauseKind::Return, &body)
    }

    /// `RETURN DISTINCT ...`
    pub fn return_distinct(self, items: impl IntoItems) -> BuilderResult<Self> {
        let body = Self::items(ClauseKind::Return, items)?;
        self.append(ClauseKind::Return, &format!("DISTINCT {}", body))
    }

    pub fn with_(self, items: impl IntoItems) -> BuilderResult<Self> {
        let body = Self::items(ClauseKind::With, items)?;
        self.append(ClauseKind::With, &body)
    }

    pub fn order_by(self, items: impl IntoItems) -> BuilderResult<Self> {
        let body = Self::items(ClauseKind::OrderBy, items)?;
        self.append(ClauseKind::OrderBy, &body)
    }

    /// `SKIP $pN`
    pub fn skip(mut self, count: u64) -> BuilderResult<Self> {
        self.ensure(ClauseKind::Skip)?;
        let param = self.parameters.add(count_value(count)?);
        self.append(ClauseKind::Skip, &param.placeholder())
    }

    /// `LIMIT $pN`
    pub fn limit(mut self, count: u64) -> BuilderResult<Self> {
        self.ensure(ClauseKind::Limit)?;
        let param = self.parameters.add(count_value(count)?);
        self.append(ClauseKind::Limit, &param.placeholder())
    }

    /// 按页码 (从 1 开始) 分页，第一页不生成 `SKIP`
    pub fn paginate(self, page: u64, page_size: u64) -> BuilderResult<Self> {
        if page < 1 {
            return Err(BuilderError::validation("页码必须大于等于 1"));
        }
        if page_size < 1 {
            return Err(BuilderError::validation("每页数量必须大于等于 1"));
        }
        let skip = (page - 1)
            .checked_mul(page_size)
            .ok_or_else(|| BuilderError::validation("分页偏移量溢出"))?;
        let builder = if skip > 0 { self.skip(skip)? } else { self };
        builder.limit(page_size)
    }

    // ==================== 写入子句 ====================

    /// `SET alias.key = $pN, ...`
    pub fn set_property<I, K, V>(mut self, alias: &str, properties: I) -> BuilderResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.ensure(ClauseKind::Set)?;
        let mut assignments = Vec::new();
        for (key, value) in properties {
            let param = self.parameters.add(value);
            assignments.push(format!("{} = {}", property_access(alias, key.as_ref()), param));
        }
        if assignments.is_empty() {
            return Err(BuilderError::validation("SET 子句至少需要一个属性"));
        }
        self.append(ClauseKind::Set, &assignments.join(", "))
    }

    /// `SET alias.key = <expression>`，右侧为开发者编写的表达式
    pub fn set_expression(self, alias: &str, property: &str, expression: &str) -> BuilderResult<Self> {
        if expression.trim().is_empty() {
            return Err(BuilderError::validation("SET 表达式不能为空"));
        }
        let body = format!("{} = {}", property_access(alias, property), expression);
        self.append(ClauseKind::Set, &body)
    }

    /// `SET a.x = <expr>, a.y = <expr>`，右侧为开发者编写的表达式
    pub fn set_expressions<S: AsRef<str>>(self, alias: &str, assignments: &[(S, S)]) -> BuilderResult<Self> {
        if assignments.is_empty() {
            return Err(BuilderError::validation("SET 子句至少需要一个属性"));
        }
        let body = assignments
            .iter()
            .map(|(property, expression)| {
                format!("{} = {}", property_access(alias, property.as_ref()), expression.as_ref())
            })
            .collect::<Vec<_>>()
            .join(", ");
        self.append(ClauseKind::Set, &body)
    }

    /// `REMOVE alias.key, ...`
    pub fn remove(self, items: impl IntoItems) -> BuilderResult<Self> {
        let body = Self::items(ClauseKind::Remove, items)?;
        self.append(ClauseKind::Remove, &body)
    }

    pub fn delete(self, variables: impl IntoItems) -> BuilderResult<Self> {
        let body = Self::items(ClauseKind::Delete, variables)?;
        self.append(ClauseKind::Delete, &body)
    }

    pub fn detach_delete(self, variables: impl IntoItems) -> BuilderResult<Self> {
        let body = Self::items(ClauseKind::DetachDelete, variables)?;
        self.append(ClauseKind::DetachDelete, &body)
    }

    // ==================== 其他子句 ====================

    /// `CALL procedure(...) [YIELD ...]`
    pub fn call(self, procedure: &str, yield_items: &[&str]) -> BuilderResult<Self> {
        if procedure.trim().is_empty() {
            return Err(BuilderError::validation("CALL 过程不能为空"));
        }
        let body = if yield_items.is_empty() {
            procedure.to_string()
        } else {
            format!("{} YIELD {}", procedure, yield_items.join(", "))
        };
        self.append(ClauseKind::Call, &body)
    }

    /// `CALL { ... }` 子查询
    ///
    /// 子查询从空的语法状态开始，与外层共用参数表，结束时必须是完整查询。
    pub fn call_subquery<F>(mut self, build: F) -> BuilderResult<Self>
    where
        F: FnOnce(QueryBuilder) -> BuilderResult<QueryBuilder>,
    {
        self.ensure(ClauseKind::Call)?;
        let inner = QueryBuilder {
            state: QueryGrammarState::new(),
            fragments: Vec::new(),
            parameters: std::mem::take(&mut self.parameters),
            config: self.config.clone(),
        };
        let inner = build(inner)?;
        inner.state.validate_complete()?;
        self.parameters = inner.parameters;
        let body = format!("{{ {} }}", fragment::join(&inner.fragments));
        self.append(ClauseKind::Call, &body)
    }

    /// `UNWIND $pN AS alias`，列表作为一个参数绑定
    pub fn unwind(mut self, values: impl Into<Value>, alias: &str) -> BuilderResult<Self> {
        self.ensure(ClauseKind::Unwind)?;
        let param = self.parameters.add(values);
        let body = format!("{} AS {}", param, quote_identifier(alias));
        self.append(ClauseKind::Unwind, &body)
    }

    pub fn union(self) -> BuilderResult<Self> {
        self.append(ClauseKind::Union, "")
    }

    pub fn union_all(self) -> BuilderResult<Self> {
        self.append(ClauseKind::Union, "ALL")
    }

    // ==================== 构建 ====================

    /// 校验完整性并按调用顺序拼接全部片段
    pub fn build(self) -> BuilderResult<BuiltQuery> {
        self.state.validate_complete()?;
        let text = fragment::join(&self.fragments);
        log::debug!("构建查询: {} (参数 {} 个)", text, self.parameters.len());
        metrics::counter!("cypher_builder_queries_built_total").increment(1);
        Ok(BuiltQuery {
            text,
            parameters: self.parameters,
        })
    }
}

fn count_value(count: u64) -> BuilderResult<Value> {
    i64::try_from(count)
        .map(Value::Int)
        .map_err(|_| BuilderError::validation(format!("数量超出范围: {}", count)))
}
