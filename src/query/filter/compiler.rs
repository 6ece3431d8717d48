//! 过滤条件编译器
//!
//! 把过滤树渲染为参数化的布尔条件文本。所有字面量都经过参数表，
//! 条件文本中只出现别名、字段名 (按需加反引号)、操作符和占位符。

use crate::core::error::FilterError;
use crate::query::builder::parameters::ParameterTable;
use crate::query::filter::ast::Filter;
use crate::query::filter::dict::{FilterDict, UnknownOperatorPolicy};
use crate::utils::string_utils::property_access;

/// 编译结果：条件文本与参数表
///
/// 条件为空表示没有任何约束。
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFilter {
    pub condition: String,
    pub parameters: ParameterTable,
}

impl CompiledFilter {
    pub fn is_empty(&self) -> bool {
        self.condition.is_empty()
    }

    /// 带 `WHERE` 关键字的完整子句，无约束时为空串
    pub fn where_clause(&self) -> String {
        if self.condition.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.condition)
        }
    }

    pub fn into_parts(self) -> (String, ParameterTable) {
        (self.condition, self.parameters)
    }
}

/// 过滤字典编译器
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterCompiler {
    policy: UnknownOperatorPolicy,
}

impl FilterCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: UnknownOperatorPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> UnknownOperatorPolicy {
        self.policy
    }

    /// 使用新的参数表编译
    pub fn compile(&self, dict: &FilterDict, alias: &str) -> Result<CompiledFilter, FilterError> {
        let mut parameters = ParameterTable::new();
        let condition = self
            .compile_into(dict, alias, &mut parameters)?
            .unwrap_or_default();
        Ok(CompiledFilter {
            condition,
            parameters,
        })
    }

    /// 编译到已有的参数表中，供构建器共享参数编号
    pub fn compile_into(
        &self,
        dict: &FilterDict,
        alias: &str,
        parameters: &mut ParameterTable,
    ) -> Result<Option<String>, FilterError> {
        let filter = dict.lower(self.policy)?;
        Ok(render_filter(&filter, alias, parameters))
    }
}

/// 以默认策略 (拒绝未知操作符) 编译过滤字典
pub fn compile(dict: &FilterDict, alias: &str) -> Result<CompiledFilter, FilterError> {
    FilterCompiler::new().compile(dict, alias)
}

/// 渲染顶层条件
///
/// 顶层 AND 的各项直接用 ` AND ` 连接，不加外层括号；返回 None 表示无约束。
pub fn render_filter(filter: &Filter, alias: &str, parameters: &mut ParameterTable) -> Option<String> {
    match filter {
        Filter::And(children) => {
            let parts: Vec<String> = children
                .iter()
                .filter_map(|child| render_term(child, alias, parameters))
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(" AND "))
            }
        }
        other => render_term(other, alias, parameters),
    }
}

/// 渲染嵌套条件，包含多于一个条件的分组加括号
fn render_term(filter: &Filter, alias: &str, parameters: &mut ParameterTable) -> Option<String> {
    let rendered = match filter {
        Filter::Eq { field, value } => {
            let param = parameters.add(value.clone());
            format!("{} = {}", property_access(alias, field), param)
        }
        Filter::IsNull { field } => format!("{} IS NULL", property_access(alias, field)),
        Filter::Compare { field, op, value } => {
            let param = parameters.add(value.clone());
            format!("{} {} {}", property_access(alias, field), op.symbol(), param)
        }
        Filter::In { field, values } => {
            let param = parameters.add(values.clone());
            format!("{} IN {}", property_access(alias, field), param)
        }
        Filter::Overlap { field, values } => {
            let param = parameters.add(values.clone());
            format!(
                "ANY(x IN {} WHERE x IN {})",
                param,
                property_access(alias, field)
            )
        }
        Filter::Text { field, op, value } => {
            let param = parameters.add(value.clone());
            format!("{} {} {}", property_access(alias, field), op.keyword(), param)
        }
        Filter::Degraded { key, value } => {
            let param = parameters.add(value.clone());
            format!("{} = {}", property_access(alias, key), param)
        }
        Filter::And(children) => return render_group(children, " AND ", alias, parameters),
        Filter::Or(children) => return render_group(children, " OR ", alias, parameters),
    };
    Some(rendered)
}

fn render_group(
    children: &[Filter],
    separator: &str,
    alias: &str,
    parameters: &mut ParameterTable,
) -> Option<String> {
    let mut parts: Vec<String> = children
        .iter()
        .filter_map(|child| render_term(child, alias, parameters))
        .collect();
    match parts.len() {
        0 => None,
        1 => parts.pop(),
        _ => Some(format!("({})", parts.join(separator))),
    }
}
