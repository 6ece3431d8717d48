//! 查询文本片段
//!
//! `Fragment` 是已经完成转义或只包含占位符的文本，只能在 crate 内部构造，
//! 外部代码无法把未经处理的字符串伪装成可信片段。

use std::fmt;

use crate::query::builder::parameters::ParamRef;

/// 条件模板中的位置占位符
pub const TEMPLATE_PLACEHOLDER: &str = "{}";

/// 一个子句或子句主体的渲染结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment(String);

impl Fragment {
    /// 由内部渲染代码构造可信片段
    pub(crate) fn trusted(text: impl Into<String>) -> Self {
        Fragment(text.into())
    }

    /// 关键字加主体，例如 `MATCH` + `(n:Person)`
    pub(crate) fn clause(keyword: &str, body: &str) -> Self {
        if body.is_empty() {
            Fragment(keyword.to_string())
        } else {
            Fragment(format!("{} {}", keyword, body))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fragment {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// 按调用顺序用单个空格拼接片段
pub(crate) fn join(fragments: &[Fragment]) -> String {
    fragments
        .iter()
        .map(Fragment::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

/// 统计模板中 `{}` 的个数
pub(crate) fn count_placeholders(template: &str) -> usize {
    template.matches(TEMPLATE_PLACEHOLDER).count()
}

/// 按顺序把模板中的 `{}` 替换为参数占位符，多余的 `{}` 原样保留
pub(crate) fn fill_placeholders(template: &str, params: &[ParamRef]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut params = params.iter();
    while let Some(pos) = rest.find(TEMPLATE_PLACEHOLDER) {
        out.push_str(&rest[..pos]);
        match params.next() {
            Some(param) => out.push_str(&param.placeholder()),
            None => out.push_str(TEMPLATE_PLACEHOLDER),
        }
        rest = &rest[pos + TEMPLATE_PLACEHOLDER.len()..];
    }
    out.push_str(rest);
    out
}
