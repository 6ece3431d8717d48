//! 查询文本相关的字符串工具
//!
//! 标识符 (别名、标签、属性名) 无法参数化，只能在拼接前转义或加反引号。

use regex::Regex;
use std::sync::OnceLock;

fn identifier_regex() -> &'static Regex {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    IDENTIFIER.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap_or_else(|e| panic!("标识符正则非法: {e}"))
    })
}

/// 转义字符串字面量中的特殊字符
pub fn escape_for_query(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('\"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

/// 转义后加单引号，得到 Cypher 字符串字面量
pub fn quote_string_literal(s: &str) -> String {
    format!("'{}'", escape_for_query(s))
}

/// 是否为无需引用的简单标识符
pub fn is_identifier(name: &str) -> bool {
    identifier_regex().is_match(name)
}

/// 简单标识符原样返回，其余用反引号包裹，内部反引号加倍
pub fn quote_identifier(name: &str) -> String {
    if is_identifier(name) {
        name.to_string()
    } else {
        format!("`{}`", name.replace('`', "``"))
    }
}

/// 拼接 `alias.field`，别名与字段名都按需加反引号
pub fn property_access(alias: &str, field: &str) -> String {
    format!("{}.{}", quote_identifier(alias), quote_identifier(field))
}
