// 工具模块 - 仅用于导出各个子模块，不包含具体实现

// 日志模块
pub mod logging;

// 字符串工具模块
pub mod string_utils;
pub use string_utils::{escape_for_query, is_identifier, property_access, quote_identifier, quote_string_literal};
