//! 自定义断言辅助模块
//!
//! 提供测试中的常用断言函数

#![allow(dead_code)]

use cypher_builder::core::value::Value;
use cypher_builder::query::builder::ParameterTable;

/// 断言结果成功，返回内部值
pub fn assert_ok<T, E: std::fmt::Debug>(result: Result<T, E>) -> T {
    result.expect("操作应该成功")
}

/// 断言结果失败并匹配错误消息
pub fn assert_err_with<T: std::fmt::Debug, E: std::fmt::Display>(result: Result<T, E>, expected_msg: &str) {
    let err = result.expect_err("操作应该失败");
    let err_str = err.to_string();
    assert!(
        err_str.contains(expected_msg),
        "错误消息应包含 '{}', 实际是 '{}'",
        expected_msg,
        err_str
    );
}

/// 断言参数表与期望的 (名称, 值) 序列完全一致，包括顺序
pub fn assert_parameters(parameters: &ParameterTable, expected: &[(&str, Value)]) {
    let actual: Vec<(&str, &Value)> = parameters.iter().collect();
    assert_eq!(
        actual.len(),
        expected.len(),
        "参数数量不匹配: 期望 {}, 实际 {}",
        expected.len(),
        actual.len()
    );
    for ((name, value), (expected_name, expected_value)) in actual.iter().zip(expected) {
        assert_eq!(name, expected_name, "参数名不匹配");
        assert_eq!(*value, expected_value, "参数 {} 的值不匹配", name);
    }
}

/// 断言查询文本中没有出现原始字面量
pub fn assert_not_inlined(text: &str, literal: &str) {
    assert!(
        !text.contains(literal),
        "查询文本不应包含原始值 '{}': {}",
        literal,
        text
    );
}
