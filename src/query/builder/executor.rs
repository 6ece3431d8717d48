//! 执行器边界
//!
//! 构建器只产出查询文本与参数表，从不自己执行查询。
//! 实际的传输层 (驱动、HTTP 客户端等) 实现 [`QueryExecutor`]，超时与重试都由实现方负责。

use std::time::Duration;

use crate::query::builder::facade::BuiltQuery;

/// 查询执行器 trait
///
/// 接收构建结果与可选超时，返回逐行产出的结果流。
pub trait QueryExecutor {
    /// 结果行类型
    type Row;
    /// 传输层错误类型
    type Error: std::error::Error;
    /// 结果行迭代器
    type Rows: Iterator<Item = Result<Self::Row, Self::Error>>;

    fn execute(&self, query: &BuiltQuery, timeout: Option<Duration>) -> Result<Self::Rows, Self::Error>;

    /// 只取第一行，没有结果时返回 `None`
    fn execute_single(
        &self,
        query: &BuiltQuery,
        timeout: Option<Duration>,
    ) -> Result<Option<Self::Row>, Self::Error> {
        match self.execute(query, timeout)?.next() {
            Some(row) => row.map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::Value;
    use crate::query::builder::facade::QueryBuilder;
    use crate::query::builder::pattern::node;
    use std::cell::RefCell;
    use thiserror::Error;

    #[derive(Debug, Error)]
    #[error("连接已关闭")]
    struct Closed;

    /// 记录收到的查询并返回固定行
    struct RecordingExecutor {
        rows: Vec<i64>,
        received: RefCell<Vec<(String, serde_json::Value, Option<Duration>)>>,
    }

    impl QueryExecutor for RecordingExecutor {
        type Row = i64;
        type Error = Closed;
        type Rows = std::vec::IntoIter<Result<i64, Closed>>;

        fn execute(&self, query: &BuiltQuery, timeout: Option<Duration>) -> Result<Self::Rows, Closed> {
            self.received
                .borrow_mut()
                .push((query.text.clone(), query.parameters_json(), timeout));
            Ok(self.rows.iter().copied().map(Ok).collect::<Vec<_>>().into_iter())
        }
    }

    fn sample_query() -> BuiltQuery {
        QueryBuilder::new()
            .match_(node("Memory", "m"))
            .and_then(|b| b.where_param("m.salience >= {}", 0.5))
            .and_then(|b| b.return_("m.access_count"))
            .and_then(QueryBuilder::build)
            .expect("合法的查询")
    }

    #[test]
    fn test_executor_receives_text_and_parameters() {
        let executor = RecordingExecutor {
            rows: vec![3, 4],
            received: RefCell::new(Vec::new()),
        };
        let query = sample_query();
        let rows: Vec<i64> = executor
            .execute(&query, Some(Duration::from_secs(5)))
            .expect("执行成功")
            .collect::<Result<_, _>>()
            .expect("所有行成功");
        assert_eq!(rows, vec![3, 4]);

        let received = executor.received.borrow();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].0, "MATCH (m:Memory) WHERE m.salience >= $p0 RETURN m.access_count");
        assert_eq!(received[0].1, serde_json::json!({"p0": 0.5}));
        assert_eq!(received[0].2, Some(Duration::from_secs(5)));
        assert_eq!(query.parameters.get("p0"), Some(&Value::Float(0.5)));
    }

    #[test]
    fn test_execute_single() {
        let executor = RecordingExecutor {
            rows: Vec::new(),
            received: RefCell::new(Vec::new()),
        };
        let row = executor.execute_single(&sample_query(), None).expect("执行成功");
        assert_eq!(row, None);
    }
}
