//! 流式构建器集成测试

mod common;

use common::assertions::{assert_not_inlined, assert_ok, assert_parameters};
use cypher_builder::config::BuilderConfig;
use cypher_builder::core::error::{BuilderError, ErrorCode, FilterError, ToPublicError};
use cypher_builder::core::value::Value;
use cypher_builder::query::builder::{node, relationship, ParameterTable, QueryBuilder, VectorSearch};
use cypher_builder::query::filter::{Filter, FilterDict, UnknownOperatorPolicy};

#[test]
fn test_where_param_example() {
    let query = assert_ok(
        QueryBuilder::new()
            .match_(node("Person", "n"))
            .and_then(|b| b.where_param("n.age > {}", 30))
            .and_then(|b| b.return_("n"))
            .and_then(QueryBuilder::build),
    );
    assert_eq!(query.text, "MATCH (n:Person) WHERE n.age > $p0 RETURN n");
    assert_parameters(&query.parameters, &[("p0", Value::Int(30))]);
    assert_eq!(query.parameters_json(), serde_json::json!({"p0": 30}));
}

#[test]
fn test_clause_order_mirrors_call_order() {
    let query = assert_ok(
        QueryBuilder::new()
            .match_with(|p| {
                p.node(node("Memory", "m"))
                    .rel_from(relationship("HAS_MEMORY", ""))
                    .node(node("Conversation", "c"))
            })
            .and_then(|b| b.where_typed(&Filter::gte("salience", 0.5), "m"))
            .and_then(|b| b.with_(["m", "c"]))
            .and_then(|b| b.optional_match_with(|p| p.node(node("", "m")).rel(relationship("", "r")).node(node("", "x"))))
            .and_then(|b| b.return_distinct(["m", "count(r) AS degree"]))
            .and_then(|b| b.order_by("degree DESC"))
            .and_then(|b| b.limit(10))
            .and_then(QueryBuilder::build),
    );
    assert_eq!(
        query.text,
        "MATCH (m:Memory)<-[:HAS_MEMORY]-(c:Conversation) WHERE m.salience >= $p0 \
         WITH m, c OPTIONAL MATCH (m)-[r]-(x) RETURN DISTINCT m, count(r) AS degree \
         ORDER BY degree DESC LIMIT $p1"
    );
}

#[test]
fn test_injection_safety_for_every_value_path() {
    let hostile = "x' OR 1=1 RETURN n //\n}";
    let filter = FilterDict::new()
        .eq("content", hostile)
        .op("summary", "contains", hostile);
    let query = assert_ok(
        QueryBuilder::new()
            .match_node("Memory", "m", [("id", hostile)])
            .and_then(|b| b.where_filter(&filter, "m"))
            .and_then(|b| b.set_property("m", [("note", hostile)]))
            .and_then(|b| b.return_("m"))
            .and_then(QueryBuilder::build),
    );
    assert_not_inlined(&query.text, "1=1");
    assert_not_inlined(&query.text, "x'");
    assert_eq!(query.parameters.len(), 4);
    assert!(query
        .parameters
        .iter()
        .all(|(_, value)| value == &Value::from(hostile)));
}

#[test]
fn test_parameter_uniqueness() {
    let mut table = ParameterTable::new();
    let refs: Vec<_> = (0..25).map(|_| table.add("same")).collect();
    let mut names: Vec<&str> = refs.iter().map(|r| r.name()).collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), 25);
    assert_eq!(table.len(), 25);
}

#[test]
fn test_where_params_positional_binding() {
    let query = assert_ok(
        QueryBuilder::new()
            .match_(node("Memory", "m"))
            .and_then(|b| {
                b.where_params(
                    "m.salience >= {} AND m.salience <= {}",
                    vec![Value::Float(0.2), Value::Float(0.8)],
                )
            })
            .and_then(|b| b.return_("m"))
            .and_then(QueryBuilder::build),
    );
    assert_eq!(
        query.text,
        "MATCH (m:Memory) WHERE m.salience >= $p0 AND m.salience <= $p1 RETURN m"
    );

    let result = QueryBuilder::new()
        .match_(node("Memory", "m"))
        .and_then(|b| b.where_params("m.salience >= {}", vec![]));
    assert!(matches!(
        result,
        Err(BuilderError::Filter(FilterError::PlaceholderMismatch {
            expected: 1,
            actual: 0
        }))
    ));
}

#[test]
fn test_unknown_operator_policies() {
    let filter = FilterDict::new().op("name", "fuzzy", "alice");

    let err = QueryBuilder::new()
        .match_(node("Person", "n"))
        .and_then(|b| b.where_filter(&filter, "n"))
        .expect_err("默认拒绝未知操作符");
    assert_eq!(err.to_error_code(), ErrorCode::InvalidInput);

    let query = assert_ok(
        QueryBuilder::new()
            .with_policy(UnknownOperatorPolicy::Degrade)
            .match_(node("Person", "n"))
            .and_then(|b| b.where_filter(&filter, "n"))
            .and_then(|b| b.return_("n"))
            .and_then(QueryBuilder::build),
    );
    assert_eq!(query.text, "MATCH (n:Person) WHERE n.name__fuzzy = $p0 RETURN n");
}

#[test]
fn test_write_queries() {
    let created = assert_ok(
        QueryBuilder::new()
            .create_node("Memory", "m", [("content", "hello"), ("role", "user")])
            .and_then(|b| b.return_("m.id"))
            .and_then(QueryBuilder::build),
    );
    assert_eq!(
        created.text,
        "CREATE (m:Memory {content: $p0, role: $p1}) RETURN m.id"
    );

    let merged = assert_ok(
        QueryBuilder::new()
            .merge_node("Topic", "t", [("id", 7)])
            .and_then(|b| b.set_expression("t", "updated_at", "datetime()"))
            .and_then(QueryBuilder::build),
    );
    assert_eq!(
        merged.text,
        "MERGE (t:Topic {id: $p0}) SET t.updated_at = datetime()"
    );

    let deleted = assert_ok(
        QueryBuilder::new()
            .match_node("Memory", "m", [("id", "abc")])
            .and_then(|b| b.detach_delete("m"))
            .and_then(QueryBuilder::build),
    );
    assert_eq!(deleted.text, "MATCH (m:Memory {id: $p0}) DETACH DELETE m");

    let removed = assert_ok(
        QueryBuilder::new()
            .match_(node("Memory", "m"))
            .and_then(|b| b.remove("m.embedding"))
            .and_then(QueryBuilder::build),
    );
    assert_eq!(removed.text, "MATCH (m:Memory) REMOVE m.embedding");
}

#[test]
fn test_empty_set_is_rejected() {
    let empty: Vec<(&str, Value)> = Vec::new();
    let result = QueryBuilder::new()
        .match_(node("Memory", "m"))
        .and_then(|b| b.set_property("m", empty));
    assert!(matches!(result, Err(BuilderError::Validation(_))));
}

#[test]
fn test_bind_for_developer_expressions() {
    let mut builder = assert_ok(QueryBuilder::new().match_(node("Memory", "m")));
    let ids = builder.bind(vec!["a", "b"]);
    let query = assert_ok(
        builder
            .where_(&format!("m.id IN {}", ids))
            .and_then(|b| b.return_("m"))
            .and_then(QueryBuilder::build),
    );
    assert_eq!(query.text, "MATCH (m:Memory) WHERE m.id IN $p0 RETURN m");
    assert_parameters(
        &query.parameters,
        &[("p0", Value::List(vec![Value::from("a"), Value::from("b")]))],
    );
}

#[test]
fn test_configured_builder() {
    let config = BuilderConfig {
        parameter_prefix: "v".to_string(),
        ..BuilderConfig::default()
    };
    let query = assert_ok(
        QueryBuilder::with_config(config)
            .and_then(|b| b.vector_search(VectorSearch::new(vec![0.5, 0.5]).label("Memory").top_k(3)))
            .and_then(QueryBuilder::build),
    );
    assert!(query.text.contains("$v0"));
    assert!(query.text.ends_with("LIMIT $v1"));
    assert_parameters(
        &query.parameters,
        &[
            ("v0", Value::List(vec![Value::Float(0.5), Value::Float(0.5)])),
            ("v1", Value::Int(3)),
        ],
    );
}

#[test]
fn test_built_query_serializes_flat() {
    let query = assert_ok(
        QueryBuilder::new()
            .unwind(vec![1, 2], "x")
            .and_then(|b| b.return_("x"))
            .and_then(QueryBuilder::build),
    );
    let json = serde_json::to_value(&query).expect("序列化成功");
    assert_eq!(
        json,
        serde_json::json!({"text": "UNWIND $p0 AS x RETURN x", "parameters": {"p0": [1, 2]}})
    );
}
