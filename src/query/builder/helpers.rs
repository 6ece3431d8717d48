//! 记忆图谱的常用查询片段
//!
//! 这些方法只组合 `QueryBuilder` 的公开子句方法，语法检查与参数绑定规则完全相同。

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::core::error::{BuilderError, BuilderResult};
use crate::core::value::Value;
use crate::query::builder::facade::QueryBuilder;
use crate::query::builder::pattern::{node, relationship, RelationshipPattern};
use crate::query::specification::SimilarityFunction;
use crate::utils::string_utils::{property_access, quote_identifier};

pub const MEMORY_LABEL: &str = "Memory";
pub const CONVERSATION_LABEL: &str = "Conversation";
pub const TOPIC_LABEL: &str = "Topic";
pub const HAS_MEMORY: &str = "HAS_MEMORY";
pub const CONTAINS: &str = "CONTAINS";

/// `return_memory_fields` 未指定字段时返回的字段
pub const DEFAULT_MEMORY_FIELDS: &[&str] = &["id", "content", "memory_type", "salience", "timestamp"];

impl QueryBuilder {
    /// `MATCH (alias:Memory {..})`
    pub fn match_memory<I, K, V>(self, alias: &str, properties: I) -> BuilderResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.match_node(MEMORY_LABEL, alias, properties)
    }

    /// 会话中的记忆：`MATCH (c:Conversation {id: $p0}) MATCH (c)-[:HAS_MEMORY]->(m:Memory)`
    pub fn match_conversation(
        self,
        conversation_id: Uuid,
        memory_alias: &str,
        conversation_alias: &str,
    ) -> BuilderResult<Self> {
        self.match_node(CONVERSATION_LABEL, conversation_alias, [("id", conversation_id)])?
            .match_with(|p| {
                p.node(node("", conversation_alias))
                    .rel_to(relationship(HAS_MEMORY, ""))
                    .node(node(MEMORY_LABEL, memory_alias))
            })
    }

    /// 主题下的记忆：`MATCH (t:Topic {id: $p0}) MATCH (t)-[:CONTAINS]->(m:Memory)`
    pub fn match_topic_memories(
        self,
        topic_id: i64,
        memory_alias: &str,
        topic_alias: &str,
    ) -> BuilderResult<Self> {
        self.match_node(TOPIC_LABEL, topic_alias, [("id", topic_id)])?
            .match_with(|p| {
                p.node(node("", topic_alias))
                    .rel_to(relationship(CONTAINS, ""))
                    .node(node(MEMORY_LABEL, memory_alias))
            })
    }

    /// 沿任意方向展开 1..depth 跳关系，`optional` 时使用 `OPTIONAL MATCH`
    pub fn expand_relationships(
        self,
        from_alias: &str,
        to_alias: &str,
        relationship_types: &[&str],
        depth: u32,
        optional: bool,
    ) -> BuilderResult<Self> {
        if depth < 1 {
            return Err(BuilderError::validation("关系展开深度必须大于等于 1"));
        }
        let rel = relationship_types
            .iter()
            .fold(RelationshipPattern::new(), |rel, t| rel.rel_type(*t))
            .hops(Some(1), Some(depth));
        let build = |p: crate::query::builder::pattern::PatternBuilder| {
            p.node(node("", from_alias))
                .rel(rel)
                .node(node(MEMORY_LABEL, to_alias))
        };
        if optional {
            self.optional_match_with(build)
        } else {
            self.match_with(build)
        }
    }

    /// `WITH m, collect(DISTINCT related) AS relationships`
    pub fn collect_relationships(
        self,
        node_alias: &str,
        related_alias: &str,
        collection_name: &str,
    ) -> BuilderResult<Self> {
        self.with_(vec![
            quote_identifier(node_alias),
            format!(
                "collect(DISTINCT {}) AS {}",
                quote_identifier(related_alias),
                quote_identifier(collection_name)
            ),
        ])
    }

    /// `RETURN m.id AS id, ...`，字段为空时使用 [`DEFAULT_MEMORY_FIELDS`]
    pub fn return_memory_fields(
        self,
        alias: &str,
        fields: &[&str],
        include_similarity: bool,
        include_relationships: bool,
    ) -> BuilderResult<Self> {
        let fields = if fields.is_empty() {
            DEFAULT_MEMORY_FIELDS
        } else {
            fields
        };
        let mut items: Vec<String> = fields
            .iter()
            .map(|field| format!("{} AS {}", property_access(alias, field), quote_identifier(field)))
            .collect();
        if include_similarity {
            items.push(quote_identifier(&self.config().similarity_alias));
        }
        if include_relationships {
            items.push("relationships".to_string());
        }
        self.return_(items)
    }

    /// `RETURN count([DISTINCT] m) AS count`
    pub fn count(self, alias: &str, distinct: bool) -> BuilderResult<Self> {
        let alias = quote_identifier(alias);
        let expression = if distinct {
            format!("count(DISTINCT {}) AS count", alias)
        } else {
            format!("count({}) AS count", alias)
        };
        self.return_(expression)
    }

    /// 是否存在匹配的节点：`RETURN count(m) > 0 AS exists`，没有匹配时也返回一行
    pub fn exists(self, alias: &str) -> BuilderResult<Self> {
        self.return_(format!("count({}) > 0 AS exists", quote_identifier(alias)))
    }

    /// 聚合返回 `RETURN <expr> AS name, ...`
    ///
    /// 聚合为空时返回数量以及显著度的平均值、最大值和最小值。
    pub fn aggregate(self, alias: &str, aggregations: &[(&str, &str)]) -> BuilderResult<Self> {
        let items: Vec<String> = if aggregations.is_empty() {
            let salience = property_access(alias, "salience");
            vec![
                format!("count({}) AS count", quote_identifier(alias)),
                format!("avg({}) AS avg_salience", salience),
                format!("max({}) AS max_salience", salience),
                format!("min({}) AS min_salience", salience),
            ]
        } else {
            aggregations
                .iter()
                .map(|(name, expression)| format!("{} AS {}", expression, quote_identifier(name)))
                .collect()
        };
        self.return_(items)
    }

    /// 按字段分组聚合：`WITH m, m.field AS field RETURN field, <agg> AS name`
    ///
    /// 聚合为空时默认 `count(m) AS count`。聚合表达式由开发者编写。
    pub fn group_by(
        self,
        node_alias: &str,
        group_field: &str,
        aggregations: &[(&str, &str)],
    ) -> BuilderResult<Self> {
        let alias = quote_identifier(node_alias);
        let field = quote_identifier(group_field);
        let builder = self.with_(vec![
            alias.clone(),
            format!("{} AS {}", property_access(node_alias, group_field), field),
        ])?;

        let mut items = vec![field];
        if aggregations.is_empty() {
            items.push(format!("count({}) AS count", alias));
        } else {
            items.extend(
                aggregations
                    .iter()
                    .map(|(name, expression)| format!("{} AS {}", expression, quote_identifier(name))),
            );
        }
        builder.return_(items)
    }

    /// 时间范围过滤，两端都为空时不添加子句
    pub fn filter_by_date_range(
        self,
        alias: &str,
        field: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> BuilderResult<Self> {
        if start.is_none() && end.is_none() {
            return Ok(self);
        }
        let target = property_access(alias, field);
        let mut builder = self;
        let mut conditions = Vec::new();
        if let Some(start) = start {
            conditions.push(format!("{} >= datetime({})", target, builder.bind(start)));
        }
        if let Some(end) = end {
            conditions.push(format!("{} <= datetime({})", target, builder.bind(end)));
        }
        builder.where_(&conditions.join(" AND "))
    }

    /// 更新访问时间并递增访问次数
    pub fn track_access(self, alias: &str) -> BuilderResult<Self> {
        let count = format!("coalesce({}, 0) + 1", property_access(alias, "access_count"));
        self.set_expressions(
            alias,
            &[("last_accessed", "datetime()"), ("access_count", count.as_str())],
        )
    }

    /// 纯 Cypher 余弦相似度投影：`WITH m, <cosine> AS similarity`
    pub fn with_similarity(mut self, node_alias: &str, embedding: Vec<f64>) -> BuilderResult<Self> {
        if embedding.is_empty() {
            return Err(BuilderError::validation("查询向量不能为空"));
        }
        let vector = property_access(node_alias, &self.config().embedding_property);
        let score_alias = quote_identifier(&self.config().similarity_alias);
        let query = self.bind(embedding);
        let expression = SimilarityFunction::CosineInline.expression(&vector, &query);
        self.with_(vec![
            quote_identifier(node_alias),
            format!("{} AS {}", expression, score_alias),
        ])
    }

    /// 在相似度投影之后按阈值过滤：`WHERE similarity >= $pN`
    pub fn filter_similarity(mut self, threshold: f64) -> BuilderResult<Self> {
        let score_alias = quote_identifier(&self.config().similarity_alias);
        let param = self.bind(threshold);
        self.where_(&format!("{} >= {}", score_alias, param))
    }
}
