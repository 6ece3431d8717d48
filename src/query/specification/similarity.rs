//! 向量相似度谓词
//!
//! 相似度分数必须先在 WITH 中投影为派生列，之后才能在 WHERE 中过滤，
//! 因此该谓词同时提供投影表达式和基于分数列的条件。

use serde::{Deserialize, Serialize};

use crate::query::builder::parameters::{ParamRef, ParameterTable};
use crate::query::entity::Entity;
use crate::utils::string_utils::{property_access, quote_identifier};

pub const DEFAULT_SCORE_ALIAS: &str = "similarity";
pub const DEFAULT_EMBEDDING_PROPERTY: &str = "embedding";

/// 相似度函数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityFunction {
    /// GDS 余弦相似度
    #[default]
    Cosine,
    /// 欧氏距离换算为 `1 / (1 + d)`
    Euclidean,
    /// 点积，纯 Cypher 计算
    DotProduct,
    /// 纯 Cypher 计算的余弦相似度，不依赖 GDS 插件
    CosineInline,
}

impl SimilarityFunction {
    /// 分数表达式，`vector` 为属性访问，`query` 为查询向量占位符
    pub fn expression(&self, vector: &str, query: &ParamRef) -> String {
        match self {
            SimilarityFunction::Cosine => {
                format!("gds.similarity.cosine({}, {})", vector, query)
            }
            SimilarityFunction::Euclidean => format!(
                "1.0 / (1.0 + gds.similarity.euclideanDistance({}, {}))",
                vector, query
            ),
            SimilarityFunction::DotProduct => format!(
                "reduce(dot = 0.0, i IN range(0, size({v})-1) | dot + {v}[i] * {q}[i])",
                v = vector,
                q = query
            ),
            SimilarityFunction::CosineInline => format!(
                "reduce(dot = 0.0, i IN range(0, size({v})-1) | dot + {v}[i] * {q}[i]) / \
                 (sqrt(reduce(s = 0.0, i IN range(0, size({v})-1) | s + {v}[i] * {v}[i])) * \
                 sqrt(reduce(s = 0.0, i IN range(0, size({q})-1) | s + {q}[i] * {q}[i])))",
                v = vector,
                q = query
            ),
        }
    }

    /// 在内存中计算分数，维度不一致或零向量时返回 None
    pub fn score(&self, a: &[f64], b: &[f64]) -> Option<f64> {
        if a.is_empty() || a.len() != b.len() {
            return None;
        }
        let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        match self {
            SimilarityFunction::DotProduct => Some(dot),
            SimilarityFunction::Euclidean => {
                let distance: f64 = a
                    .iter()
                    .zip(b)
                    .map(|(x, y)| (x - y) * (x - y))
                    .sum::<f64>()
                    .sqrt();
                Some(1.0 / (1.0 + distance))
            }
            SimilarityFunction::Cosine | SimilarityFunction::CosineInline => {
                let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
                let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
                if norm_a == 0.0 || norm_b == 0.0 {
                    None
                } else {
                    Some(dot / (norm_a * norm_b))
                }
            }
        }
    }
}

/// 相似度阈值谓词
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityPredicate {
    embedding: Vec<f64>,
    threshold: f64,
    property: String,
    score_alias: String,
    function: SimilarityFunction,
}

impl SimilarityPredicate {
    pub fn new(embedding: Vec<f64>, threshold: f64) -> Self {
        Self {
            embedding,
            threshold,
            property: DEFAULT_EMBEDDING_PROPERTY.to_string(),
            score_alias: DEFAULT_SCORE_ALIAS.to_string(),
            function: SimilarityFunction::default(),
        }
    }

    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.property = property.into();
        self
    }

    pub fn with_score_alias(mut self, score_alias: impl Into<String>) -> Self {
        self.score_alias = score_alias.into();
        self
    }

    pub fn with_function(mut self, function: SimilarityFunction) -> Self {
        self.function = function;
        self
    }

    pub fn embedding(&self) -> &[f64] {
        &self.embedding
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn score_alias(&self) -> &str {
        &self.score_alias
    }

    pub fn function(&self) -> SimilarityFunction {
        self.function
    }

    /// 投影项 `<expr> AS similarity`，查询向量作为参数绑定
    pub fn projection(&self, alias: &str, parameters: &mut ParameterTable) -> String {
        let query = parameters.add(self.embedding.clone());
        format!(
            "{} AS {}",
            self.function
                .expression(&property_access(alias, &self.property), &query),
            quote_identifier(&self.score_alias)
        )
    }

    /// 投影之后的过滤条件 `similarity >= $pN`
    pub fn condition(&self, parameters: &mut ParameterTable) -> String {
        let threshold = parameters.add(self.threshold);
        format!("{} >= {}", quote_identifier(&self.score_alias), threshold)
    }

    pub fn score(&self, entity: &dyn Entity) -> Option<f64> {
        let candidate = entity.property(&self.property)?.as_vector()?;
        self.function.score(&self.embedding, &candidate)
    }

    pub fn is_satisfied_by(&self, entity: &dyn Entity) -> bool {
        self.score(entity).is_some_and(|score| score >= self.threshold)
    }
}
