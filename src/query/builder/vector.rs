//! 向量相似度检索
//!
//! 不依赖向量索引，逐个节点计算分数：
//! `MATCH (n:Label) WITH n, <score> AS similarity [WHERE similarity >= $c]
//!  RETURN n, similarity ORDER BY similarity DESC LIMIT $k`
//!
//! 混合检索先在 `CALL { ... }` 子查询中取 `k * expansion_factor` 个候选，
//! 再沿图模式扩展到结果节点，可选按分数重新排序后截取前 k 个。

use crate::core::error::{BuilderError, BuilderResult};
use crate::query::builder::facade::QueryBuilder;
use crate::query::builder::pattern::{node, PatternBuilder};
use crate::query::specification::similarity::{DEFAULT_EMBEDDING_PROPERTY, DEFAULT_SCORE_ALIAS};
use crate::query::specification::SimilarityFunction;
use crate::utils::string_utils::{property_access, quote_identifier};

pub const DEFAULT_VECTOR_VARIABLE: &str = "n";
pub const DEFAULT_TOP_K: u64 = 10;
pub const DEFAULT_EXPANSION_FACTOR: u64 = 100;
pub const DEFAULT_RESULT_VARIABLE: &str = "result";

/// 向量检索参数
#[derive(Debug, Clone, PartialEq)]
pub struct VectorSearch {
    property: String,
    vector: Vec<f64>,
    k: u64,
    function: SimilarityFunction,
    cutoff: Option<f64>,
    label: Option<String>,
    variable: String,
}

impl VectorSearch {
    pub fn new(vector: Vec<f64>) -> Self {
        Self {
            property: DEFAULT_EMBEDDING_PROPERTY.to_string(),
            vector,
            k: DEFAULT_TOP_K,
            function: SimilarityFunction::default(),
            cutoff: None,
            label: None,
            variable: DEFAULT_VECTOR_VARIABLE.to_string(),
        }
    }

    pub fn property(mut self, property: impl Into<String>) -> Self {
        self.property = property.into();
        self
    }

    pub fn top_k(mut self, k: u64) -> Self {
        self.k = k;
        self
    }

    pub fn function(mut self, function: SimilarityFunction) -> Self {
        self.function = function;
        self
    }

    /// 最低分数，低于该值的节点被过滤
    pub fn cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = Some(cutoff);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn variable(mut self, variable: impl Into<String>) -> Self {
        self.variable = variable.into();
        self
    }

    pub fn get_k(&self) -> u64 {
        self.k
    }

    pub fn get_cutoff(&self) -> Option<f64> {
        self.cutoff
    }

    fn validate(&self) -> BuilderResult<()> {
        if self.vector.is_empty() {
            return Err(BuilderError::validation("查询向量不能为空"));
        }
        if self.k < 1 {
            return Err(BuilderError::validation("top_k 必须大于等于 1"));
        }
        if self.variable.is_empty() {
            return Err(BuilderError::validation("节点变量名不能为空"));
        }
        Ok(())
    }
}

/// 混合检索参数：向量召回 + 图扩展 + 重排序
#[derive(Debug, Clone, PartialEq)]
pub struct HybridSearch {
    search: VectorSearch,
    expansion_factor: u64,
    path: Option<(PatternBuilder, String)>,
    rerank: bool,
}

impl HybridSearch {
    /// `search` 的 k 是最终返回的数量，变量名是候选节点的变量名
    pub fn new(search: VectorSearch) -> Self {
        Self {
            search,
            expansion_factor: DEFAULT_EXPANSION_FACTOR,
            path: None,
            rerank: true,
        }
    }

    pub fn expansion_factor(mut self, factor: u64) -> Self {
        self.expansion_factor = factor;
        self
    }

    /// 从候选节点出发的扩展模式，`result_variable` 是模式中结果节点的变量名
    pub fn path(mut self, pattern: PatternBuilder, result_variable: impl Into<String>) -> Self {
        self.path = Some((pattern, result_variable.into()));
        self
    }

    pub fn rerank(mut self, rerank: bool) -> Self {
        self.rerank = rerank;
        self
    }

    /// 候选集大小
    pub fn candidate_count(&self) -> BuilderResult<u64> {
        if self.expansion_factor < 1 {
            return Err(BuilderError::validation("expansion_factor 必须大于等于 1"));
        }
        self.search
            .k
            .checked_mul(self.expansion_factor)
            .ok_or_else(|| BuilderError::validation("k * expansion_factor 超出范围"))
    }
}

impl QueryBuilder {
    /// 追加完整的向量检索子句序列，查询向量、阈值与 k 全部参数化
    pub fn vector_search(self, search: VectorSearch) -> BuilderResult<Self> {
        search.validate()?;
        let variable = quote_identifier(&search.variable);
        let score = quote_identifier(DEFAULT_SCORE_ALIAS);

        let mut builder = self.match_(node(search.label.as_deref().unwrap_or(""), &search.variable))?;
        let query = builder.bind(search.vector);
        let expression = search
            .function
            .expression(&property_access(&search.variable, &search.property), &query);
        builder = builder.with_(vec![variable.clone(), format!("{} AS {}", expression, score)])?;

        if let Some(cutoff) = search.cutoff {
            builder = builder.where_param(&format!("{} >= {{}}", score), cutoff)?;
        }

        log::debug!(
            "向量检索: 函数 {:?}, k = {}, 阈值 {:?}",
            search.function,
            search.k,
            search.cutoff
        );

        builder
            .return_(vec![variable, score.clone()])?
            .order_by(format!("{} DESC", score))?
            .limit(search.k)
    }

    /// 混合检索
    ///
    /// 没有扩展模式时结果就是候选节点本身。扩展后同一个结果节点可能经由多个候选到达，
    /// 重排序时取其中最高的分数；不重排序时按遍历顺序截取。
    pub fn vector_search_hybrid(self, hybrid: HybridSearch) -> BuilderResult<Self> {
        hybrid.search.validate()?;
        let candidate_count = hybrid.candidate_count()?;
        let k = hybrid.search.k;
        let score = quote_identifier(DEFAULT_SCORE_ALIAS);
        let candidate = quote_identifier(&hybrid.search.variable);
        let candidates = hybrid.search.clone().top_k(candidate_count);
        let expanded = hybrid.path.is_some();

        log::debug!(
            "混合检索: k = {}, 候选 {} 个, 扩展模式 {}, 重排序 {}",
            k,
            candidate_count,
            expanded,
            hybrid.rerank
        );

        let builder = self.call_subquery(|inner| inner.vector_search(candidates))?;
        let (builder, result) = match hybrid.path {
            Some((pattern, result_variable)) => {
                if result_variable.is_empty() {
                    return Err(BuilderError::validation("结果节点变量名不能为空"));
                }
                (builder.match_(pattern)?, quote_identifier(&result_variable))
            }
            None => (builder, candidate),
        };

        if !hybrid.rerank {
            return builder.return_(vec![result, score])?.limit(k);
        }
        let builder = if expanded {
            builder.with_(vec![result.clone(), format!("max({}) AS {}", score, score)])?
        } else {
            builder
        };
        builder
            .return_(vec![result, score.clone()])?
            .order_by(format!("{} DESC", score))?
            .limit(k)
    }
}
