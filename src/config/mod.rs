use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::query::builder::parameters::DEFAULT_PARAMETER_PREFIX;
use crate::query::filter::UnknownOperatorPolicy;
use crate::query::specification::similarity::{DEFAULT_EMBEDDING_PROPERTY, DEFAULT_SCORE_ALIAS};
use crate::utils::string_utils::is_identifier;

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub builder: BuilderConfig,
    pub log: LogConfig,
}

/// 查询构建器配置
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct BuilderConfig {
    /// 参数名前缀，生成 `$p0`、`$p1` ...
    pub parameter_prefix: String,
    /// 辅助方法与命令行使用的默认节点别名
    pub default_alias: String,
    pub unknown_operator: UnknownOperatorPolicy,
    /// 相似度分数列名
    pub similarity_alias: String,
    /// 向量属性名
    pub embedding_property: String,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            parameter_prefix: DEFAULT_PARAMETER_PREFIX.to_string(),
            default_alias: "m".to_string(),
            unknown_operator: UnknownOperatorPolicy::Reject,
            similarity_alias: DEFAULT_SCORE_ALIAS.to_string(),
            embedding_property: DEFAULT_EMBEDDING_PROPERTY.to_string(),
        }
    }
}

impl BuilderConfig {
    /// 检查会直接出现在查询文本中的名称
    pub fn validate(&self) -> Result<(), String> {
        let names = [
            ("parameter_prefix", &self.parameter_prefix),
            ("default_alias", &self.default_alias),
            ("similarity_alias", &self.similarity_alias),
            ("embedding_property", &self.embedding_property),
        ];
        for (key, value) in names {
            if !is_identifier(value) {
                return Err(format!("配置项 {} 不是合法的标识符: '{}'", key, value));
            }
        }
        Ok(())
    }
}

/// 日志配置
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub dir: String,
    pub file: String,
    pub max_file_size: u64,
    pub max_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: "logs".to_string(),
            file: "cypher-builder".to_string(),
            max_file_size: 100 * 1024 * 1024, // 100MB
            max_files: 5,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.builder.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
