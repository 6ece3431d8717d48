use anyhow::{anyhow, Context, Result};
use clap::Parser;

use cypher_builder::config::Config;
use cypher_builder::query::builder::{ClauseKind, QueryGrammarState};
use cypher_builder::query::filter::{FilterCompiler, FilterDict, UnknownOperatorPolicy};
use cypher_builder::utils::logging;

#[derive(Parser)]
#[clap(version = "0.1.0", author = "GraphDB Contributors")]
enum Cli {
    /// Compile a JSON filter dictionary into a parameterized WHERE condition
    CompileFilter {
        #[clap(short, long)]
        config: Option<String>,
        /// Node alias the fields belong to (defaults to builder.default_alias)
        #[clap(short, long)]
        alias: Option<String>,
        /// Filter dictionary as JSON, e.g. '{"salience__gte": 0.7}'
        #[clap(short, long)]
        filter: String,
        /// Render unknown operators as equality instead of failing
        #[clap(long)]
        degrade: bool,
    },
    /// Dry-run a clause sequence through the grammar state machine
    Check {
        #[clap(short, long)]
        config: Option<String>,
        /// Comma separated clauses, e.g. match,where,return
        #[clap(long)]
        clauses: String,
    },
}

fn load_config(path: Option<&str>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path).map_err(|e| anyhow!("加载配置 {} 失败: {}", path, e)),
        None => {
            let mut config = Config::default();
            config.log.dir = String::new();
            config.log.level = "warn".to_string();
            Ok(config)
        }
    }
}

fn compile_filter(config: &Config, alias: Option<String>, filter: &str, degrade: bool) -> Result<()> {
    let alias = alias.unwrap_or_else(|| config.builder.default_alias.clone());
    let policy = if degrade {
        UnknownOperatorPolicy::Degrade
    } else {
        config.builder.unknown_operator
    };
    let dict = FilterDict::from_json_str(filter)?;
    let compiled = FilterCompiler::with_policy(policy).compile(&dict, &alias)?;
    let output = serde_json::json!({
        "condition": compiled.condition,
        "parameters": compiled.parameters.to_json(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn check_clauses(clauses: &str) -> Result<()> {
    let mut state = QueryGrammarState::new();
    for name in clauses.split(',').filter(|name| !name.trim().is_empty()) {
        let kind = ClauseKind::parse(name).ok_or_else(|| anyhow!("未知的子句: '{}'", name.trim()))?;
        state = state
            .advance(kind)
            .with_context(|| format!("添加 {} 失败", kind))?;
    }
    state.validate_complete()?;
    let sequence: Vec<&str> = state.clauses().iter().map(|kind| kind.keyword()).collect();
    println!("OK: {}", sequence.join(" "));
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let result = match cli {
        Cli::CompileFilter {
            config,
            alias,
            filter,
            degrade,
        } => {
            let config = load_config(config.as_deref())?;
            logging::init(&config.log).map_err(|e| anyhow!("日志初始化失败: {}", e))?;
            compile_filter(&config, alias, &filter, degrade)
        }
        Cli::Check { config, clauses } => {
            let config = load_config(config.as_deref())?;
            logging::init(&config.log).map_err(|e| anyhow!("日志初始化失败: {}", e))?;
            check_clauses(&clauses)
        }
    };

    logging::shutdown();
    result
}
