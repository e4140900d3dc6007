//! Brahman - 调试用的 bundle 求值器
//!
//! 输入为 `.json` 脚本（初始变量 + ActionSet，线性化为 action bundle）或原始 bundle 文件，
//! 在空的内存存储上执行，输出渲染后的 SSML 与最终状态快照。
//!
//! 运行方式：
//! ```bash
//! cargo run -- demos/hello.json
//! cargo run -- --config config/local.toml bundle.bin
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use brahman::config::load_config;
use brahman::store::MemoryStore;
use brahman::{observability, ActionSet, Runtime, SessionState, Variable};
use clap::Parser;
use serde::Deserialize;
use uuid::Uuid;

/// 脚本文件格式
#[derive(Debug, Deserialize)]
struct Script {
    #[serde(default)]
    project_id: Option<Uuid>,
    #[serde(default)]
    variables: HashMap<String, Variable>,
    #[serde(default)]
    actions: ActionSet,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Evaluate a brahman action bundle against an in-memory store", long_about = None)]
struct Args {
    /// Extra config file layered over config/default.toml
    #[arg(long)]
    config: Option<PathBuf>,
    /// `.json` script (variables + ActionSet) or a raw bundle file
    script: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let cfg = load_config(args.config.clone()).context("Failed to load config")?;
    observability::init(&cfg.logging.filter);

    let raw = std::fs::read(&args.script)
        .with_context(|| format!("Failed to read {}", args.script.display()))?;
    let is_script = args.script.extension().is_some_and(|ext| ext == "json");
    let script: Script = if is_script {
        serde_json::from_slice(&raw).context("Invalid script")?
    } else {
        Script {
            project_id: None,
            variables: HashMap::new(),
            actions: ActionSet::default(),
        }
    };

    let mut session = SessionState::new(script.project_id.unwrap_or_else(Uuid::new_v4));
    for (name, value) in script.variables {
        session.state.declare(name, value);
    }

    let runtime = Runtime::new(Arc::new(MemoryStore::new()), &cfg.runtime);
    tracing::info!(input = %args.script.display(), is_script, "evaluating bundle");
    if is_script && script.actions.is_empty() {
        tracing::warn!(input = %args.script.display(), "script has no actions");
    }
    let result = if is_script {
        runtime.evaluate_actions(&mut session, &script.actions).await
    } else {
        runtime.evaluate_bundle(&mut session, &raw).await
    };
    result.context("Bundle evaluation failed")?;

    println!("{}", session.render_output());
    println!("{}", session.snapshot_json().context("Failed to snapshot state")?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_with_config() {
        let args = Args::try_parse_from(["brahman", "--config", "local.toml", "demos/hello.json"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("local.toml")));
        assert_eq!(args.script, PathBuf::from("demos/hello.json"));
    }

    #[test]
    fn test_help_is_not_a_script_path() {
        let err = Args::try_parse_from(["brahman", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_script_is_required() {
        let err = Args::try_parse_from(["brahman"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
