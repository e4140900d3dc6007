//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `BRAHMAN__*` 覆盖（双下划线表示嵌套，如 `BRAHMAN__RUNTIME__MAX_NESTING_DEPTH=4`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub runtime: RuntimeSection,
    pub logging: LoggingSection,
}

/// [app] 段
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct AppSection {
    pub name: Option<String>,
}

/// [runtime] 段：键命名空间版本、嵌套上限、起始区域字段
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RuntimeSection {
    /// 键前缀 `c:v<N>` 中的 N
    #[serde(default = "default_namespace_version")]
    pub namespace_version: u32,
    /// 触发器 → bundle → SetZone → 触发器 … 的最大嵌套层数
    #[serde(default = "default_max_nesting_depth")]
    pub max_nesting_depth: usize,
    /// 静态元数据 hash 中保存起始区域的字段
    #[serde(default = "default_start_zone_field")]
    pub start_zone_field: String,
}

fn default_namespace_version() -> u32 {
    1
}

fn default_max_nesting_depth() -> usize {
    8
}

fn default_start_zone_field() -> String {
    "start_zone".to_string()
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            namespace_version: default_namespace_version(),
            max_nesting_depth: default_max_nesting_depth(),
            start_zone_field: default_start_zone_field(),
        }
    }
}

/// [logging] 段：未设置 RUST_LOG 时使用的过滤指令
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingSection {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

/// 默认配置文件（相对工作目录，可缺省）
pub const DEFAULT_CONFIG_FILE: &str = "config/default.toml";

/// 加载配置：config/default.toml（可缺省）→ 显式指定的文件（必须存在）→ 环境变量 BRAHMAN__*
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder()
        .add_source(config::File::with_name(DEFAULT_CONFIG_FILE).required(false));

    if let Some(path) = config_path {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder
        .add_source(
            config::Environment::with_prefix("BRAHMAN")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}

/// 重新从磁盘与环境变量加载配置
pub fn reload_config() -> Result<AppConfig, config::ConfigError> {
    load_config(None)
}
