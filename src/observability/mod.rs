//! 可观测性：tracing 订阅器初始化
//!
//! RUST_LOG 优先；未设置时使用配置中的 `[logging] filter`。

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 安装全局订阅器；已安装过时返回 false（测试中多次调用不会 panic）
pub fn init(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init()
        .is_ok()
}
