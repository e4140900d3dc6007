//! Brahman - 对话式交互应用运行时
//!
//! 模块划分：
//! - **actions**: 运行时动作（PlaySound / SetVariable / SetZone / ResetApp）与 ActionSet
//! - **bundle**: action bundle 的记录编解码
//! - **codec**: 小端字节读写工具
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型
//! - **keynav**: 键值存储键生成
//! - **logic**: 编译逻辑块、条件语句与惰性求值器
//! - **observability**: tracing 初始化
//! - **runtime**: bundle 执行、区域切换、应用重置、逻辑驱动
//! - **session**: 会话状态与类型化变量
//! - **ssml**: 输出汇（SSML 构建）
//! - **store**: 键值存储抽象与内存实现

pub mod actions;
pub mod bundle;
pub mod codec;
pub mod config;
pub mod core;
pub mod keynav;
pub mod logic;
pub mod observability;
pub mod runtime;
pub mod session;
pub mod ssml;
pub mod store;

pub use actions::{ActionSet, RequestAction};
pub use runtime::Runtime;
pub use session::{MutableState, SessionState, Variable};
