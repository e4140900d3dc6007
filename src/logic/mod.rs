//! 编译逻辑块
//!
//! 布局（小端）：
//! - u16 长度 + AlwaysExec bundle 键
//! - 若还有剩余字节：u8 语句组数量，然后每组 u64 长度 + 语句组负载
//!
//! 语句组负载：
//! - u8 语句数；每条语句：u16 长度 + 键，u8 OR 组数（0 即 else）
//! - 每个 OR 组：u8 比较数；每个比较：u8 运算符位标志、u16 长度 + 变量名、带类型的值

pub mod block;
pub mod condition;
pub mod evaluator;

pub use block::CompiledLogicBlock;
pub use condition::{AndGroup, Comparison, Condition, Operator, Statement, StatementGroup};
pub use evaluator::{LogicEvaluator, Resume, Step};
