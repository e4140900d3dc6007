//! 运行时错误类型
//!
//! 解码错误（字节码截断、未知动作 ID 等）、编码错误、存储错误统一汇入 RuntimeError；
//! 任何求值路径都只返回错误，不终止宿主进程。

use thiserror::Error;

use crate::session::VariableType;

/// 二进制解码错误：截断、格式错误、未注册的动作标签
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Truncated {what}: needed {needed} bytes, {remaining} remaining")]
    Truncated {
        what: &'static str,
        needed: usize,
        remaining: usize,
    },

    #[error("Unknown action id: {0}")]
    UnknownActionId(u64),

    #[error("Invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),

    #[error("Invalid sound type: {0}")]
    InvalidSoundType(u8),

    #[error("Invalid variable operation: {0}")]
    InvalidOperation(u8),

    #[error("Invalid variable type: {0}")]
    InvalidVariableType(u8),

    #[error("Invalid operand kind: {0}")]
    InvalidOperandKind(u8),

    #[error("Invalid comparison operator: {0}")]
    InvalidOperator(u8),

    #[error("Invalid bool byte: {0}")]
    InvalidBool(u8),

    #[error("Invalid zone id length: {0}")]
    InvalidZoneId(usize),

    #[error("Invalid id: {0}")]
    InvalidId(String),

    #[error("Invalid audio url: {0}")]
    InvalidUrl(String),

    #[error("Array nesting too deep")]
    NestingTooDeep,

    #[error("Trailing bytes in {what}: {count}")]
    TrailingBytes { what: &'static str, count: usize },
}

/// 编码错误：字段长度超过其长度前缀的表示范围
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("{field} too long: {len} > {max}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
}

/// 键值存储错误（读失败、类型不符）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Wrong type for key: {0}")]
    WrongType(String),
}

/// 运行时错误：单个请求的求值以此结束，由调用方决定是否重试外层请求
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Type mismatch on '{variable}': expected {expected}, found {found}")]
    TypeMismatch {
        variable: String,
        expected: String,
        found: VariableType,
    },

    #[error("Missing variable: {0}")]
    MissingVariable(String),

    #[error("Index {index} out of range for '{variable}' (len {len})")]
    IndexOutOfRange {
        variable: String,
        index: usize,
        len: usize,
    },

    #[error("Divide by zero on '{0}'")]
    DivideByZero(String),

    #[error("Arithmetic overflow on '{0}'")]
    ArithmeticOverflow(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("Missing key: {0}")]
    MissingKey(String),

    #[error("Nesting limit exceeded at depth {0}")]
    NestingLimitExceeded(usize),

    #[error("Evaluation cancelled")]
    Cancelled,
}

impl RuntimeError {
    /// 是否为存储侧失败（读失败或键缺失），用于区域初始化失败时回滚初始化标记
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            RuntimeError::StoreUnavailable(_) | RuntimeError::MissingKey(_)
        )
    }
}
