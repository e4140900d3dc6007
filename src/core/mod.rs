//! 核心层：错误类型

pub mod error;

pub use error::{DecodeError, EncodeError, RuntimeError, StoreError};
