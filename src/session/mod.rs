//! 会话层：类型化变量与每请求的可变状态

pub mod state;
pub mod variable;

pub use state::{MutableState, SessionState};
pub use variable::{Variable, VariableType};
