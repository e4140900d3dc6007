//! 编译逻辑块的惰性求值器
//!
//! 显式状态机，由调用方通过 [`LogicEvaluator::resume`] 驱动：
//!
//! ```text
//! AwaitingAlways ──Start──▶ Key(always)
//!        │
//!        ▼
//! AwaitingStatementState ──Continue──▶ NeedState ──State(s)──▶ EvaluatingStatement
//!        ▲                                                           │
//!        └──────────────────────── Key(k) ◀──────────────────────────┘
//!                                                                    │
//!                                                                 Done
//! ```
//!
//! 状态只在第一个语句组之前、以及某个语句组触发之后请求，未触发的组沿用同一份状态继续求值。
//! 求值器不可重启；出错后直接进入 Done。未完成且未取消就被丢弃时记录 warn。

use tracing::{debug, warn};

use crate::codec::ByteReader;
use crate::core::RuntimeError;
use crate::logic::condition::StatementGroup;
use crate::session::MutableState;

/// 调用方交给求值器的输入
#[derive(Debug, Clone, Copy)]
pub enum Resume<'s> {
    /// 首次驱动
    Start,
    /// 上一个键已处理完
    Continue,
    /// 回应 NeedState：当前最新状态
    State(&'s MutableState),
}

/// 求值器产出
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// 需要调用方获取并执行的 action bundle 键（AlwaysExec 键可能为空）
    Key(String),
    /// 需要一份最新状态
    NeedState,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    AwaitingAlways,
    AwaitingStatementState,
    EvaluatingStatement,
    Done,
}

#[derive(Debug)]
pub struct LogicEvaluator<'a> {
    reader: ByteReader<'a>,
    phase: Phase,
    groups_left: u8,
    cancelled: bool,
}

impl<'a> LogicEvaluator<'a> {
    pub fn new(block: &'a [u8]) -> Self {
        Self {
            reader: ByteReader::new(block),
            phase: Phase::AwaitingAlways,
            groups_left: 0,
            cancelled: false,
        }
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// 放弃剩余的语句组
    pub fn cancel(&mut self) {
        if self.phase != Phase::Done {
            debug!(groups_left = self.groups_left, "logic evaluation cancelled");
            self.cancelled = true;
        }
        self.phase = Phase::Done;
    }

    /// 推进一步；任何错误都会终止求值器
    pub fn resume(&mut self, input: Resume<'_>) -> Result<Step, RuntimeError> {
        let step = self.advance(input);
        if step.is_err() {
            self.phase = Phase::Done;
        }
        step
    }

    fn advance(&mut self, input: Resume<'_>) -> Result<Step, RuntimeError> {
        match self.phase {
            Phase::Done => Ok(Step::Done),
            Phase::AwaitingAlways => {
                let always = self.reader.read_str_u16("always key")?;
                if !self.reader.is_finished() {
                    self.groups_left = self.reader.read_u8("statement group count")?;
                }
                self.phase = Phase::AwaitingStatementState;
                Ok(Step::Key(always))
            }
            Phase::AwaitingStatementState if self.groups_left == 0 => self.finish(),
            Phase::AwaitingStatementState => match input {
                Resume::State(state) => {
                    self.phase = Phase::EvaluatingStatement;
                    self.evaluate_groups(state)
                }
                Resume::Start | Resume::Continue => Ok(Step::NeedState),
            },
            // resume 返回前总会离开该阶段
            Phase::EvaluatingStatement => Ok(Step::NeedState),
        }
    }

    fn evaluate_groups(&mut self, state: &MutableState) -> Result<Step, RuntimeError> {
        while self.groups_left > 0 {
            self.groups_left -= 1;
            let payload = self.reader.read_u64_prefixed("statement group")?;
            let group = StatementGroup::decode(payload)?;
            if let Some(key) = group.evaluate(state)? {
                debug!(key, groups_left = self.groups_left, "statement fired");
                self.phase = Phase::AwaitingStatementState;
                return Ok(Step::Key(key.to_string()));
            }
        }
        self.finish()
    }

    fn finish(&mut self) -> Result<Step, RuntimeError> {
        self.phase = Phase::Done;
        self.reader.expect_finished("logic block")?;
        Ok(Step::Done)
    }
}

impl Drop for LogicEvaluator<'_> {
    fn drop(&mut self) {
        if self.phase != Phase::Done && !self.cancelled {
            warn!(
                phase = ?self.phase,
                groups_left = self.groups_left,
                "logic evaluator dropped before completion"
            );
        }
    }
}
