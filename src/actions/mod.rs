//! 运行时动作注册表
//!
//! 每种动作实现 Action trait（encode / decode / tag / execute），由封闭枚举 RequestAction 统一分派；
//! ActionId 是持久化 bundle 中的标签，一旦发布不得重新编号。
//! ActionSet 是按类型分组的编译前动作集合，按固定顺序线性化为 bundle。

pub mod play_sound;
pub mod reset_app;
pub mod set_variable;
pub mod set_zone;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{DecodeError, EncodeError, RuntimeError};
use crate::session::SessionState;

pub use play_sound::{PlaySound, SoundType};
pub use reset_app::ResetApp;
pub use set_variable::{Operand, SetVariable, VariableOperation};
pub use set_zone::SetZone;

/// 动作标签（bundle 记录的前 8 字节）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u64)]
pub enum ActionId {
    SetVariable = 0,
    PlaySound = 1,
    /// 预留，运行时未注册；出现在 bundle 中视为未知动作
    InitializeActorDialog = 2,
    SetZone = 3,
    ResetApp = 4,
}

impl ActionId {
    pub fn as_u64(self) -> u64 {
        self as u64
    }
}

/// 动作执行后需要由 Runtime 完成的后续工作（需要访问键值存储的部分）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Followup {
    None,
    /// 首次进入该区域，需要执行区域初始化触发器
    InitializeZone(Uuid),
    /// 重建区域成员并重新进入起始区域
    ResetApp,
}

/// 动作能力集：编码（不含帧头）、解码、标签、执行
pub trait Action: Sized {
    const ID: ActionId;

    fn encode(&self) -> Result<Vec<u8>, EncodeError>;

    fn decode(payload: &[u8]) -> Result<Self, DecodeError>;

    /// 修改会话状态或输出汇；失败时不产生部分修改
    fn execute(&self, session: &mut SessionState) -> Result<Followup, RuntimeError>;

    fn tag(&self) -> ActionId {
        Self::ID
    }
}

/// 运行时动作（封闭和类型）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RequestAction {
    PlaySound(PlaySound),
    SetVariable(SetVariable),
    SetZone(SetZone),
    ResetApp(ResetApp),
}

impl RequestAction {
    pub fn tag(&self) -> ActionId {
        match self {
            RequestAction::PlaySound(a) => a.tag(),
            RequestAction::SetVariable(a) => a.tag(),
            RequestAction::SetZone(a) => a.tag(),
            RequestAction::ResetApp(a) => a.tag(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        match self {
            RequestAction::PlaySound(a) => a.encode(),
            RequestAction::SetVariable(a) => a.encode(),
            RequestAction::SetZone(a) => a.encode(),
            RequestAction::ResetApp(a) => a.encode(),
        }
    }

    /// 工厂：按标签解码负载，未注册的标签是解码错误
    pub fn decode(tag: u64, payload: &[u8]) -> Result<Self, DecodeError> {
        match tag {
            t if t == ActionId::PlaySound.as_u64() => PlaySound::decode(payload).map(Self::PlaySound),
            t if t == ActionId::SetVariable.as_u64() => {
                SetVariable::decode(payload).map(Self::SetVariable)
            }
            t if t == ActionId::SetZone.as_u64() => SetZone::decode(payload).map(Self::SetZone),
            t if t == ActionId::ResetApp.as_u64() => ResetApp::decode(payload).map(Self::ResetApp),
            other => Err(DecodeError::UnknownActionId(other)),
        }
    }

    pub fn execute(&self, session: &mut SessionState) -> Result<Followup, RuntimeError> {
        match self {
            RequestAction::PlaySound(a) => a.execute(session),
            RequestAction::SetVariable(a) => a.execute(session),
            RequestAction::SetZone(a) => a.execute(session),
            RequestAction::ResetApp(a) => a.execute(session),
        }
    }
}

/// 按类型分组的动作集合（作者侧 / 编译侧使用，JSON 持久化）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionSet {
    pub play_sounds: Vec<PlaySound>,
    pub set_variables: Vec<SetVariable>,
    pub set_zone: Option<SetZone>,
    pub reset_app: bool,
}

impl ActionSet {
    /// 线性化：全部声音 → 全部变量设置 → 区域切换（若有）→ 重置（若有）
    pub fn iter(&self) -> impl Iterator<Item = RequestAction> + '_ {
        let sounds = self.play_sounds.iter().cloned().map(RequestAction::PlaySound);
        let variables = self
            .set_variables
            .iter()
            .cloned()
            .map(RequestAction::SetVariable);
        let zone = self.set_zone.map(RequestAction::SetZone);
        let reset = self.reset_app.then_some(RequestAction::ResetApp(ResetApp));
        sounds.chain(variables).chain(zone).chain(reset)
    }

    pub fn is_empty(&self) -> bool {
        self.play_sounds.is_empty()
            && self.set_variables.is_empty()
            && self.set_zone.is_none()
            && !self.reset_app
    }

    /// 编码为 action bundle
    pub fn bundle(&self) -> Result<Vec<u8>, EncodeError> {
        let actions: Vec<RequestAction> = self.iter().collect();
        crate::bundle::encode_bundle(&actions)
    }
}
