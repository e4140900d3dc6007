//! 会话状态
//!
//! MutableState 是可序列化的部分（当前区域、项目、对话指针、区域成员、初始化标记、变量），
//! SessionState 在其上附加输出汇。一个请求内由求值流程独占，通过 &mut 传递。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::RuntimeError;
use crate::session::Variable;
use crate::ssml::{OutputSink, SsmlBuilder};

/// 可序列化的会话状态（可快照为 JSON 写入事件日志）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MutableState {
    /// 当前区域
    pub zone: Option<Uuid>,
    /// 所属的已发布项目
    pub project_id: Uuid,
    /// 当前对话节点的键；进入区域时清空
    pub current_dialog: Option<String>,
    /// 区域 -> 演员 ID 列表
    pub zone_actors: HashMap<Uuid, Vec<Uuid>>,
    /// 区域 -> 是否已初始化（区域初始化触发器只执行一次）
    pub zones_initialized: HashMap<Uuid, bool>,
    /// 变量名 -> 类型化变量
    pub variables: HashMap<String, Variable>,
}

impl MutableState {
    pub fn new(project_id: Uuid) -> Self {
        Self {
            project_id,
            ..Self::default()
        }
    }

    pub fn variable(&self, name: &str) -> Result<&Variable, RuntimeError> {
        self.variables
            .get(name)
            .ok_or_else(|| RuntimeError::MissingVariable(name.to_string()))
    }

    pub fn declare(&mut self, name: impl Into<String>, value: Variable) {
        self.variables.insert(name.into(), value);
    }

    pub fn is_zone_initialized(&self, zone: Uuid) -> bool {
        self.zones_initialized.get(&zone).copied().unwrap_or(false)
    }

    /// 进入区域：总是更新当前区域并清空对话指针；
    /// 若区域尚未初始化则标记为已初始化并返回 true（调用方需执行初始化触发器）
    pub fn enter_zone(&mut self, zone: Uuid) -> bool {
        self.zone = Some(zone);
        self.current_dialog = None;
        if self.is_zone_initialized(zone) {
            return false;
        }
        self.zones_initialized.insert(zone, true);
        true
    }

    /// 初始化失败时回滚标记，下次进入会重新查找触发器
    pub fn mark_zone_uninitialized(&mut self, zone: Uuid) {
        self.zones_initialized.insert(zone, false);
    }

    /// 清空区域成员与初始化标记（重置应用）
    pub fn clear_zone_tracking(&mut self) {
        self.zone_actors.clear();
        self.zones_initialized.clear();
    }
}

/// 单个请求的会话状态：可变状态 + 输出汇
#[derive(Debug)]
pub struct SessionState {
    pub state: MutableState,
    pub output: Box<dyn OutputSink>,
}

impl SessionState {
    /// 以默认的 SSML 输出汇创建
    pub fn new(project_id: Uuid) -> Self {
        Self::with_output(MutableState::new(project_id), Box::new(SsmlBuilder::new()))
    }

    pub fn with_output(state: MutableState, output: Box<dyn OutputSink>) -> Self {
        Self { state, output }
    }

    pub fn render_output(&self) -> String {
        self.output.render()
    }

    /// JSON 快照（用于状态变更事件）
    pub fn snapshot_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.state)
    }
}
