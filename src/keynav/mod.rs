//! 键导航：为编译产物生成确定性的键值存储键
//!
//! 所有数据常驻内存，键尽量短。基本模式：
//!
//! ```text
//! c:v<N>:<published_id>:e:<entity_kind>:<entity_id>
//! ```
//!
//! - `c:v<N>`：编译数据命名空间与版本
//! - `e`：实体；`m`：元数据（`m:s` 发布后不变，`m:d` 可变）
//! - 子实体按同样的 `:e:<kind>:<id>` 段继续追加
//!
//! 全部函数纯、无副作用。

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 实体类型编号（键中的 entity_kind）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Actor,
    Zone,
    Trigger,
    DialogNode,
    ActionBundle,
}

impl EntityKind {
    pub fn id(self) -> u8 {
        match self {
            EntityKind::Actor => 0,
            EntityKind::Zone => 1,
            EntityKind::Trigger => 2,
            EntityKind::DialogNode => 3,
            EntityKind::ActionBundle => 4,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// 区域触发器类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerType {
    InitializeZone,
    EnterZone,
    ExitZone,
    VariableUpdate,
}

impl TriggerType {
    pub fn id(self) -> u8 {
        match self {
            TriggerType::InitializeZone => 0,
            TriggerType::EnterZone => 1,
            TriggerType::ExitZone => 2,
            TriggerType::VariableUpdate => 3,
        }
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// 键生成器，持有命名空间版本
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyNav {
    namespace: String,
}

impl Default for KeyNav {
    fn default() -> Self {
        Self::new(1)
    }
}

impl KeyNav {
    pub fn new(version: u32) -> Self {
        Self {
            namespace: format!("c:v{version}"),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// 标准实体键：`<ns>:<pub>:e:<kind>:<id>`
    pub fn entity(&self, pub_id: Uuid, kind: EntityKind, id: Uuid) -> String {
        format!("{}:{}:e:{}:{}", self.namespace, pub_id, kind, id)
    }

    /// 演员内的对话根节点（不带节点 ID，根节点列表不单独维护）
    pub fn dialog_root_within_actor(&self, pub_id: Uuid, actor_id: Uuid) -> String {
        format!(
            "{}:e:{}:i",
            self.entity(pub_id, EntityKind::Actor, actor_id),
            EntityKind::DialogNode
        )
    }

    /// 演员内某个父对话节点之后的子节点
    pub fn dialog_node_within_actor(&self, pub_id: Uuid, actor_id: Uuid, parent_dialog_id: Uuid) -> String {
        format!(
            "{}:e:{}:{}:i",
            self.entity(pub_id, EntityKind::Actor, actor_id),
            EntityKind::DialogNode,
            parent_dialog_id
        )
    }

    /// 区域内演员集合
    pub fn actors_within_zone(&self, pub_id: Uuid, zone_id: Uuid) -> String {
        format!(
            "{}:e:{}",
            self.entity(pub_id, EntityKind::Zone, zone_id),
            EntityKind::Actor
        )
    }

    /// 项目内区域集合
    pub fn zones_within_project(&self, pub_id: Uuid) -> String {
        format!("{}:{}:e:{}", self.namespace, pub_id, EntityKind::Zone)
    }

    /// 对话节点内的 action bundle
    pub fn dialog_node_action_bundle(&self, pub_id: Uuid, dialog_id: Uuid, bundle_id: Uuid) -> String {
        format!(
            "{}:e:{}:{}",
            self.entity(pub_id, EntityKind::DialogNode, dialog_id),
            EntityKind::ActionBundle,
            bundle_id
        )
    }

    /// 区域触发器内的 action bundle
    pub fn trigger_action_bundle(
        &self,
        pub_id: Uuid,
        zone_id: Uuid,
        trigger: TriggerType,
        bundle_id: Uuid,
    ) -> String {
        format!(
            "{}:e:{}:{}:e:{}:{}",
            self.entity(pub_id, EntityKind::Zone, zone_id),
            EntityKind::Trigger,
            trigger,
            EntityKind::ActionBundle,
            bundle_id
        )
    }

    /// 区域内全部触发器的 hash（字段为触发器类型，值为其编译逻辑块的键）
    pub fn triggers_within_zone(&self, pub_id: Uuid, zone_id: Uuid) -> String {
        format!(
            "{}:e:{}",
            self.entity(pub_id, EntityKind::Zone, zone_id),
            EntityKind::Trigger
        )
    }

    /// 静态元数据 hash（发布后不再修改）
    pub fn project_metadata_static(&self, pub_id: Uuid) -> String {
        format!("{}:{}:m:s", self.namespace, pub_id)
    }

    pub fn project_metadata_static_property(&self, pub_id: Uuid, property: &str) -> String {
        format!("{}:{}", self.project_metadata_static(pub_id), property)
    }

    /// 动态元数据 hash（发布后可更新）
    pub fn project_metadata_dynamic(&self, pub_id: Uuid) -> String {
        format!("{}:{}:m:d", self.namespace, pub_id)
    }

    pub fn project_metadata_dynamic_property(&self, pub_id: Uuid, property: &str) -> String {
        format!("{}:{}", self.project_metadata_dynamic(pub_id), property)
    }

    /// 全部上线项目
    pub fn global_live_projects(&self) -> String {
        format!("{}:live:projects", self.namespace)
    }
}
