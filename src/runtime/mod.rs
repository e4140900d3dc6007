//! 求值运行时：bundle 执行、区域切换、应用重置、逻辑块驱动
//!
//! 动作本身只修改会话状态，需要访问键值存储的后续工作（区域初始化触发器、重置时重建成员）
//! 通过 Followup 交回 Runtime 完成。嵌套链路
//! bundle → SetZone → 初始化触发器 → 逻辑块 → bundle … 受 `max_nesting_depth` 限制。
//! 存储调用严格顺序 await，同一会话同一时刻只有一次求值。

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::actions::{ActionSet, Followup};
use crate::bundle::BundleReader;
use crate::config::RuntimeSection;
use crate::core::{DecodeError, RuntimeError};
use crate::keynav::{KeyNav, TriggerType};
use crate::logic::{LogicEvaluator, Resume, Step};
use crate::session::{SessionState, Variable};
use crate::store::KeyValueStore;

fn parse_id(raw: &str) -> Result<Uuid, DecodeError> {
    Uuid::parse_str(raw).map_err(|_| DecodeError::InvalidId(raw.to_string()))
}

pub struct Runtime {
    store: Arc<dyn KeyValueStore>,
    keys: KeyNav,
    max_nesting_depth: usize,
    start_zone_field: String,
}

impl Runtime {
    pub fn new(store: Arc<dyn KeyValueStore>, config: &RuntimeSection) -> Self {
        Self {
            store,
            keys: KeyNav::new(config.namespace_version),
            max_nesting_depth: config.max_nesting_depth,
            start_zone_field: config.start_zone_field.clone(),
        }
    }

    pub fn keys(&self) -> &KeyNav {
        &self.keys
    }

    /// 新会话：先声明初始变量，再做一次应用重置（建立区域成员并进入起始区域）
    ///
    /// 起始区域的初始化触发器在返回前已经执行，它引用的变量必须出现在 `variables` 中。
    pub async fn start_session(
        &self,
        project_id: Uuid,
        variables: HashMap<String, Variable>,
    ) -> Result<SessionState, RuntimeError> {
        let mut session = SessionState::new(project_id);
        for (name, value) in variables {
            session.state.declare(name, value);
        }
        self.reset_app(&mut session).await?;
        info!(%project_id, zone = ?session.state.zone, "session started");
        Ok(session)
    }

    /// 顺序执行 bundle 中的记录；出错时已执行记录的效果保留
    pub async fn evaluate_bundle(
        &self,
        session: &mut SessionState,
        bundle: &[u8],
    ) -> Result<(), RuntimeError> {
        let cancel = CancellationToken::new();
        self.evaluate_bundle_at(session, bundle, 0, &cancel).await
    }

    /// 线性化 ActionSet 后执行
    pub async fn evaluate_actions(
        &self,
        session: &mut SessionState,
        actions: &ActionSet,
    ) -> Result<(), RuntimeError> {
        let bundle = actions.bundle()?;
        self.evaluate_bundle(session, &bundle).await
    }

    /// 驱动一个编译逻辑块，对每个产出的键取出 bundle 并执行
    pub async fn run_logic(
        &self,
        session: &mut SessionState,
        block: &[u8],
        cancel: &CancellationToken,
    ) -> Result<(), RuntimeError> {
        self.run_logic_at(session, block, 0, cancel).await
    }

    /// 按键读取逻辑块后驱动；键不存在为 MissingKey
    pub async fn run_logic_at_key(
        &self,
        session: &mut SessionState,
        key: &str,
        cancel: &CancellationToken,
    ) -> Result<(), RuntimeError> {
        let block = self.fetch(key).await?;
        self.run_logic_at(session, &block, 0, cancel).await
    }

    /// 进入区域；仅首次进入时执行初始化触发器
    pub async fn enter_zone(&self, session: &mut SessionState, zone: Uuid) -> Result<(), RuntimeError> {
        if !session.state.enter_zone(zone) {
            debug!(%zone, "zone already initialized");
            return Ok(());
        }
        let cancel = CancellationToken::new();
        self.initialize_zone_at(session, zone, 0, &cancel).await
    }

    /// 重置应用：重建区域成员并重新进入起始区域
    pub async fn reset_app(&self, session: &mut SessionState) -> Result<(), RuntimeError> {
        let cancel = CancellationToken::new();
        self.reset_at(session, 0, &cancel).await
    }

    fn check_depth(&self, depth: usize) -> Result<(), RuntimeError> {
        if depth > self.max_nesting_depth {
            warn!(depth, max = self.max_nesting_depth, "nesting limit exceeded");
            return Err(RuntimeError::NestingLimitExceeded(depth));
        }
        Ok(())
    }

    async fn fetch(&self, key: &str) -> Result<Vec<u8>, RuntimeError> {
        self.store
            .get(key)
            .await?
            .ok_or_else(|| RuntimeError::MissingKey(key.to_string()))
    }

    fn evaluate_bundle_at<'a>(
        &'a self,
        session: &'a mut SessionState,
        bundle: &'a [u8],
        depth: usize,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<(), RuntimeError>> {
        async move {
            self.check_depth(depth)?;
            let mut reader = BundleReader::new(bundle);
            loop {
                let offset = reader.offset();
                let Some(record) = reader.next() else {
                    break;
                };
                let action = record.inspect_err(|e| warn!(offset, error = %e, "bundle record rejected"))?;
                debug!(offset, tag = ?action.tag(), depth, "executing action");
                match action.execute(session)? {
                    Followup::None => {}
                    Followup::InitializeZone(zone) => {
                        self.initialize_zone_at(session, zone, depth + 1, cancel).await?
                    }
                    Followup::ResetApp => self.reset_at(session, depth + 1, cancel).await?,
                }
            }
            Ok(())
        }
        .boxed()
    }

    /// 执行区域初始化触发器；存储侧失败时回滚初始化标记
    fn initialize_zone_at<'a>(
        &'a self,
        session: &'a mut SessionState,
        zone: Uuid,
        depth: usize,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<(), RuntimeError>> {
        async move {
            let result = self.run_zone_trigger(session, zone, depth, cancel).await;
            if let Err(e) = &result {
                if e.is_store_failure() {
                    warn!(%zone, error = %e, "zone initialization failed, zone flagged uninitialized");
                    session.state.mark_zone_uninitialized(zone);
                }
            }
            result
        }
        .boxed()
    }

    async fn run_zone_trigger(
        &self,
        session: &mut SessionState,
        zone: Uuid,
        depth: usize,
        cancel: &CancellationToken,
    ) -> Result<(), RuntimeError> {
        let triggers = self.keys.triggers_within_zone(session.state.project_id, zone);
        let field = TriggerType::InitializeZone.to_string();
        let Some(logic_key) = self.store.hget(&triggers, &field).await? else {
            debug!(%zone, "zone has no initialize trigger");
            return Ok(());
        };
        info!(%zone, key = %logic_key, "initializing zone");
        let block = self.fetch(&logic_key).await?;
        self.run_logic_at(session, &block, depth, cancel).await
    }

    fn reset_at<'a>(
        &'a self,
        session: &'a mut SessionState,
        depth: usize,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<(), RuntimeError>> {
        async move {
            self.check_depth(depth)?;
            let project = session.state.project_id;
            session.state.clear_zone_tracking();
            session.state.zone_actors = self.load_zone_membership(project).await?;

            let metadata = self.keys.project_metadata_static(project);
            let Some(start) = self.store.hget(&metadata, &self.start_zone_field).await? else {
                warn!(%project, field = %self.start_zone_field, "project has no start zone, keeping current zone");
                return Ok(());
            };
            let zone = parse_id(&start)?;
            info!(%project, %zone, "application reset");
            if session.state.enter_zone(zone) {
                self.initialize_zone_at(session, zone, depth, cancel).await?;
            }
            Ok(())
        }
        .boxed()
    }

    /// 读取项目全部区域的演员成员；任一读取失败则整体失败
    async fn load_zone_membership(&self, project: Uuid) -> Result<HashMap<Uuid, Vec<Uuid>>, RuntimeError> {
        let mut membership = HashMap::new();
        for raw_zone in self.store.smembers(&self.keys.zones_within_project(project)).await? {
            let zone = parse_id(&raw_zone)?;
            let actors = self
                .store
                .smembers(&self.keys.actors_within_zone(project, zone))
                .await?
                .iter()
                .map(|a| parse_id(a))
                .collect::<Result<Vec<_>, _>>()?;
            membership.insert(zone, actors);
        }
        debug!(%project, zones = membership.len(), "zone membership loaded");
        Ok(membership)
    }

    fn run_logic_at<'a>(
        &'a self,
        session: &'a mut SessionState,
        block: &'a [u8],
        depth: usize,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<(), RuntimeError>> {
        async move {
            self.check_depth(depth)?;
            let mut evaluator = LogicEvaluator::new(block);
            let result = self.drive(&mut evaluator, session, depth, cancel).await;
            if result.is_err() {
                evaluator.cancel();
            }
            result
        }
        .boxed()
    }

    async fn drive(
        &self,
        evaluator: &mut LogicEvaluator<'_>,
        session: &mut SessionState,
        depth: usize,
        cancel: &CancellationToken,
    ) -> Result<(), RuntimeError> {
        let mut step = evaluator.resume(Resume::Start)?;
        loop {
            if cancel.is_cancelled() {
                return Err(RuntimeError::Cancelled);
            }
            step = match step {
                Step::Key(key) => {
                    if !key.is_empty() {
                        let bundle = self.fetch(&key).await?;
                        self.evaluate_bundle_at(session, &bundle, depth, cancel).await?;
                    }
                    evaluator.resume(Resume::Continue)?
                }
                Step::NeedState => evaluator.resume(Resume::State(&session.state))?,
                Step::Done => return Ok(()),
            };
        }
    }
}
