//! 键值存储抽象层
//!
//! 运行时只需要三种读操作：字节值 `get`、hash 字段 `hget`、集合成员 `smembers`。
//! 生产环境对接远程存储；MemoryStore 供测试与本地调试使用。

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::core::StoreError;

/// 键值存储接口
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// 读取字节值；键不存在返回 None
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// 读取 hash 字段；键或字段不存在返回 None
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, StoreError>;

    /// 读取集合成员；键不存在返回空
    async fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError>;
}

#[derive(Debug, Clone)]
enum Entry {
    Bytes(Vec<u8>),
    Hash(HashMap<String, String>),
    Set(BTreeSet<String>),
}

impl Entry {
    fn kind(&self) -> &'static str {
        match self {
            Entry::Bytes(_) => "bytes",
            Entry::Hash(_) => "hash",
            Entry::Set(_) => "set",
        }
    }
}

/// 内存存储
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
    unavailable: AtomicBool,
}

fn wrong_type(key: &str, expected: &str, found: &Entry) -> StoreError {
    StoreError::WrongType(format!("{key}: expected {expected}, found {}", found.kind()))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.entries
            .write()
            .await
            .insert(key.into(), Entry::Bytes(value.into()));
    }

    /// 写入 hash 字段；键已存在且不是 hash 时覆盖
    pub async fn hset(&self, key: impl Into<String>, field: impl Into<String>, value: impl Into<String>) {
        let mut entries = self.entries.write().await;
        let entry = entries
            .entry(key.into())
            .or_insert_with(|| Entry::Hash(HashMap::new()));
        if !matches!(entry, Entry::Hash(_)) {
            *entry = Entry::Hash(HashMap::new());
        }
        if let Entry::Hash(map) = entry {
            map.insert(field.into(), value.into());
        }
    }

    /// 向集合添加成员；键已存在且不是集合时覆盖
    pub async fn sadd(&self, key: impl Into<String>, member: impl Into<String>) {
        let mut entries = self.entries.write().await;
        let entry = entries
            .entry(key.into())
            .or_insert_with(|| Entry::Set(BTreeSet::new()));
        if !matches!(entry, Entry::Set(_)) {
            *entry = Entry::Set(BTreeSet::new());
        }
        if let Entry::Set(set) = entry {
            set.insert(member.into());
        }
    }

    /// 模拟存储不可用：之后所有读操作返回 StoreError::Unavailable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store marked unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.check_available()?;
        match self.entries.read().await.get(key) {
            None => Ok(None),
            Some(Entry::Bytes(bytes)) => Ok(Some(bytes.clone())),
            Some(other) => Err(wrong_type(key, "bytes", other)),
        }
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        self.check_available()?;
        match self.entries.read().await.get(key) {
            None => Ok(None),
            Some(Entry::Hash(map)) => Ok(map.get(field).cloned()),
            Some(other) => Err(wrong_type(key, "hash", other)),
        }
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError> {
        self.check_available()?;
        match self.entries.read().await.get(key) {
            None => Ok(Vec::new()),
            Some(Entry::Set(set)) => Ok(set.iter().cloned().collect()),
            Some(other) => Err(wrong_type(key, "set", other)),
        }
    }
}
