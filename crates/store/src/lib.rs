//! partix 持久化后端
//!
//! 以 Realm 为单位整体读写快照。
//!
//! # 设计
//!
//! - `StateStore` trait 定义统一的异步接口
//! - `RealmStore` enum 封装内置的后端实现
//! - 每个 Realm 一条记录：JSON 正文 + SHA-256 校验和 + 修订号
//!
//! 加载时校验和不符、JSON 无法解析或结构校验失败都视为存储损坏，
//! 直接返回 `StorageError::Corruption`，不做部分恢复。

pub mod backend;
pub mod memory;
pub mod snapshot;
pub mod sqlite;

use partix_common::{IdentityStoreConfig, RealmState};

pub use backend::{StateStore, StoreResult};
pub use memory::MemoryStore;
pub use snapshot::Snapshot;
pub use sqlite::SqliteStore;

/// 内置存储后端
#[derive(Clone, Debug)]
pub enum RealmStore {
    /// SQLite 文件存储
    Sqlite(Box<SqliteStore>),

    /// 进程内存储，不落盘
    Memory(MemoryStore),
}

impl RealmStore {
    /// 在 `config.working_directory` 下打开 SQLite 存储
    ///
    /// `preserve_state = false` 时先删除旧数据库文件，不读取其内容。
    pub async fn open(config: &IdentityStoreConfig) -> StoreResult<Self> {
        if !config.preserve_state {
            SqliteStore::discard(config.working_directory()).await?;
        }
        let store = SqliteStore::open(config.working_directory()).await?;
        Ok(Self::Sqlite(Box::new(store)))
    }

    pub fn memory() -> Self {
        Self::Memory(MemoryStore::new())
    }
}

#[async_trait::async_trait]
impl StateStore for RealmStore {
    async fn init(&self) -> StoreResult<()> {
        match self {
            Self::Sqlite(s) => s.init().await,
            Self::Memory(s) => s.init().await,
        }
    }

    async fn load_all(&self) -> StoreResult<Vec<RealmState>> {
        match self {
            Self::Sqlite(s) => s.load_all().await,
            Self::Memory(s) => s.load_all().await,
        }
    }

    async fn save(&self, state: &RealmState) -> StoreResult<()> {
        match self {
            Self::Sqlite(s) => s.save(state).await,
            Self::Memory(s) => s.save(state).await,
        }
    }

    async fn remove(&self, realm: &str) -> StoreResult<bool> {
        match self {
            Self::Sqlite(s) => s.remove(realm).await,
            Self::Memory(s) => s.remove(realm).await,
        }
    }

    async fn clear(&self) -> StoreResult<u64> {
        match self {
            Self::Sqlite(s) => s.clear().await,
            Self::Memory(s) => s.clear().await,
        }
    }

    fn backend_name(&self) -> &'static str {
        match self {
            Self::Sqlite(s) => s.backend_name(),
            Self::Memory(s) => s.backend_name(),
        }
    }
}

impl From<MemoryStore> for RealmStore {
    fn from(value: MemoryStore) -> Self {
        Self::Memory(value)
    }
}
