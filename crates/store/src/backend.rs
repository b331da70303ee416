//! 存储后端抽象接口

use async_trait::async_trait;
use partix_common::{RealmState, StorageError};
use std::fmt::Debug;

pub type StoreResult<T> = Result<T, StorageError>;

/// Realm 状态存储后端
///
/// 所有后端都以整个 `RealmState` 为单位读写；`save` 必须是原子的，
/// 返回前数据已落到稳定存储。
#[async_trait]
pub trait StateStore: Send + Sync + Debug {
    /// 初始化存储后端（建表等），可重复调用
    async fn init(&self) -> StoreResult<()>;

    /// 加载全部 Realm，按首次保存顺序
    ///
    /// # Errors
    /// 任一快照无法校验时返回 `StorageError::Corruption`
    async fn load_all(&self) -> StoreResult<Vec<RealmState>>;

    /// 写入（覆盖）一个 Realm 的完整状态
    async fn save(&self, state: &RealmState) -> StoreResult<()>;

    /// 删除一个 Realm，返回是否存在
    async fn remove(&self, realm: &str) -> StoreResult<bool>;

    /// 删除全部数据，返回删除的 Realm 数
    async fn clear(&self) -> StoreResult<u64>;

    fn backend_name(&self) -> &'static str;
}
