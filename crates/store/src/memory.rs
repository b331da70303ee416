//! 内存存储后端
//!
//! 快照保存在进程内，仍然走与 SQLite 相同的编解码与校验路径。
//! 克隆出的句柄共享同一份数据，可模拟"重启后重新加载"。

use async_trait::async_trait;
use partix_common::RealmState;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::backend::{StateStore, StoreResult};
use crate::snapshot::Snapshot;

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    snapshots: Arc<Mutex<Vec<Snapshot>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前保存的全部快照（含校验和）
    pub async fn snapshots(&self) -> Vec<Snapshot> {
        self.snapshots.lock().await.clone()
    }

    /// Stores a snapshot as-is, without re-encoding. Used to load externally
    /// produced or deliberately damaged records.
    pub async fn put_raw(&self, snapshot: Snapshot) {
        let mut snapshots = self.snapshots.lock().await;
        match snapshots.iter_mut().find(|s| s.realm == snapshot.realm) {
            Some(slot) => *slot = snapshot,
            None => snapshots.push(snapshot),
        }
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn init(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn load_all(&self) -> StoreResult<Vec<RealmState>> {
        let snapshots = self.snapshots.lock().await;
        snapshots.iter().map(Snapshot::decode).collect()
    }

    async fn save(&self, state: &RealmState) -> StoreResult<()> {
        let snapshot = Snapshot::encode(state)?;
        debug!(realm = %snapshot.realm, revision = snapshot.revision, "Realm state saved in memory");
        self.put_raw(snapshot).await;
        Ok(())
    }

    async fn remove(&self, realm: &str) -> StoreResult<bool> {
        let mut snapshots = self.snapshots.lock().await;
        let before = snapshots.len();
        snapshots.retain(|s| s.realm != realm);
        Ok(snapshots.len() != before)
    }

    async fn clear(&self) -> StoreResult<u64> {
        let mut snapshots = self.snapshots.lock().await;
        let removed = snapshots.len() as u64;
        snapshots.clear();
        Ok(removed)
    }

    fn backend_name(&self) -> &'static str {
        "Memory"
    }
}
