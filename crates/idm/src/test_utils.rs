//! 测试工具

use partix_common::{IdentityStoreConfig, Realm};
use partix_store::MemoryStore;

use crate::partition::PartitionManager;

/// 基于内存存储的管理器，已创建 Realm `AMS`
pub(crate) async fn memory_manager() -> (PartitionManager, MemoryStore, Realm) {
    let store = MemoryStore::new();
    let manager = PartitionManager::with_store(IdentityStoreConfig::default(), store.clone())
        .await
        .expect("memory store never fails to open");
    let realm = manager
        .create_realm(Realm::new("AMS"))
        .await
        .expect("fresh manager has no realms");
    (manager, store, realm)
}
