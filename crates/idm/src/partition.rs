//! Partition 管理器
//!
//! 顶层入口：持有存储后端与全部 Realm，按 Realm 分发身份管理器与权限管理器。

use partix_common::{AttributedType, Feature, IdentityStoreConfig, Realm, RealmState};
use partix_store::{RealmStore, StateStore};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::IdmResult;
use crate::identity::IdentityManager;
use crate::permission::PermissionManager;
use crate::registry::RealmRegistry;
use crate::report;

#[derive(Clone, Debug)]
pub struct PartitionManager {
    registry: Arc<RealmRegistry>,
    config: IdentityStoreConfig,
}

impl PartitionManager {
    /// 在 `config.working_directory` 下打开 SQLite 存储
    ///
    /// `preserve_state = false` 时旧数据库文件直接删除，内容损坏也不影响启动。
    ///
    /// # Errors
    /// 保留状态且已有数据无法通过校验时返回 `StoreCorruption`
    pub async fn new(config: IdentityStoreConfig) -> IdmResult<Self> {
        let store = RealmStore::open(&config).await?;
        Self::with_store(config, store).await
    }

    /// 使用任意存储后端构建
    pub async fn with_store<S>(config: IdentityStoreConfig, store: S) -> IdmResult<Self>
    where
        S: StateStore + 'static,
    {
        store.init().await?;

        let states = if config.preserve_state {
            store.load_all().await?
        } else {
            let removed = store.clear().await?;
            if removed > 0 {
                warn!(
                    removed,
                    directory = %config.working_directory().display(),
                    "preserve_state is off, discarded existing realms"
                );
            }
            Vec::new()
        };

        info!(
            "Identity store ready: backend={}, realms={}, preserve_state={}, features={}",
            store.backend_name(),
            states.len(),
            config.preserve_state,
            config.supported_features
        );

        let registry = RealmRegistry::new(
            Arc::new(store),
            config.supported_features.clone(),
            states,
        );
        Ok(Self {
            registry: Arc::new(registry),
            config,
        })
    }

    pub fn config(&self) -> &IdentityStoreConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &'static str {
        self.registry.store().backend_name()
    }

    /// 创建 Realm
    ///
    /// # Errors
    /// 名称已存在时返回 `DuplicateRealm`
    pub async fn create_realm(&self, realm: Realm) -> IdmResult<Realm> {
        self.registry.require(Feature::Realm)?;
        realm.validate()?;

        self.registry
            .insert(RealmState::new(realm.clone()))
            .await?;

        info!(realm = realm.name(), "Realm created");
        Ok(realm)
    }

    pub async fn get_realm(&self, name: &str) -> Option<Realm> {
        self.registry
            .read(name, |state| state.realm.clone())
            .await
            .ok()
    }

    /// 全部 Realm，按创建顺序
    pub async fn realms(&self) -> Vec<Realm> {
        let mut realms = Vec::new();
        for name in self.registry.names().await {
            if let Some(realm) = self.get_realm(&name).await {
                realms.push(realm);
            }
        }
        realms
    }

    /// 写回 Realm 的属性与启用状态；名称不可修改
    pub async fn update_realm(&self, realm: &Realm) -> IdmResult<()> {
        self.registry.require(Feature::Realm)?;
        let registry = &self.registry;
        registry
            .mutate(realm.name(), |state| {
                if state.realm.attributes() != realm.attributes() {
                    registry.require(Feature::Attribute)?;
                }
                let before = state.realm.clone();
                *state.realm.attributes_mut() = realm.attributes().clone();
                state.realm.set_enabled(realm.is_enabled());
                if state.realm != before {
                    state.realm.touch();
                }
                Ok(())
            })
            .await
    }

    /// 删除 Realm 及其全部数据，返回是否存在
    pub async fn remove_realm(&self, name: &str) -> IdmResult<bool> {
        self.registry.require(Feature::Realm)?;
        let removed = self.registry.remove(name).await?;
        if removed {
            info!(realm = name, "Realm removed");
        }
        Ok(removed)
    }

    pub fn identity_manager(&self, realm: &Realm) -> IdentityManager {
        IdentityManager::new(self.registry.clone(), realm.name().to_string())
    }

    pub fn permission_manager(&self, realm: &Realm) -> PermissionManager {
        PermissionManager::new(self.registry.clone(), realm.name().to_string())
    }

    /// 当前 Realm 状态的完整副本
    pub async fn snapshot(&self, name: &str) -> Option<RealmState> {
        self.registry.read(name, RealmState::clone).await.ok()
    }

    /// 人类可读的 Realm 内容
    pub async fn describe(&self, name: &str) -> Option<String> {
        self.registry.read(name, report::describe).await.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IdmError;
    use crate::test_utils::memory_manager;
    use partix_common::{FeatureSet, Group, Role};
    use partix_store::MemoryStore;

    #[tokio::test]
    async fn test_duplicate_realm() {
        let (manager, _, _) = memory_manager().await;
        let err = manager.create_realm(Realm::new("AMS")).await.unwrap_err();
        assert!(matches!(err, IdmError::DuplicateRealm(name) if name == "AMS"));
    }

    #[tokio::test]
    async fn test_realms_in_creation_order() {
        let (manager, _, _) = memory_manager().await;
        manager.create_realm(Realm::new("B")).await.unwrap();
        manager.create_realm(Realm::new("A")).await.unwrap();

        let names: Vec<String> = manager
            .realms()
            .await
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(names, vec!["AMS", "B", "A"]);
        assert!(manager.get_realm("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_update_realm_attributes() {
        let (manager, store, realm) = memory_manager().await;

        let mut fetched = manager.get_realm("AMS").await.unwrap();
        fetched.set_attribute("realmAttributeName", "realmAttributeValue");
        fetched.set_enabled(false);
        manager.update_realm(&fetched).await.unwrap();

        let stored = manager.get_realm("AMS").await.unwrap();
        assert!(!stored.is_enabled());
        assert_eq!(stored.created_at(), realm.created_at());
        assert_eq!(
            stored.get_attribute("realmAttributeName").map(|a| a.value.to_string()),
            Some("realmAttributeValue".to_string())
        );

        let reloaded = store.load_all().await.unwrap();
        assert_eq!(reloaded[0].realm, stored);

        let err = manager.update_realm(&Realm::new("missing")).await.unwrap_err();
        assert!(matches!(err, IdmError::RealmNotFound(_)));
    }

    #[tokio::test]
    async fn test_update_realm_attributes_need_feature() {
        let config = IdentityStoreConfig::default()
            .with_features(FeatureSet::empty().with(Feature::Realm).with(Feature::Identity));
        let manager = PartitionManager::with_store(config, MemoryStore::new())
            .await
            .unwrap();
        manager.create_realm(Realm::new("AMS")).await.unwrap();

        let mut fetched = manager.get_realm("AMS").await.unwrap();
        fetched.set_enabled(false);
        manager.update_realm(&fetched).await.unwrap();
        assert!(!manager.get_realm("AMS").await.unwrap().is_enabled());

        fetched.set_attribute("realmAttributeName", "realmAttributeValue");
        let err = manager.update_realm(&fetched).await.unwrap_err();
        assert!(matches!(err, IdmError::UnsupportedFeature(Feature::Attribute)));
        assert!(manager
            .get_realm("AMS")
            .await
            .unwrap()
            .get_attribute("realmAttributeName")
            .is_none());
    }

    #[tokio::test]
    async fn test_remove_realm() {
        let (manager, store, realm) = memory_manager().await;
        let identities = manager.identity_manager(&realm);
        identities.add(&Role::new("Beteiligter")).await.unwrap();

        assert!(manager.remove_realm("AMS").await.unwrap());
        assert!(!manager.remove_realm("AMS").await.unwrap());
        assert!(store.snapshots().await.is_empty());
        assert!(matches!(
            identities.get_role("Beteiligter").await,
            Err(IdmError::RealmNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unsupported_feature() {
        let store = MemoryStore::new();
        let config = IdentityStoreConfig::default()
            .with_features(FeatureSet::empty().with(Feature::Realm).with(Feature::Identity));
        let manager = PartitionManager::with_store(config, store).await.unwrap();
        let realm = manager.create_realm(Realm::new("AMS")).await.unwrap();

        let group = Group::new("Berlin");
        manager.identity_manager(&realm).add(&group).await.unwrap();

        let err = manager
            .permission_manager(&realm)
            .grant(&group, "Stammdaten", "read")
            .await
            .unwrap_err();
        assert!(matches!(err, IdmError::UnsupportedFeature(Feature::Permission)));

        let err = manager
            .identity_manager(&realm)
            .set_attribute(&group, "a", "b")
            .await
            .unwrap_err();
        assert!(matches!(err, IdmError::UnsupportedFeature(Feature::Attribute)));
    }

    #[tokio::test]
    async fn test_reload_from_shared_store() {
        let (manager, store, realm) = memory_manager().await;
        let berlin = Group::new("Berlin");
        manager.identity_manager(&realm).add(&berlin).await.unwrap();
        manager
            .permission_manager(&realm)
            .grant(&berlin, "Stammdaten", "read")
            .await
            .unwrap();
        let before = manager.snapshot("AMS").await.unwrap();

        let reopened = PartitionManager::with_store(IdentityStoreConfig::default(), store.clone())
            .await
            .unwrap();
        assert_eq!(reopened.snapshot("AMS").await.unwrap(), before);

        let wiped = PartitionManager::with_store(
            IdentityStoreConfig::default().with_preserve_state(false),
            store.clone(),
        )
        .await
        .unwrap();
        assert!(wiped.realms().await.is_empty());
        assert!(store.snapshots().await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_store_fails_startup() {
        let (_, store, _) = memory_manager().await;
        let mut snapshot = store.snapshots().await.remove(0);
        snapshot.body.push('}');
        store.put_raw(snapshot).await;

        let err = PartitionManager::with_store(IdentityStoreConfig::default(), store)
            .await
            .unwrap_err();
        assert!(matches!(err, IdmError::StoreCorruption { .. }));
    }
}
