//! Realm 注册表
//!
//! 每个 Realm 一把 `RwLock<RealmState>`。写操作在克隆上修改，持久化成功后
//! 才替换内存状态：被拒绝的请求或写盘失败都不会留下部分修改。

use partix_common::{Feature, FeatureSet, RealmState};
use partix_store::StateStore;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{IdmError, IdmResult};

type RealmCell = Arc<RwLock<RealmState>>;

#[derive(Debug)]
pub(crate) struct RealmRegistry {
    store: Arc<dyn StateStore>,
    features: FeatureSet,
    /// Creation order.
    realms: RwLock<Vec<(String, RealmCell)>>,
}

impl RealmRegistry {
    pub(crate) fn new(
        store: Arc<dyn StateStore>,
        features: FeatureSet,
        states: Vec<RealmState>,
    ) -> Self {
        let realms = states
            .into_iter()
            .map(|s| (s.name().to_string(), Arc::new(RwLock::new(s))))
            .collect();
        Self {
            store,
            features,
            realms: RwLock::new(realms),
        }
    }

    pub(crate) fn store(&self) -> &dyn StateStore {
        self.store.as_ref()
    }

    pub(crate) fn require(&self, feature: Feature) -> IdmResult<()> {
        if self.features.supports(feature) {
            Ok(())
        } else {
            warn!(%feature, "Rejected call to unsupported feature");
            Err(IdmError::UnsupportedFeature(feature))
        }
    }

    async fn cell(&self, realm: &str) -> IdmResult<RealmCell> {
        self.realms
            .read()
            .await
            .iter()
            .find(|(name, _)| name == realm)
            .map(|(_, cell)| cell.clone())
            .ok_or_else(|| IdmError::RealmNotFound(realm.to_string()))
    }

    pub(crate) async fn names(&self) -> Vec<String> {
        self.realms
            .read()
            .await
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Runs `f` under the realm's shared lock.
    pub(crate) async fn read<F, R>(&self, realm: &str, f: F) -> IdmResult<R>
    where
        F: FnOnce(&RealmState) -> R + Send,
        R: Send,
    {
        let cell = self.cell(realm).await?;
        let state = cell.read().await;
        Ok(f(&state))
    }

    /// Applies `f` to a copy of the realm state and publishes the copy once it is
    /// persisted. An unchanged copy is neither persisted nor given a new revision.
    pub(crate) async fn mutate<F, R>(&self, realm: &str, f: F) -> IdmResult<R>
    where
        F: FnOnce(&mut RealmState) -> IdmResult<R> + Send,
        R: Send,
    {
        let cell = self.cell(realm).await?;
        let mut state = cell.write().await;

        let mut next = state.clone();
        let out = f(&mut next)?;
        if next == *state {
            debug!(realm, "Mutation left realm unchanged");
            return Ok(out);
        }

        next.revision += 1;
        self.store.save(&next).await?;
        debug!(realm, revision = next.revision, "Realm state committed");
        *state = next;
        Ok(out)
    }

    /// Persists a new realm and registers it. Fails if the name is taken.
    pub(crate) async fn insert(&self, state: RealmState) -> IdmResult<()> {
        let mut realms = self.realms.write().await;
        if realms.iter().any(|(name, _)| name == state.name()) {
            return Err(IdmError::DuplicateRealm(state.name().to_string()));
        }
        self.store.save(&state).await?;
        realms.push((state.name().to_string(), Arc::new(RwLock::new(state))));
        Ok(())
    }

    pub(crate) async fn remove(&self, realm: &str) -> IdmResult<bool> {
        let mut realms = self.realms.write().await;
        let Some(index) = realms.iter().position(|(name, _)| name == realm) else {
            return Ok(false);
        };
        // hold the realm's write lock so in-flight mutations finish first
        let cell = realms[index].1.clone();
        let _guard = cell.write().await;
        self.store.remove(realm).await?;
        realms.remove(index);
        Ok(true)
    }
}
