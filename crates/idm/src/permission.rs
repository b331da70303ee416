//! Realm 作用域的权限管理器
//!
//! 权限检查只看直接授予：角色上的授予不会传递给持有该角色的用户或组，
//! 组上的授予也不会展开到子组。

use partix_common::{Feature, IdentityType, Operations, Permission, permission::validate_resource};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{IdmError, IdmResult};
use crate::registry::RealmRegistry;

#[derive(Clone, Debug)]
pub struct PermissionManager {
    registry: Arc<RealmRegistry>,
    realm: String,
}

impl PermissionManager {
    pub(crate) fn new(registry: Arc<RealmRegistry>, realm: String) -> Self {
        Self { registry, realm }
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// 授予权限，`operations` 可为 `"create,read"` 或字符串列表
    ///
    /// Either every requested operation is recorded or none is. Returns the number
    /// of new records; already granted triples are skipped.
    pub async fn grant<A: IdentityType>(
        &self,
        assignee: &A,
        resource: &str,
        operations: impl Into<Operations>,
    ) -> IdmResult<usize> {
        self.registry.require(Feature::Permission)?;
        validate_resource(resource)?;
        let operations = operations.into().normalize()?;
        let target = assignee.identity_ref();

        let added = self
            .registry
            .mutate(&self.realm, |state| {
                if !state.contains(target) {
                    return Err(IdmError::invalid_reference(
                        &self.realm,
                        format!("assignee {} ({target}) is not in this realm", assignee.key()),
                    ));
                }
                let mut added = 0;
                for operation in &operations {
                    let permission = Permission::new(target, resource, operation.as_str());
                    if !state.permissions.contains(&permission) {
                        state.permissions.push(permission);
                        added += 1;
                    }
                }
                Ok(added)
            })
            .await?;

        info!(
            realm = %self.realm,
            assignee = assignee.key(),
            resource,
            operations = %operations.join(","),
            added,
            "Permission granted"
        );
        Ok(added)
    }

    /// 撤销权限；不存在的记录忽略。返回删除的记录数
    pub async fn revoke<A: IdentityType>(
        &self,
        assignee: &A,
        resource: &str,
        operations: impl Into<Operations>,
    ) -> IdmResult<usize> {
        self.registry.require(Feature::Permission)?;
        let operations = operations.into().normalize()?;
        let target = assignee.identity_ref();

        let removed = self
            .registry
            .mutate(&self.realm, |state| {
                let before = state.permissions.len();
                state.permissions.retain(|p| {
                    !(p.assignee == target
                        && p.resource == resource
                        && operations.contains(&p.operation))
                });
                Ok(before - state.permissions.len())
            })
            .await?;

        debug!(realm = %self.realm, assignee = assignee.key(), resource, removed, "Permission revoked");
        Ok(removed)
    }

    /// 某资源上的全部授予，按授予顺序
    pub async fn list_permissions(&self, resource: &str) -> IdmResult<Vec<Permission>> {
        self.select(|p| p.resource == resource).await
    }

    pub async fn list_permissions_for_operation(
        &self,
        resource: &str,
        operation: &str,
    ) -> IdmResult<Vec<Permission>> {
        self.select(|p| p.resource == resource && p.operation == operation)
            .await
    }

    pub async fn list_assignee_permissions<A: IdentityType>(
        &self,
        assignee: &A,
    ) -> IdmResult<Vec<Permission>> {
        let target = assignee.identity_ref();
        self.select(|p| p.assignee == target).await
    }

    /// 删除某资源上的全部授予，返回删除数
    pub async fn clear_permissions(&self, resource: &str) -> IdmResult<usize> {
        self.registry.require(Feature::Permission)?;
        let removed = self
            .registry
            .mutate(&self.realm, |state| {
                let before = state.permissions.len();
                state.permissions.retain(|p| p.resource != resource);
                Ok(before - state.permissions.len())
            })
            .await?;

        info!(realm = %self.realm, resource, removed, "Permissions cleared");
        Ok(removed)
    }

    /// 直接授予检查
    pub async fn has_permission<A: IdentityType>(
        &self,
        identity: &A,
        resource: &str,
        operation: &str,
    ) -> IdmResult<bool> {
        self.registry.require(Feature::Permission)?;
        let target = identity.identity_ref();
        self.registry
            .read(&self.realm, |state| {
                state.permissions.iter().any(|p| {
                    p.assignee == target && p.resource == resource && p.operation == operation
                })
            })
            .await
    }

    async fn select<F>(&self, predicate: F) -> IdmResult<Vec<Permission>>
    where
        F: Fn(&Permission) -> bool + Send,
    {
        self.registry.require(Feature::Permission)?;
        self.registry
            .read(&self.realm, move |state| {
                state
                    .permissions
                    .iter()
                    .filter(|p| predicate(p))
                    .cloned()
                    .collect()
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::memory_manager;
    use partix_common::{Group, Realm, Role};

    #[tokio::test]
    async fn test_grant_expands_operations() {
        let (manager, _, realm) = memory_manager().await;
        let zvb = Group::new("ZVB");
        manager.identity_manager(&realm).add(&zvb).await.unwrap();
        let permissions = manager.permission_manager(&realm);

        let added = permissions
            .grant(&zvb, "Stammdaten", "create,read,update,delete")
            .await
            .unwrap();
        assert_eq!(added, 4);

        let listed = permissions.list_permissions("Stammdaten").await.unwrap();
        let ops: Vec<&str> = listed.iter().map(|p| p.operation.as_str()).collect();
        assert_eq!(ops, vec!["create", "read", "update", "delete"]);
        assert!(listed.iter().all(|p| p.assignee == zvb.identity_ref()));
    }

    #[tokio::test]
    async fn test_grant_is_idempotent() {
        let (manager, store, realm) = memory_manager().await;
        let role = Role::new("Sachbearbeiter");
        manager.identity_manager(&realm).add(&role).await.unwrap();
        let permissions = manager.permission_manager(&realm);

        assert_eq!(permissions.grant(&role, "Meldung", "read").await.unwrap(), 1);
        let revision = store.snapshots().await[0].revision;

        assert_eq!(permissions.grant(&role, "Meldung", "read").await.unwrap(), 0);
        assert_eq!(
            permissions.grant(&role, "Meldung", vec!["read", "update"]).await.unwrap(),
            1
        );
        assert_eq!(permissions.list_permissions("Meldung").await.unwrap().len(), 2);
        assert_eq!(store.snapshots().await[0].revision, revision + 1);
    }

    #[tokio::test]
    async fn test_rejected_grant_records_nothing() {
        let (manager, _, realm) = memory_manager().await;
        let role = Role::new("Sachbearbeiter");
        manager.identity_manager(&realm).add(&role).await.unwrap();
        let permissions = manager.permission_manager(&realm);

        let err = permissions
            .grant(&role, "Meldung", "read,,update")
            .await
            .unwrap_err();
        assert!(matches!(err, IdmError::Validation(_)));

        let err = permissions.grant(&role, " ", "read").await.unwrap_err();
        assert!(matches!(err, IdmError::Validation(_)));
        assert!(permissions.list_permissions("Meldung").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_assignee_must_be_in_realm() {
        let (manager, _, ams) = memory_manager().await;
        let other = manager.create_realm(Realm::new("OTHER")).await.unwrap();
        let foreign = Role::new("Sachbearbeiter");
        manager.identity_manager(&other).add(&foreign).await.unwrap();

        let err = manager
            .permission_manager(&ams)
            .grant(&foreign, "Meldung", "read")
            .await
            .unwrap_err();
        assert!(matches!(err, IdmError::InvalidReference { .. }));
    }

    #[tokio::test]
    async fn test_revoke_and_clear() {
        let (manager, _, realm) = memory_manager().await;
        let role = Role::new("Sachbearbeiter");
        let group = Group::new("Berlin");
        let identities = manager.identity_manager(&realm);
        identities.add(&role).await.unwrap();
        identities.add(&group).await.unwrap();
        let permissions = manager.permission_manager(&realm);

        permissions.grant(&role, "Anliegen", "create,read,update").await.unwrap();
        permissions.grant(&group, "Anliegen", "read").await.unwrap();

        assert_eq!(permissions.revoke(&role, "Anliegen", "create,delete").await.unwrap(), 1);
        assert_eq!(permissions.revoke(&role, "Anliegen", "create").await.unwrap(), 0);
        assert_eq!(permissions.list_assignee_permissions(&role).await.unwrap().len(), 2);

        assert_eq!(permissions.clear_permissions("Anliegen").await.unwrap(), 3);
        assert!(permissions.list_permissions("Anliegen").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_has_permission_is_direct_only() {
        let (manager, _, realm) = memory_manager().await;
        let identities = manager.identity_manager(&realm);
        let berlin = Group::new("Berlin");
        let zvb = Group::with_parent("ZVB", &berlin);
        let role = Role::new("Sachbearbeiter");
        identities.add(&berlin).await.unwrap();
        identities.add(&zvb).await.unwrap();
        identities.add(&role).await.unwrap();
        identities.grant_role(&berlin, &role).await.unwrap();

        let permissions = manager.permission_manager(&realm);
        permissions.grant(&role, "Meldung", "read,update").await.unwrap();
        permissions.grant(&berlin, "Stammdaten", "read").await.unwrap();

        assert!(permissions.has_permission(&role, "Meldung", "read").await.unwrap());
        assert!(!permissions.has_permission(&role, "Meldung", "create").await.unwrap());
        // neither role grants nor parent grants are inherited
        assert!(!permissions.has_permission(&berlin, "Meldung", "read").await.unwrap());
        assert!(!permissions.has_permission(&zvb, "Stammdaten", "read").await.unwrap());

        let readers = permissions
            .list_permissions_for_operation("Meldung", "read")
            .await
            .unwrap();
        assert_eq!(readers.len(), 1);
        assert_eq!(readers[0].assignee, role.identity_ref());
    }
}
