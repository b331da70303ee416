//! Realm 作用域的身份管理器
//!
//! 取出的实体都是脱离注册表的副本；修改后需通过 `update`
//! 或 `set_attribute` / `remove_attribute` 写回。

use partix_common::{
    AttributeValue, AttributedType, Feature, Group, GroupMembership, IdentityKind, IdentityRef,
    IdentityType, RealmState, Role, RoleGrant, User, ValidationError,
};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{IdmError, IdmResult};
use crate::query::IdentityQuery;
use crate::registry::RealmRegistry;

#[derive(Clone, Debug)]
pub struct IdentityManager {
    registry: Arc<RealmRegistry>,
    realm: String,
}

impl IdentityManager {
    pub(crate) fn new(registry: Arc<RealmRegistry>, realm: String) -> Self {
        Self { registry, realm }
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// 添加 Group / Role / User
    ///
    /// # Errors
    /// - `DuplicateIdentity`: key（组路径 / 角色名 / 登录名）已存在
    /// - `InvalidReference`: 父组不在本 Realm
    /// - `Validation`: 名称不合法
    pub async fn add<T: IdentityType>(&self, entity: &T) -> IdmResult<()> {
        self.registry.require(Feature::Identity)?;
        entity.validate()?;

        self.registry
            .mutate(&self.realm, |state| {
                if state.find_by_key::<T>(entity.key()).is_some()
                    || state.find::<T>(entity.id()).is_some()
                {
                    return Err(IdmError::DuplicateIdentity {
                        realm: self.realm.clone(),
                        kind: T::KIND,
                        key: entity.key().to_string(),
                    });
                }
                if let Some(parent) = entity.parent_group()
                    && state.find::<Group>(parent).is_none()
                {
                    return Err(IdmError::invalid_reference(
                        &self.realm,
                        format!("parent group {parent} of {} is not in this realm", entity.key()),
                    ));
                }
                T::entries_mut(state).push(entity.clone());
                Ok(())
            })
            .await?;

        info!(realm = %self.realm, kind = %T::KIND, key = entity.key(), "Identity added");
        Ok(())
    }

    /// 按路径查找组，如 `/Berlin/ZVB`
    pub async fn get_group(&self, path: &str) -> IdmResult<Option<Group>> {
        self.registry.require(Feature::Identity)?;
        self.registry
            .read(&self.realm, |state| state.group_by_path(path).cloned())
            .await
    }

    pub async fn get_role(&self, name: &str) -> IdmResult<Option<Role>> {
        self.lookup_by_key::<Role>(name).await
    }

    pub async fn get_user(&self, login_name: &str) -> IdmResult<Option<User>> {
        self.lookup_by_key::<User>(login_name).await
    }

    pub async fn lookup_by_key<T: IdentityType>(&self, key: &str) -> IdmResult<Option<T>> {
        self.registry.require(Feature::Identity)?;
        self.registry
            .read(&self.realm, |state| state.find_by_key::<T>(key).cloned())
            .await
    }

    pub async fn lookup<T: IdentityType>(&self, id: Uuid) -> IdmResult<Option<T>> {
        self.registry.require(Feature::Identity)?;
        self.registry
            .read(&self.realm, |state| state.find::<T>(id).cloned())
            .await
    }

    pub fn query<T: IdentityType>(&self) -> IdentityQuery<T> {
        IdentityQuery::new(self.registry.clone(), self.realm.clone())
    }

    /// 写回一个已取出的实体（属性、启用状态等）
    ///
    /// The stored key and parent cannot change through an update.
    pub async fn update<T: IdentityType>(&self, entity: &T) -> IdmResult<()> {
        self.registry.require(Feature::Identity)?;
        entity.validate()?;

        let registry = &self.registry;
        registry
            .mutate(&self.realm, |state| {
                let stored = state
                    .find_mut::<T>(entity.id())
                    .ok_or_else(|| IdmError::not_found(&self.realm, entity.identity_ref()))?;
                if stored.key() != entity.key() || stored.parent_group() != entity.parent_group() {
                    return Err(ValidationError::invalid_format(
                        "identity.key",
                        format!("{} cannot be renamed or moved by update", stored.key()),
                    )
                    .into());
                }
                if stored.attributes() != entity.attributes() {
                    registry.require(Feature::Attribute)?;
                }
                *stored = entity.clone();
                Ok(())
            })
            .await?;

        debug!(realm = %self.realm, kind = %T::KIND, key = entity.key(), "Identity updated");
        Ok(())
    }

    pub async fn set_attribute<T: IdentityType>(
        &self,
        entity: &T,
        name: &str,
        value: impl Into<AttributeValue>,
    ) -> IdmResult<()> {
        self.registry.require(Feature::Attribute)?;
        if name.is_empty() {
            return Err(ValidationError::required("attribute.name").into());
        }
        let value = value.into();

        self.registry
            .mutate(&self.realm, |state| {
                let stored = state
                    .find_mut::<T>(entity.id())
                    .ok_or_else(|| IdmError::not_found(&self.realm, entity.identity_ref()))?;
                stored.attributes_mut().set(name, value);
                Ok(())
            })
            .await
    }

    /// 删除属性，返回被删除的值
    pub async fn remove_attribute<T: IdentityType>(
        &self,
        entity: &T,
        name: &str,
    ) -> IdmResult<Option<AttributeValue>> {
        self.registry.require(Feature::Attribute)?;
        self.registry
            .mutate(&self.realm, |state| {
                let stored = state
                    .find_mut::<T>(entity.id())
                    .ok_or_else(|| IdmError::not_found(&self.realm, entity.identity_ref()))?;
                Ok(stored.remove_attribute(name))
            })
            .await
    }

    /// 删除身份以及引用它的全部权限与关系
    ///
    /// # Errors
    /// 仍有子组的组不能删除（`Validation`）
    pub async fn remove<T: IdentityType>(&self, entity: &T) -> IdmResult<()> {
        self.registry.require(Feature::Identity)?;
        let identity = entity.identity_ref();

        let detached = self
            .registry
            .mutate(&self.realm, |state| {
                if state.find::<T>(identity.id).is_none() {
                    return Err(IdmError::not_found(&self.realm, identity));
                }
                if identity.kind == IdentityKind::Group
                    && state.children(identity.id).next().is_some()
                {
                    return Err(ValidationError::invalid_format(
                        "group",
                        format!("{} still has child groups", entity.key()),
                    )
                    .into());
                }
                T::entries_mut(state).retain(|e| e.id() != identity.id);
                Ok(state.detach(identity))
            })
            .await?;

        info!(
            realm = %self.realm,
            kind = %T::KIND,
            key = entity.key(),
            detached,
            "Identity removed"
        );
        Ok(())
    }

    /// 将用户加入组，已是成员时为 no-op
    pub async fn add_to_group(&self, user: &User, group: &Group) -> IdmResult<()> {
        self.registry.require(Feature::Relationship)?;
        let membership = GroupMembership {
            member: user.identity_ref(),
            group: group.id(),
        };

        self.registry
            .mutate(&self.realm, |state| {
                self.ensure_present(state, membership.member)?;
                self.ensure_present(state, group.identity_ref())?;
                if !state.memberships.contains(&membership) {
                    state.memberships.push(membership);
                }
                Ok(())
            })
            .await
    }

    pub async fn remove_from_group(&self, user: &User, group: &Group) -> IdmResult<bool> {
        self.registry.require(Feature::Relationship)?;
        let membership = GroupMembership {
            member: user.identity_ref(),
            group: group.id(),
        };

        self.registry
            .mutate(&self.realm, |state| {
                let before = state.memberships.len();
                state.memberships.retain(|m| *m != membership);
                Ok(state.memberships.len() != before)
            })
            .await
    }

    /// 用户是否属于 `group`；属于其任一子孙组也算
    pub async fn is_member(&self, user: &User, group: &Group) -> IdmResult<bool> {
        self.registry.require(Feature::Relationship)?;
        let member = user.identity_ref();
        self.registry
            .read(&self.realm, |state| {
                state
                    .memberships
                    .iter()
                    .filter(|m| m.member == member)
                    .any(|m| state.is_within(m.group, group.id()))
            })
            .await
    }

    /// 将角色授予用户或组，已授予时为 no-op
    pub async fn grant_role<A: IdentityType>(&self, assignee: &A, role: &Role) -> IdmResult<()> {
        self.registry.require(Feature::Relationship)?;
        if A::KIND == IdentityKind::Role {
            return Err(IdmError::invalid_reference(
                &self.realm,
                format!("role {} cannot be granted to another role", role.name()),
            ));
        }
        let grant = RoleGrant {
            assignee: assignee.identity_ref(),
            role: role.id(),
        };

        self.registry
            .mutate(&self.realm, |state| {
                self.ensure_present(state, grant.assignee)?;
                self.ensure_present(state, role.identity_ref())?;
                if !state.role_grants.contains(&grant) {
                    state.role_grants.push(grant);
                }
                Ok(())
            })
            .await
    }

    pub async fn revoke_role<A: IdentityType>(&self, assignee: &A, role: &Role) -> IdmResult<bool> {
        self.registry.require(Feature::Relationship)?;
        let grant = RoleGrant {
            assignee: assignee.identity_ref(),
            role: role.id(),
        };

        self.registry
            .mutate(&self.realm, |state| {
                let before = state.role_grants.len();
                state.role_grants.retain(|g| *g != grant);
                Ok(state.role_grants.len() != before)
            })
            .await
    }

    /// 直接授予检查，不经由组成员关系传递
    pub async fn has_role<A: IdentityType>(&self, assignee: &A, role: &Role) -> IdmResult<bool> {
        self.registry.require(Feature::Relationship)?;
        let grant = RoleGrant {
            assignee: assignee.identity_ref(),
            role: role.id(),
        };
        self.registry
            .read(&self.realm, |state| state.role_grants.contains(&grant))
            .await
    }

    fn ensure_present(&self, state: &RealmState, identity: IdentityRef) -> IdmResult<()> {
        if state.contains(identity) {
            Ok(())
        } else {
            Err(IdmError::invalid_reference(
                &self.realm,
                format!("{identity} is not in this realm"),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::memory_manager;
    use partix_common::Realm;
    use partix_store::StateStore;

    #[tokio::test]
    async fn test_add_and_get_group() {
        let (manager, _, realm) = memory_manager().await;
        let identities = manager.identity_manager(&realm);

        let berlin = Group::new("Berlin");
        let mut zvb = Group::with_parent("ZVB", &berlin);
        zvb.set_attribute("groupBerlinZvbAttributeName", "groupBerlinZvbAttributeValue");
        identities.add(&berlin).await.unwrap();
        identities.add(&zvb).await.unwrap();

        let fetched = identities.get_group("/Berlin/ZVB").await.unwrap().unwrap();
        assert_eq!(fetched, zvb);
        assert_eq!(fetched.parent(), Some(berlin.id()));
        assert!(identities.get_group("/Berlin/Spandau").await.unwrap().is_none());
        assert!(identities.get_group("/Spandau/ZVB").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_identity() {
        let (manager, _, realm) = memory_manager().await;
        let identities = manager.identity_manager(&realm);

        identities.add(&Role::new("Sachbearbeiter")).await.unwrap();
        let err = identities
            .add(&Role::new("Sachbearbeiter"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IdmError::DuplicateIdentity { kind: IdentityKind::Role, ref key, .. } if key == "Sachbearbeiter"
        ));

        let berlin = Group::new("Berlin");
        identities.add(&berlin).await.unwrap();
        assert!(matches!(
            identities.add(&Group::new("Berlin")).await,
            Err(IdmError::DuplicateIdentity { .. })
        ));
        // same name under a different parent is a different path
        identities
            .add(&Group::with_parent("Berlin", &berlin))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_parent_must_be_in_realm() {
        let (manager, _, realm) = memory_manager().await;
        let identities = manager.identity_manager(&realm);

        let unsaved = Group::new("Hamburg");
        let err = identities
            .add(&Group::with_parent("Altona", &unsaved))
            .await
            .unwrap_err();
        assert!(matches!(err, IdmError::InvalidReference { .. }));
    }

    #[tokio::test]
    async fn test_cross_realm_parent_rejected() {
        let (manager, _, ams) = memory_manager().await;
        let other = manager.create_realm(Realm::new("OTHER")).await.unwrap();

        let berlin = Group::new("Berlin");
        manager.identity_manager(&other).add(&berlin).await.unwrap();

        let err = manager
            .identity_manager(&ams)
            .add(&Group::with_parent("ZVB", &berlin))
            .await
            .unwrap_err();
        assert!(matches!(err, IdmError::InvalidReference { .. }));
    }

    #[tokio::test]
    async fn test_detached_copy_needs_write_back() {
        let (manager, _, realm) = memory_manager().await;
        let identities = manager.identity_manager(&realm);

        let role = Role::new("Beteiligter");
        identities.add(&role).await.unwrap();

        let mut fetched = identities.get_role("Beteiligter").await.unwrap().unwrap();
        fetched.set_attribute("office", "Mitte");
        let stored = identities.get_role("Beteiligter").await.unwrap().unwrap();
        assert!(stored.get_attribute("office").is_none());

        identities.update(&fetched).await.unwrap();
        let stored = identities.get_role("Beteiligter").await.unwrap().unwrap();
        assert_eq!(
            stored.get_attribute("office").map(|a| a.value),
            Some(AttributeValue::from("Mitte"))
        );

        identities
            .set_attribute(&stored, "floor", 3i64)
            .await
            .unwrap();
        let removed = identities.remove_attribute(&stored, "office").await.unwrap();
        assert_eq!(removed, Some(AttributeValue::from("Mitte")));

        let stored = identities.get_role("Beteiligter").await.unwrap().unwrap();
        assert_eq!(stored.attributes().len(), 1);
        assert_eq!(stored.attributes().get("floor").and_then(|v| v.as_i64()), Some(3));
    }

    #[tokio::test]
    async fn test_update_user_email() {
        let (manager, store, realm) = memory_manager().await;
        let identities = manager.identity_manager(&realm);
        identities
            .add(&User::new("jdoe").with_email("jdoe@example.org"))
            .await
            .unwrap();

        let mut fetched = identities.get_user("jdoe").await.unwrap().unwrap();
        fetched.set_email(Some("john.doe@example.org".to_string()));
        identities.update(&fetched).await.unwrap();
        let stored = identities.get_user("jdoe").await.unwrap().unwrap();
        assert_eq!(stored.email(), Some("john.doe@example.org"));

        fetched.set_email(Some("not-an-address".to_string()));
        assert!(matches!(
            identities.update(&fetched).await,
            Err(IdmError::Validation(_))
        ));

        fetched.set_email(None);
        identities.update(&fetched).await.unwrap();
        let reloaded = store.load_all().await.unwrap();
        assert_eq!(reloaded[0].users[0].email(), None);
    }

    #[tokio::test]
    async fn test_update_unknown_identity() {
        let (manager, _, realm) = memory_manager().await;
        let identities = manager.identity_manager(&realm);

        let err = identities.update(&Role::new("ghost")).await.unwrap_err();
        assert!(matches!(err, IdmError::IdentityNotFound { .. }));
    }

    #[tokio::test]
    async fn test_remove_cascades() {
        let (manager, _, realm) = memory_manager().await;
        let identities = manager.identity_manager(&realm);
        let permissions = manager.permission_manager(&realm);

        let berlin = Group::new("Berlin");
        let zvb = Group::with_parent("ZVB", &berlin);
        let user = User::new("jdoe");
        identities.add(&berlin).await.unwrap();
        identities.add(&zvb).await.unwrap();
        identities.add(&user).await.unwrap();
        identities.add_to_group(&user, &zvb).await.unwrap();
        permissions.grant(&zvb, "Stammdaten", "read").await.unwrap();

        let err = identities.remove(&berlin).await.unwrap_err();
        assert!(matches!(err, IdmError::Validation(_)));

        identities.remove(&zvb).await.unwrap();
        assert!(identities.get_group("/Berlin/ZVB").await.unwrap().is_none());
        assert!(permissions.list_permissions("Stammdaten").await.unwrap().is_empty());
        assert!(!identities.is_member(&user, &berlin).await.unwrap());

        identities.remove(&berlin).await.unwrap();
        assert!(matches!(
            identities.remove(&berlin).await,
            Err(IdmError::IdentityNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_membership_counts_descendants() {
        let (manager, _, realm) = memory_manager().await;
        let identities = manager.identity_manager(&realm);

        let berlin = Group::new("Berlin");
        let mitte = Group::with_parent("Mitte", &berlin);
        let pankow = Group::with_parent("Pankow", &berlin);
        let user = User::new("jdoe").with_email("jdoe@example.org");
        for group in [&berlin, &mitte, &pankow] {
            identities.add(group).await.unwrap();
        }
        identities.add(&user).await.unwrap();

        identities.add_to_group(&user, &mitte).await.unwrap();
        identities.add_to_group(&user, &mitte).await.unwrap();

        assert!(identities.is_member(&user, &mitte).await.unwrap());
        assert!(identities.is_member(&user, &berlin).await.unwrap());
        assert!(!identities.is_member(&user, &pankow).await.unwrap());

        assert!(identities.remove_from_group(&user, &mitte).await.unwrap());
        assert!(!identities.remove_from_group(&user, &mitte).await.unwrap());
        assert!(!identities.is_member(&user, &berlin).await.unwrap());
    }

    #[tokio::test]
    async fn test_role_grants_are_direct() {
        let (manager, _, realm) = memory_manager().await;
        let identities = manager.identity_manager(&realm);

        let berlin = Group::new("Berlin");
        let user = User::new("jdoe");
        let role = Role::new("Sachbearbeiter");
        identities.add(&berlin).await.unwrap();
        identities.add(&user).await.unwrap();
        identities.add(&role).await.unwrap();
        identities.add_to_group(&user, &berlin).await.unwrap();

        identities.grant_role(&berlin, &role).await.unwrap();
        assert!(identities.has_role(&berlin, &role).await.unwrap());
        assert!(!identities.has_role(&user, &role).await.unwrap());

        let err = identities.grant_role(&role, &role).await.unwrap_err();
        assert!(matches!(err, IdmError::InvalidReference { .. }));

        assert!(identities.revoke_role(&berlin, &role).await.unwrap());
        assert!(!identities.has_role(&berlin, &role).await.unwrap());
    }

    #[tokio::test]
    async fn test_relationship_requires_known_identities() {
        let (manager, _, realm) = memory_manager().await;
        let identities = manager.identity_manager(&realm);

        let berlin = Group::new("Berlin");
        identities.add(&berlin).await.unwrap();

        let err = identities
            .add_to_group(&User::new("ghost"), &berlin)
            .await
            .unwrap_err();
        assert!(matches!(err, IdmError::InvalidReference { .. }));
    }

    #[tokio::test]
    async fn test_query_filters() {
        let (manager, _, realm) = memory_manager().await;
        let identities = manager.identity_manager(&realm);

        let berlin = Group::new("Berlin");
        identities.add(&berlin).await.unwrap();
        for name in ["ZVB", "Mitte", "Pankow"] {
            let mut group = Group::with_parent(name, &berlin);
            group.set_attribute("district", name == "Mitte");
            if name == "Pankow" {
                group.set_enabled(false);
            }
            identities.add(&group).await.unwrap();
        }

        let all = identities.query::<Group>();
        let names: Vec<String> = all
            .result_list()
            .await
            .unwrap()
            .iter()
            .map(|g| g.name().to_string())
            .collect();
        assert_eq!(names, vec!["Berlin", "ZVB", "Mitte", "Pankow"]);

        let children = identities.query::<Group>().parent(&berlin);
        assert_eq!(children.result_count().await.unwrap(), 3);
        assert_eq!(
            children.clone().enabled(true).result_count().await.unwrap(),
            2
        );
        assert_eq!(
            identities
                .query::<Group>()
                .attribute("district", true)
                .result_list()
                .await
                .unwrap()[0]
                .name(),
            "Mitte"
        );
        assert_eq!(
            identities.query::<Role>().name("Berlin").result_count().await.unwrap(),
            0
        );

        // the query is re-evaluated on every run
        identities
            .add(&Group::with_parent("Spandau", &berlin))
            .await
            .unwrap();
        assert_eq!(children.result_count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_lookup_by_id() {
        let (manager, _, realm) = memory_manager().await;
        let identities = manager.identity_manager(&realm);

        let user = User::new("jdoe");
        identities.add(&user).await.unwrap();

        assert_eq!(identities.lookup::<User>(user.id()).await.unwrap(), Some(user.clone()));
        assert_eq!(identities.get_user("jdoe").await.unwrap(), Some(user.clone()));
        assert!(identities.lookup::<Role>(user.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_name_rejected() {
        let (manager, _, realm) = memory_manager().await;
        let identities = manager.identity_manager(&realm);

        assert!(matches!(
            identities.add(&Group::new("Berlin/Mitte")).await,
            Err(IdmError::Validation(_))
        ));
        assert_eq!(identities.query::<Group>().result_count().await.unwrap(), 0);
    }
}
