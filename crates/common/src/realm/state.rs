//! Realm 内存状态
//!
//! 一个 Realm 的全部数据：身份图（groups / roles / users 三个 arena）、
//! 关系记录与权限账本。持久化后端以它为单位整体读写。

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::Realm;
use crate::identity::group::split_path;
use crate::identity::{
    Group, GroupMembership, IdentityKind, IdentityRef, IdentityType, Role, RoleGrant, User,
};
use crate::permission::Permission;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealmState {
    pub realm: Realm,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    #[serde(default)]
    pub memberships: Vec<GroupMembership>,
    #[serde(default)]
    pub role_grants: Vec<RoleGrant>,
    /// Bumped on every persisted mutation.
    #[serde(default)]
    pub revision: u64,
}

impl RealmState {
    pub fn new(realm: Realm) -> Self {
        Self {
            realm,
            groups: Vec::new(),
            roles: Vec::new(),
            users: Vec::new(),
            permissions: Vec::new(),
            memberships: Vec::new(),
            role_grants: Vec::new(),
            revision: 0,
        }
    }

    pub fn name(&self) -> &str {
        self.realm.name()
    }

    pub fn find<T: IdentityType>(&self, id: Uuid) -> Option<&T> {
        T::entries(self).iter().find(|e| e.id() == id)
    }

    pub fn find_mut<T: IdentityType>(&mut self, id: Uuid) -> Option<&mut T> {
        T::entries_mut(self).iter_mut().find(|e| e.id() == id)
    }

    pub fn find_by_key<T: IdentityType>(&self, key: &str) -> Option<&T> {
        T::entries(self).iter().find(|e| e.key() == key)
    }

    /// 引用的身份是否存在于本 Realm
    pub fn contains(&self, identity: IdentityRef) -> bool {
        self.identity_name(identity).is_some()
    }

    pub fn identity_name(&self, identity: IdentityRef) -> Option<&str> {
        match identity.kind {
            IdentityKind::Group => self.find::<Group>(identity.id).map(|g| g.path()),
            IdentityKind::Role => self.find::<Role>(identity.id).map(|r| r.name()),
            IdentityKind::User => self.find::<User>(identity.id).map(|u| u.login_name()),
        }
    }

    /// 按路径逐段解析组；任一段缺失返回 None
    pub fn group_by_path(&self, path: &str) -> Option<&Group> {
        let segments = split_path(path)?;
        let mut parent: Option<Uuid> = None;
        let mut current = None;
        for segment in segments {
            let group = self
                .groups
                .iter()
                .find(|g| g.parent() == parent && g.name() == segment)?;
            parent = Some(group.id());
            current = Some(group);
        }
        current
    }

    pub fn children(&self, group: Uuid) -> impl Iterator<Item = &Group> {
        self.groups.iter().filter(move |g| g.parent() == Some(group))
    }

    /// `group` equals `ancestor` or sits somewhere below it.
    pub fn is_within(&self, group: Uuid, ancestor: Uuid) -> bool {
        let mut current = Some(group);
        // parent chains are at most as long as the arena
        for _ in 0..=self.groups.len() {
            match current {
                Some(id) if id == ancestor => return true,
                Some(id) => current = self.find::<Group>(id).and_then(|g| g.parent()),
                None => return false,
            }
        }
        false
    }

    /// Drops every permission and relationship that mentions `identity`.
    /// Returns the number of records removed.
    pub fn detach(&mut self, identity: IdentityRef) -> usize {
        let before = self.permissions.len() + self.memberships.len() + self.role_grants.len();

        self.permissions.retain(|p| p.assignee != identity);
        match identity.kind {
            IdentityKind::Group => {
                self.memberships.retain(|m| m.group != identity.id);
                self.role_grants.retain(|g| g.assignee != identity);
            }
            IdentityKind::Role => self.role_grants.retain(|g| g.role != identity.id),
            IdentityKind::User => {
                self.memberships.retain(|m| m.member != identity);
                self.role_grants.retain(|g| g.assignee != identity);
            }
        }

        before - (self.permissions.len() + self.memberships.len() + self.role_grants.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn berlin_state() -> (RealmState, Group, Group) {
        let mut state = RealmState::new(Realm::new("AMS"));
        let berlin = Group::new("Berlin");
        let zvb = Group::with_parent("ZVB", &berlin);
        state.groups.push(berlin.clone());
        state.groups.push(zvb.clone());
        state.groups.push(Group::with_parent("Mitte", &berlin));
        (state, berlin, zvb)
    }

    #[test]
    fn test_group_by_path() {
        let (state, berlin, zvb) = berlin_state();

        assert_eq!(state.group_by_path("/Berlin"), Some(&berlin));
        assert_eq!(state.group_by_path("/Berlin/ZVB"), Some(&zvb));
        assert!(state.group_by_path("/Berlin/Spandau").is_none());
        assert!(state.group_by_path("/ZVB").is_none());
        assert!(state.group_by_path("Berlin").is_none());
    }

    #[test]
    fn test_hierarchy_helpers() {
        let (state, berlin, zvb) = berlin_state();

        assert_eq!(state.children(berlin.id()).count(), 2);
        assert!(state.is_within(zvb.id(), berlin.id()));
        assert!(state.is_within(berlin.id(), berlin.id()));
        assert!(!state.is_within(berlin.id(), zvb.id()));
    }

    #[test]
    fn test_find_by_key_and_contains() {
        let (mut state, _, zvb) = berlin_state();
        let role = Role::new("Beteiligter");
        state.roles.push(role.clone());

        assert_eq!(state.find_by_key::<Role>("Beteiligter"), Some(&role));
        assert_eq!(state.find_by_key::<Group>("/Berlin/ZVB"), Some(&zvb));
        assert!(state.contains(role.identity_ref()));
        assert!(!state.contains(IdentityRef::new(IdentityKind::User, role.id())));
    }

    #[test]
    fn test_detach_removes_references() {
        let (mut state, berlin, _) = berlin_state();
        let user = User::new("jdoe");
        let role = Role::new("Sachbearbeiter");
        state.users.push(user.clone());
        state.roles.push(role.clone());
        state.permissions.push(Permission::new(berlin.identity_ref(), "Stammdaten", "read"));
        state.memberships.push(GroupMembership {
            member: user.identity_ref(),
            group: berlin.id(),
        });
        state.role_grants.push(RoleGrant {
            assignee: berlin.identity_ref(),
            role: role.id(),
        });

        assert_eq!(state.detach(berlin.identity_ref()), 3);
        assert!(state.permissions.is_empty());
        assert!(state.memberships.is_empty());
        assert!(state.role_grants.is_empty());
    }
}
