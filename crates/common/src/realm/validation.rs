//! Realm 状态校验
//!
//! 从存储加载的快照在投入使用前必须通过这里的结构校验

use std::collections::HashSet;

use super::state::RealmState;
use crate::error::ValidationError;
use crate::identity::{Group, IdentityKind, IdentityType};

impl RealmState {
    /// 校验整份状态的引用完整性与唯一性约束
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.realm.validate()?;

        let mut ids = HashSet::new();
        let mut keys = HashSet::new();
        for group in &self.groups {
            group.validate()?;
            unique(&mut ids, group.id(), "group.id")?;
            unique(&mut keys, group.path(), "group.path")?;
            self.validate_group_parent(group)?;
        }

        keys.clear();
        for role in &self.roles {
            role.validate()?;
            unique(&mut ids, role.id(), "role.id")?;
            unique(&mut keys, role.name(), "role.name")?;
        }

        keys.clear();
        for user in &self.users {
            user.validate()?;
            unique(&mut ids, user.id(), "user.id")?;
            unique(&mut keys, user.login_name(), "user.login_name")?;
        }

        for permission in &self.permissions {
            permission.validate()?;
            if !self.contains(permission.assignee) {
                return Err(dangling("permission.assignee", &permission.assignee.to_string()));
            }
        }

        for membership in &self.memberships {
            if membership.member.kind != IdentityKind::User || !self.contains(membership.member) {
                return Err(dangling("membership.member", &membership.member.to_string()));
            }
            if self.find::<Group>(membership.group).is_none() {
                return Err(dangling("membership.group", &membership.group.to_string()));
            }
        }

        for grant in &self.role_grants {
            if grant.assignee.kind == IdentityKind::Role || !self.contains(grant.assignee) {
                return Err(dangling("role_grant.assignee", &grant.assignee.to_string()));
            }
            if self.find::<crate::identity::Role>(grant.role).is_none() {
                return Err(dangling("role_grant.role", &grant.role.to_string()));
            }
        }

        Ok(())
    }

    fn validate_group_parent(&self, group: &Group) -> Result<(), ValidationError> {
        let parent = match group.parent() {
            Some(id) => Some(
                self.find::<Group>(id)
                    .ok_or_else(|| dangling("group.parent", &id.to_string()))?,
            ),
            None => None,
        };

        let mut expected = group.clone();
        expected.resolve_path(parent);
        if expected.path() != group.path() {
            return Err(ValidationError::invalid_format(
                "group.path",
                format!("{} does not match its parent chain", group.path()),
            ));
        }

        if let Some(parent) = parent
            && self.is_within(parent.id(), group.id())
        {
            return Err(ValidationError::invalid_format(
                "group.parent",
                format!("cycle through {}", group.path()),
            ));
        }
        Ok(())
    }
}

fn unique<T: Eq + std::hash::Hash + ToString>(
    seen: &mut HashSet<T>,
    value: T,
    field: &str,
) -> Result<(), ValidationError> {
    let label = value.to_string();
    if !seen.insert(value) {
        return Err(ValidationError::invalid_format(
            field,
            format!("duplicate value {label}"),
        ));
    }
    Ok(())
}

fn dangling(field: &str, target: &str) -> ValidationError {
    ValidationError::invalid_format(field, format!("unknown reference {target}"))
}
