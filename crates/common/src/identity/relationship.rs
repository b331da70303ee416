//! 身份之间的关系记录

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::kind::IdentityRef;

/// 用户属于某个组
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupMembership {
    pub member: IdentityRef,
    pub group: Uuid,
}

/// 角色授予给用户或组
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleGrant {
    pub assignee: IdentityRef,
    pub role: Uuid,
}
