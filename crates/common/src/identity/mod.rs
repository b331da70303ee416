//! Identity 模型
//!
//! 领域内的三类身份：Group（树形层级）、Role（扁平）、User，
//! 以及它们之间的关系记录。
//!
//! - `kind.rs` - 身份类别与跨实体引用
//! - `group.rs` / `role.rs` / `user.rs` - 各身份实体
//! - `relationship.rs` - 组成员关系、角色授予

pub mod group;
pub mod kind;
pub mod relationship;
pub mod role;
pub mod user;

pub use group::Group;
pub use kind::{IdentityKind, IdentityRef, IdentityType};
pub use relationship::{GroupMembership, RoleGrant};
pub use role::Role;
pub use user::User;

use crate::error::ValidationError;

/// 校验身份名称：非空、无首尾空白
pub(crate) fn validate_name(field: &str, name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::required(field));
    }
    if name.trim() != name {
        return Err(ValidationError::invalid_format(
            field,
            "leading or trailing whitespace",
        ));
    }
    if name.chars().any(char::is_control) {
        return Err(ValidationError::invalid_format(
            field,
            "control characters are not allowed",
        ));
    }
    Ok(())
}
