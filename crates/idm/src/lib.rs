//! partix 身份管理
//!
//! - `PartitionManager`：顶层入口，管理 Realm 与持久化
//! - `IdentityManager`：Realm 内的 Group / Role / User 及其关系
//! - `PermissionManager`：Realm 内的 (assignee, resource, operation) 授予
//!
//! 每次修改在返回前都已写入存储。

pub mod error;
pub mod identity;
pub mod partition;
pub mod permission;
pub mod query;
pub mod report;
pub mod scenario;

mod registry;

#[cfg(test)]
mod test_utils;

pub use error::{IdmError, IdmResult};
pub use identity::IdentityManager;
pub use partition::PartitionManager;
pub use permission::PermissionManager;
pub use query::IdentityQuery;
