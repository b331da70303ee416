//! partix 公共模型库
//!
//! 身份存储的数据模型、配置与错误类型，供 `partix-store`、`partix-idm`
//! 与命令行工具共享。

pub mod attribute;
pub mod config;
pub mod error;
pub mod identity;
pub mod permission;
pub mod realm;

pub use attribute::{Attribute, AttributeValue, AttributedType, Attributes};
pub use config::{Feature, FeatureSet, IdentityStoreConfig, PartixConfig};
pub use error::{ConfigError, StorageError, ValidationError};
pub use identity::{
    Group, GroupMembership, IdentityKind, IdentityRef, IdentityType, Role, RoleGrant, User,
};
pub use permission::{Operations, Permission};
pub use realm::{Realm, RealmState};
