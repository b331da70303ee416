//! 身份管理错误定义

use partix_common::{Feature, IdentityKind, IdentityRef, StorageError, ValidationError};
use thiserror::Error;

pub type IdmResult<T> = Result<T, IdmError>;

/// 身份管理错误类型
#[derive(Error, Debug)]
pub enum IdmError {
    /// Realm 名称已存在
    #[error("Realm already exists: {0}")]
    DuplicateRealm(String),

    /// Realm 不存在
    #[error("Realm not found: {0}")]
    RealmNotFound(String),

    /// 同一 Realm 内 key 冲突（组路径 / 角色名 / 登录名）
    #[error("Duplicate {kind} '{key}' in realm {realm}")]
    DuplicateIdentity {
        realm: String,
        kind: IdentityKind,
        key: String,
    },

    /// 写回的身份不在该 Realm 中
    #[error("Identity {identity} not found in realm {realm}")]
    IdentityNotFound {
        realm: String,
        identity: IdentityRef,
    },

    /// 引用了其它 Realm 或不存在的身份
    #[error("Invalid reference in realm {realm}: {reason}")]
    InvalidReference { realm: String, reason: String },

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Feature not supported by this identity store: {0}")]
    UnsupportedFeature(Feature),

    /// 存储内容不可信，启动时致命
    #[error("Store corruption detected in {location}: {reason}")]
    StoreCorruption { location: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(StorageError),
}

impl IdmError {
    pub(crate) fn invalid_reference(realm: &str, reason: impl Into<String>) -> Self {
        Self::InvalidReference {
            realm: realm.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn not_found(realm: &str, identity: IdentityRef) -> Self {
        Self::IdentityNotFound {
            realm: realm.to_string(),
            identity,
        }
    }
}

impl From<StorageError> for IdmError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Corruption { location, reason } => {
                Self::StoreCorruption { location, reason }
            }
            other => Self::Storage(other),
        }
    }
}
