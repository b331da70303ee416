//! 身份类别与引用

use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::attribute::AttributedType;
use crate::error::ValidationError;
use crate::realm::RealmState;

/// 身份类别
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum IdentityKind {
    Group,
    Role,
    User,
}

/// 对 Realm 内某个身份的非拥有引用
///
/// Permissions and relationships point at identities through this instead of
/// holding the entity itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityRef {
    pub kind: IdentityKind,
    pub id: Uuid,
}

impl IdentityRef {
    pub fn new(kind: IdentityKind, id: Uuid) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for IdentityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Realm 中可存储、可查询的身份实体
pub trait IdentityType: AttributedType + Clone + Debug + Send + Sync + 'static {
    const KIND: IdentityKind;

    fn id(&self) -> Uuid;

    /// Realm-unique lookup key: group path, role name or user login name.
    fn key(&self) -> &str;

    fn name(&self) -> &str;

    fn is_enabled(&self) -> bool;

    fn set_enabled(&mut self, enabled: bool);

    fn created_at(&self) -> i64;

    /// Parent group id. Only groups have one.
    fn parent_group(&self) -> Option<Uuid> {
        None
    }

    fn validate(&self) -> Result<(), ValidationError>;

    fn identity_ref(&self) -> IdentityRef {
        IdentityRef::new(Self::KIND, self.id())
    }

    /// The realm's arena for this identity type, in insertion order.
    fn entries(state: &RealmState) -> &[Self];

    fn entries_mut(state: &mut RealmState) -> &mut Vec<Self>;
}
