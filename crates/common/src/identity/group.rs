//! Group 实体
//!
//! 组构成一棵树，父节点以稳定 id 保存（非拥有引用），路径形如 `/Berlin/ZVB`。

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::kind::{IdentityKind, IdentityType};
use super::validate_name;
use crate::attribute::{Attributes, AttributedType};
use crate::error::ValidationError;
use crate::realm::RealmState;

pub const PATH_SEPARATOR: char = '/';

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    id: Uuid,
    name: String,
    parent: Option<Uuid>,
    path: String,
    enabled: bool,
    created_at: i64,
    #[serde(default)]
    attributes: Attributes,
}

impl Group {
    /// 创建顶层组
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: Uuid::new_v4(),
            path: format!("{PATH_SEPARATOR}{name}"),
            name,
            parent: None,
            enabled: true,
            created_at: Utc::now().timestamp(),
            attributes: Attributes::new(),
        }
    }

    /// 创建 `parent` 的子组
    pub fn with_parent(name: impl Into<String>, parent: &Group) -> Self {
        let mut group = Self::new(name);
        group.resolve_path(Some(parent));
        group
    }

    pub fn parent(&self) -> Option<Uuid> {
        self.parent
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Re-derives parent id and path from `parent`.
    pub fn resolve_path(&mut self, parent: Option<&Group>) {
        match parent {
            Some(p) => {
                self.parent = Some(p.id);
                self.path = format!("{}{PATH_SEPARATOR}{}", p.path, self.name);
            }
            None => {
                self.parent = None;
                self.path = format!("{PATH_SEPARATOR}{}", self.name);
            }
        }
    }
}

/// 将路径拆分为段；不以 `/` 开头或包含空段时返回 None
pub fn split_path(path: &str) -> Option<Vec<&str>> {
    let rest = path.strip_prefix(PATH_SEPARATOR)?;
    let segments: Vec<&str> = rest.split(PATH_SEPARATOR).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return None;
    }
    Some(segments)
}

impl AttributedType for Group {
    fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }
}

impl IdentityType for Group {
    const KIND: IdentityKind = IdentityKind::Group;

    fn id(&self) -> Uuid {
        self.id
    }

    fn key(&self) -> &str {
        &self.path
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn created_at(&self) -> i64 {
        self.created_at
    }

    fn parent_group(&self) -> Option<Uuid> {
        self.parent
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_name("group.name", &self.name)?;
        if self.name.contains(PATH_SEPARATOR) {
            return Err(ValidationError::invalid_format(
                "group.name",
                "'/' is reserved as the path separator",
            ));
        }
        Ok(())
    }

    fn entries(state: &RealmState) -> &[Self] {
        &state.groups
    }

    fn entries_mut(state: &mut RealmState) -> &mut Vec<Self> {
        &mut state.groups
    }
}
