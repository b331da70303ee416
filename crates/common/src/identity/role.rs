//! Role 实体（扁平命名空间）

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::kind::{IdentityKind, IdentityType};
use super::validate_name;
use crate::attribute::{Attributes, AttributedType};
use crate::error::ValidationError;
use crate::realm::RealmState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    id: Uuid,
    name: String,
    enabled: bool,
    created_at: i64,
    #[serde(default)]
    attributes: Attributes,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            enabled: true,
            created_at: Utc::now().timestamp(),
            attributes: Attributes::new(),
        }
    }
}

impl AttributedType for Role {
    fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }
}

impl IdentityType for Role {
    const KIND: IdentityKind = IdentityKind::Role;

    fn id(&self) -> Uuid {
        self.id
    }

    fn key(&self) -> &str {
        &self.name
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

    fn validate(&self) -> Result<(), ValidationError> {
        validate_name("role.name", &self.name)
    }

    fn entries(state: &RealmState) -> &[Self] {
        &state.roles
    }

    fn entries_mut(state: &mut RealmState) -> &mut Vec<Self> {
        &mut state.roles
    }
}
