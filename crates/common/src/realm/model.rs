//! Realm 核心数据结构

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::attribute::{Attributes, AttributedType};
use crate::error::ValidationError;
use crate::identity::validate_name;

/// Realm 实体
///
/// The name is the partition key and cannot change after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Realm {
    name: String,
    enabled: bool,
    created_at: i64,
    updated_at: i64,
    #[serde(default)]
    attributes: Attributes,
}

impl Realm {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now().timestamp();
        Self {
            name: name.into(),
            enabled: true,
            created_at: now,
            updated_at: now,
            attributes: Attributes::new(),
        }
    }

    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<crate::attribute::AttributeValue>,
    ) -> Self {
        self.attributes.set(name, value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn updated_at(&self) -> i64 {
        self.updated_at
    }

    /// 更新修改时间
    pub fn touch(&mut self) {
        self.updated_at = Utc::now().timestamp();
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("realm.name", &self.name)
    }
}

impl AttributedType for Realm {
    fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }
}
