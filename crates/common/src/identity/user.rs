//! User 实体

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::kind::{IdentityKind, IdentityType};
use super::validate_name;
use crate::attribute::{Attributes, AttributedType};
use crate::error::ValidationError;
use crate::realm::RealmState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: Uuid,
    login_name: String,
    #[serde(default)]
    email: Option<String>,
    enabled: bool,
    created_at: i64,
    #[serde(default)]
    attributes: Attributes,
}

impl User {
    pub fn new(login_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            login_name: login_name.into(),
            email: None,
            enabled: true,
            created_at: Utc::now().timestamp(),
            attributes: Attributes::new(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn login_name(&self) -> &str {
        &self.login_name
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn set_email(&mut self, email: Option<String>) {
        self.email = email;
    }
}

impl AttributedType for User {
    fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }
}

impl IdentityType for User {
    const KIND: IdentityKind = IdentityKind::User;

    fn id(&self) -> Uuid {
        self.id
    }

    fn key(&self) -> &str {
        &self.login_name
    }

    fn name(&self) -> &str {
        &self.login_name
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
        validate_name("user.login_name", &self.login_name)?;
        if let Some(email) = &self.email
            && !email.contains('@')
        {
            return Err(ValidationError::invalid_format("user.email", "missing '@'"));
        }
        Ok(())
    }

    fn entries(state: &RealmState) -> &[Self] {
        &state.users
    }

    fn entries_mut(state: &mut RealmState) -> &mut Vec<Self> {
        &mut state.users
    }
}
