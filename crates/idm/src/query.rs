//! 身份查询
//!
//! `IdentityQuery` 只保存过滤条件，每次 `result_list` 都基于当时的 Realm
//! 状态重新求值，因此同一个查询可以反复执行。结果按创建顺序排列。

use partix_common::{AttributeValue, Feature, Group, IdentityType};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::IdmResult;
use crate::registry::RealmRegistry;

#[derive(Debug, Clone, PartialEq)]
enum Filter {
    Name(String),
    Attribute(String, AttributeValue),
    Enabled(bool),
    Parent(Uuid),
}

impl Filter {
    fn matches<T: IdentityType>(&self, entity: &T) -> bool {
        match self {
            Self::Name(name) => entity.name() == name,
            Self::Attribute(name, value) => entity.attributes().get(name) == Some(value),
            Self::Enabled(enabled) => entity.is_enabled() == *enabled,
            Self::Parent(parent) => entity.parent_group() == Some(*parent),
        }
    }
}

pub struct IdentityQuery<T> {
    registry: Arc<RealmRegistry>,
    realm: String,
    filters: Vec<Filter>,
    _kind: PhantomData<fn() -> T>,
}

impl<T: IdentityType> IdentityQuery<T> {
    pub(crate) fn new(registry: Arc<RealmRegistry>, realm: String) -> Self {
        Self {
            registry,
            realm,
            filters: Vec::new(),
            _kind: PhantomData,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.filters.push(Filter::Name(name.into()));
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.filters
            .push(Filter::Attribute(name.into(), value.into()));
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.filters.push(Filter::Enabled(enabled));
        self
    }

    /// Direct children of `parent`; matches only groups.
    pub fn parent(mut self, parent: &Group) -> Self {
        self.filters.push(Filter::Parent(parent.id()));
        self
    }

    pub async fn result_list(&self) -> IdmResult<Vec<T>> {
        self.registry.require(Feature::Identity)?;
        self.registry
            .read(&self.realm, |state| {
                T::entries(state)
                    .iter()
                    .filter(|e| self.filters.iter().all(|f| f.matches(*e)))
                    .cloned()
                    .collect()
            })
            .await
    }

    pub async fn result_count(&self) -> IdmResult<usize> {
        self.registry.require(Feature::Identity)?;
        self.registry
            .read(&self.realm, |state| {
                T::entries(state)
                    .iter()
                    .filter(|e| self.filters.iter().all(|f| f.matches(*e)))
                    .count()
            })
            .await
    }
}

impl<T> Clone for IdentityQuery<T> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            realm: self.realm.clone(),
            filters: self.filters.clone(),
            _kind: PhantomData,
        }
    }
}

impl<T: IdentityType> fmt::Debug for IdentityQuery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityQuery")
            .field("kind", &T::KIND)
            .field("realm", &self.realm)
            .field("filters", &self.filters)
            .finish()
    }
}
