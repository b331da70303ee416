//! 身份存储支持的功能集合
//!
//! 配置中写作 `supported_features = ["all"]` 或具体的功能名列表

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::ConfigError;

/// Shorthand accepted in place of listing every feature.
pub const ALL_FEATURES: &str = "all";

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Feature {
    /// Realm 的创建、更新、删除
    Realm,
    /// Group / Role / User 的增删查改
    Identity,
    /// 属性读写
    Attribute,
    /// 组成员关系与角色授予
    Relationship,
    /// 权限授予、撤销与检查
    Permission,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FeatureSet(BTreeSet<Feature>);

impl FeatureSet {
    pub fn all() -> Self {
        Self(Feature::iter().collect())
    }

    pub fn empty() -> Self {
        Self(BTreeSet::new())
    }

    pub fn is_all(&self) -> bool {
        Feature::iter().all(|f| self.0.contains(&f))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn supports(&self, feature: Feature) -> bool {
        self.0.contains(&feature)
    }

    pub fn with(mut self, feature: Feature) -> Self {
        self.0.insert(feature);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = Feature> + '_ {
        self.0.iter().copied()
    }

    /// 解析功能名列表；`"all"` 展开为全部功能
    pub fn parse<S: AsRef<str>>(names: &[S]) -> Result<Self, ConfigError> {
        let mut set = BTreeSet::new();
        for name in names {
            let name = name.as_ref().trim();
            if name.eq_ignore_ascii_case(ALL_FEATURES) {
                set.extend(Feature::iter());
                continue;
            }
            let feature = Feature::from_str(&name.to_ascii_lowercase()).map_err(|_| {
                ConfigError::UnknownFeature {
                    name: name.to_string(),
                }
            })?;
            set.insert(feature);
        }
        Ok(Self(set))
    }
}

impl Default for FeatureSet {
    fn default() -> Self {
        Self::all()
    }
}

impl FromIterator<Feature> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl TryFrom<Vec<String>> for FeatureSet {
    type Error = ConfigError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FeatureSet> for Vec<String> {
    fn from(value: FeatureSet) -> Self {
        if value.is_all() {
            return vec![ALL_FEATURES.to_string()];
        }
        value.iter().map(|f| f.to_string()).collect()
    }
}

impl fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.clone().into();
        f.write_str(&names.join(","))
    }
}
