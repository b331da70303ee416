//! 身份存储配置

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::feature::FeatureSet;

/// Database file created inside `working_directory`.
pub const DATABASE_FILE: &str = "partix.db";

/// 身份存储配置
///
/// The only recognized store options. `PartitionManager` takes this at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityStoreConfig {
    /// 存储目录，数据库文件为 `{working_directory}/partix.db`
    #[serde(default = "default_working_directory")]
    pub working_directory: PathBuf,

    /// 启动时是否保留已有数据
    ///
    /// - true: 加载目录中已有的全部 Realm
    /// - false: 清空已有数据后从空状态开始
    #[serde(default = "default_preserve_state")]
    pub preserve_state: bool,

    /// 启用的功能集合，默认 `["all"]`
    #[serde(default)]
    pub supported_features: FeatureSet,
}

impl IdentityStoreConfig {
    pub fn new(working_directory: impl Into<PathBuf>) -> Self {
        Self {
            working_directory: working_directory.into(),
            ..Default::default()
        }
    }

    pub fn with_preserve_state(mut self, preserve_state: bool) -> Self {
        self.preserve_state = preserve_state;
        self
    }

    pub fn with_features(mut self, features: FeatureSet) -> Self {
        self.supported_features = features;
        self
    }

    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    pub fn database_path(&self) -> PathBuf {
        self.working_directory.join(DATABASE_FILE)
    }
}

impl Default for IdentityStoreConfig {
    fn default() -> Self {
        Self {
            working_directory: default_working_directory(),
            preserve_state: default_preserve_state(),
            supported_features: FeatureSet::all(),
        }
    }
}

fn default_working_directory() -> PathBuf {
    PathBuf::from("data")
}

fn default_preserve_state() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::feature::Feature;

    #[test]
    fn test_defaults() {
        let config = IdentityStoreConfig::default();
        assert_eq!(config.working_directory(), Path::new("data"));
        assert!(config.preserve_state);
        assert!(config.supported_features.is_all());
        assert_eq!(config.database_path(), PathBuf::from("data").join("partix.db"));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: IdentityStoreConfig = toml::from_str(
            r#"
            working_directory = "/tmp/pl-idm-work"
            supported_features = ["realm", "identity"]
            "#,
        )
        .unwrap();

        assert_eq!(config.working_directory(), Path::new("/tmp/pl-idm-work"));
        assert!(config.preserve_state);
        assert!(config.supported_features.supports(Feature::Identity));
        assert!(!config.supported_features.supports(Feature::Permission));
    }
}
