//! Realm 快照编解码
//!
//! 快照正文是 `RealmState` 的 JSON，校验和是正文的 SHA-256（hex）。

use chrono::Utc;
use partix_common::{RealmState, StorageError};
use sha2::{Digest, Sha256};

use crate::backend::StoreResult;

/// 一条持久化的 Realm 记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub realm: String,
    pub body: String,
    pub checksum: String,
    pub revision: i64,
    pub updated_at: i64,
}

impl Snapshot {
    pub fn encode(state: &RealmState) -> StoreResult<Self> {
        let body = serde_json::to_string(state)?;
        let revision = i64::try_from(state.revision).map_err(|_| StorageError::Backend {
            backend: "snapshot".to_string(),
            message: format!("revision {} out of range", state.revision),
        })?;
        Ok(Self {
            realm: state.name().to_string(),
            checksum: checksum(&body),
            body,
            revision,
            updated_at: Utc::now().timestamp(),
        })
    }

    /// Verifies and decodes the snapshot. Every failure is reported as corruption.
    pub fn decode(&self) -> StoreResult<RealmState> {
        let location = format!("realm '{}'", self.realm);

        let actual = checksum(&self.body);
        if actual != self.checksum {
            return Err(StorageError::corruption(
                location,
                format!("checksum mismatch: stored {}, computed {actual}", self.checksum),
            ));
        }

        let state: RealmState = serde_json::from_str(&self.body)
            .map_err(|e| StorageError::corruption(&location, format!("unreadable body: {e}")))?;

        if state.name() != self.realm {
            return Err(StorageError::corruption(
                location,
                format!("body belongs to realm '{}'", state.name()),
            ));
        }

        if i64::try_from(state.revision).ok() != Some(self.revision) {
            return Err(StorageError::corruption(
                location,
                format!(
                    "revision mismatch: row {}, body {}",
                    self.revision, state.revision
                ),
            ));
        }

        state
            .validate()
            .map_err(|e| StorageError::corruption(&location, e.to_string()))?;

        Ok(state)
    }
}

pub fn checksum(body: &str) -> String {
    hex::encode(Sha256::digest(body.as_bytes()))
}
