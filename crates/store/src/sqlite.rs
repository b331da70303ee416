//! SQLite 存储后端实现
//!
//! 使用 sqlx 提供原生异步 SQLite 存储支持。数据库文件为
//! `{working_directory}/partix.db`，表 `realm_state` 每个 Realm 一行。

use async_trait::async_trait;
use partix_common::config::store::DATABASE_FILE;
use partix_common::{RealmState, StorageError};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

use crate::backend::{StateStore, StoreResult};
use crate::snapshot::Snapshot;

/// SQLITE_CORRUPT / SQLITE_NOTADB
const CORRUPTION_CODES: [&str; 2] = ["11", "26"];

/// WAL 模式下与数据库文件同目录的附属文件
const SIDECAR_SUFFIXES: [&str; 2] = ["-wal", "-shm"];

/// SQLite 存储后端
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    file: PathBuf,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("file", &self.file)
            .finish()
    }
}

impl SqliteStore {
    /// 打开（必要时创建）`dir` 下的数据库并建表
    pub async fn open(dir: &Path) -> StoreResult<Self> {
        tokio::fs::create_dir_all(dir).await?;
        let file = dir.join(DATABASE_FILE);

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", file.display()))
            .map_err(|e| classify(e, &file))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Full)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| classify(e, &file))?;

        let store = Self { pool, file };
        store.init().await?;

        info!(
            "SQLite identity store opened: path={}, WAL mode enabled",
            store.file.display()
        );

        Ok(store)
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    /// 删除 `dir` 下的数据库文件及其 `-wal`/`-shm`，不检查内容
    ///
    /// 返回实际删除的文件数，文件不存在不算错误。
    pub async fn discard(dir: &Path) -> StoreResult<usize> {
        let file = dir.join(DATABASE_FILE);
        let mut targets = vec![file.clone()];
        for suffix in SIDECAR_SUFFIXES {
            let mut name = file.clone().into_os_string();
            name.push(suffix);
            targets.push(PathBuf::from(name));
        }

        let mut removed = 0;
        for target in &targets {
            match tokio::fs::remove_file(target).await {
                Ok(()) => {
                    debug!("Removed {}", target.display());
                    removed += 1;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        if removed > 0 {
            info!("Discarded SQLite identity store at {}", file.display());
        }
        Ok(removed)
    }
}

/// Maps sqlx errors that mean "this file is not a sound database" to corruption.
fn classify(err: sqlx::Error, file: &Path) -> StorageError {
    if let sqlx::Error::Database(db) = &err {
        let by_code = db
            .code()
            .is_some_and(|code| CORRUPTION_CODES.iter().any(|c| code == *c));
        let message = db.message().to_ascii_lowercase();
        if by_code || message.contains("not a database") || message.contains("malformed") {
            return StorageError::corruption(file.display().to_string(), db.message());
        }
    }
    StorageError::Sqlite(err)
}

#[async_trait]
impl StateStore for SqliteStore {
    async fn init(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS realm_state (
                realm_name TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                checksum TEXT NOT NULL,
                revision INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| classify(e, &self.file))?;

        debug!("realm_state table initialized");
        Ok(())
    }

    async fn load_all(&self) -> StoreResult<Vec<RealmState>> {
        let rows = sqlx::query_as::<_, (String, String, String, i64, i64)>(
            "SELECT realm_name, body, checksum, revision, updated_at FROM realm_state ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| classify(e, &self.file))?;

        let mut states = Vec::with_capacity(rows.len());
        for (realm, body, checksum, revision, updated_at) in rows {
            let snapshot = Snapshot {
                realm,
                body,
                checksum,
                revision,
                updated_at,
            };
            states.push(snapshot.decode()?);
        }

        debug!("Loaded {} realm(s) from {}", states.len(), self.file.display());
        Ok(states)
    }

    async fn save(&self, state: &RealmState) -> StoreResult<()> {
        let snapshot = Snapshot::encode(state)?;

        sqlx::query(
            r#"INSERT INTO realm_state (realm_name, body, checksum, revision, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5)
               ON CONFLICT(realm_name) DO UPDATE SET
                   body = excluded.body,
                   checksum = excluded.checksum,
                   revision = excluded.revision,
                   updated_at = excluded.updated_at"#,
        )
        .bind(&snapshot.realm)
        .bind(&snapshot.body)
        .bind(&snapshot.checksum)
        .bind(snapshot.revision)
        .bind(snapshot.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| classify(e, &self.file))?;

        debug!(
            realm = %snapshot.realm,
            revision = snapshot.revision,
            bytes = snapshot.body.len(),
            "Realm state saved"
        );
        Ok(())
    }

    async fn remove(&self, realm: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM realm_state WHERE realm_name = ?")
            .bind(realm)
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, &self.file))?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM realm_state")
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, &self.file))?;

        let removed = result.rows_affected();
        if removed > 0 {
            info!("Cleared {} realm(s) from {}", removed, self.file.display());
        }
        Ok(removed)
    }

    fn backend_name(&self) -> &'static str {
        "SQLite"
    }
}
