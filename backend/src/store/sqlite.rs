use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

use super::UserUpsert;
use crate::models::user::User;

const USER_COLUMNS: &str =
    "id, openid, unionid, nickname, avatar_url, is_active, last_login, date_joined";

/// SQLite-backed user table keyed by openid.
pub struct UserStore {
    conn: Mutex<Connection>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("IO error: {0}")]
    IoError(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::DatabaseError(e.to_string())
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        openid: row.get(1)?,
        unionid: row.get(2)?,
        nickname: row.get(3)?,
        avatar_url: row.get(4)?,
        is_active: row.get(5)?,
        last_login: row.get(6)?,
        date_joined: row.get(7)?,
    })
}

impl UserStore {
    pub fn new(database_url: &str) -> Result<Self, StoreError> {
        // Parse sqlite: prefix if present
        let path = database_url.strip_prefix("sqlite:").unwrap_or(database_url);

        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            // Create parent directories if needed
            if let Some(parent) = Path::new(path).parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::IoError(e.to_string()))?;
            }
            Connection::open(path)?
        };

        // Other processes may hold the write lock for a moment.
        conn.busy_timeout(Duration::from_secs(5))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS wechat_users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                openid TEXT NOT NULL UNIQUE CHECK (length(openid) <= 100),
                unionid TEXT UNIQUE CHECK (length(unionid) <= 100),
                nickname TEXT,
                avatar_url TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                last_login TEXT NOT NULL,
                date_joined TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_wechat_users_last_login ON wechat_users(last_login);",
        )?;

        tracing::info!("User store initialized with database: {}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create the user for `upsert.openid`, or overwrite its mutable fields.
    ///
    /// Returns the stored row and whether it was created by this call. The
    /// lookup and the write share one immediate transaction, and the write
    /// itself is an `ON CONFLICT` upsert, so concurrent logins for the same
    /// openid always end up on a single row. `is_active` is left as it is.
    pub fn upsert_user(&self, upsert: &UserUpsert) -> Result<(User, bool), StoreError> {
        let mut conn = self.conn.lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM wechat_users WHERE openid = ?1",
                params![upsert.openid],
                |row| row.get(0),
            )
            .optional()?;

        let now = Utc::now();
        let user = tx.query_row(
            &format!(
                "INSERT INTO wechat_users (openid, unionid, nickname, avatar_url, is_active, last_login, date_joined)
                 VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)
                 ON CONFLICT(openid) DO UPDATE SET
                    unionid = excluded.unionid,
                    nickname = excluded.nickname,
                    avatar_url = excluded.avatar_url,
                    last_login = excluded.last_login
                 RETURNING {USER_COLUMNS}"
            ),
            params![upsert.openid, upsert.unionid, upsert.nickname, upsert.avatar_url, now],
            user_from_row,
        )?;

        tx.commit()?;

        let created = existing.is_none();
        if created {
            tracing::info!("Created new user: {} (id {})", user.openid, user.id);
        } else {
            tracing::debug!("Updated user: {} (id {})", user.openid, user.id);
        }

        Ok((user, created))
    }

    pub fn find_by_openid(&self, openid: &str) -> Result<Option<User>, StoreError> {
        let conn = self.conn.lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let user = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM wechat_users WHERE openid = ?1"),
                params![openid],
                user_from_row,
            )
            .optional()?;

        Ok(user)
    }

    /// Enable or disable a user. Returns `false` when the openid is unknown.
    pub fn set_active(&self, openid: &str, active: bool) -> Result<bool, StoreError> {
        let conn = self.conn.lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let changed = conn.execute(
            "UPDATE wechat_users SET is_active = ?1 WHERE openid = ?2",
            params![active, openid],
        )?;

        if changed > 0 {
            tracing::info!("Set user {} active={}", openid, active);
        }
        Ok(changed > 0)
    }

    pub fn count_users(&self) -> Result<i64, StoreError> {
        let conn = self.conn.lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let count = conn.query_row("SELECT COUNT(*) FROM wechat_users", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_store() -> UserStore {
        UserStore::new(":memory:").unwrap()
    }

    fn upsert(openid: &str, nickname: Option<&str>) -> UserUpsert {
        UserUpsert {
            openid: openid.to_string(),
            unionid: None,
            nickname: nickname.map(String::from),
            avatar_url: None,
        }
    }

    #[test]
    fn test_first_upsert_creates_user() {
        let store = memory_store();
        let (user, created) = store.upsert_user(&upsert("abc123", Some("Alice"))).unwrap();

        assert!(created);
        assert_eq!(user.id, 1);
        assert_eq!(user.openid, "abc123");
        assert_eq!(user.unionid, None);
        assert_eq!(user.nickname.as_deref(), Some("Alice"));
        assert!(user.is_active);
        assert_eq!(user.last_login, user.date_joined);
    }

    #[test]
    fn test_repeated_upsert_keeps_one_row() {
        let store = memory_store();
        let (first, _) = store.upsert_user(&upsert("abc123", Some("Alice"))).unwrap();
        for _ in 0..3 {
            let (again, created) = store.upsert_user(&upsert("abc123", Some("Alice"))).unwrap();
            assert!(!created);
            assert_eq!(again.id, first.id);
        }
        assert_eq!(store.count_users().unwrap(), 1);
    }

    #[test]
    fn test_date_joined_is_stable() {
        let store = memory_store();
        let (first, _) = store.upsert_user(&upsert("abc123", None)).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        let (second, _) = store.upsert_user(&upsert("abc123", None)).unwrap();

        assert_eq!(second.date_joined, first.date_joined);
        assert!(second.last_login > first.last_login);
    }

    #[test]
    fn test_upsert_overwrites_instead_of_merging() {
        let store = memory_store();
        store
            .upsert_user(&UserUpsert {
                openid: "abc123".to_string(),
                unionid: Some("u-1".to_string()),
                nickname: Some("Alice".to_string()),
                avatar_url: Some("https://example.com/a.png".to_string()),
            })
            .unwrap();

        let (user, _) = store.upsert_user(&upsert("abc123", None)).unwrap();
        assert_eq!(user.unionid, None);
        assert_eq!(user.nickname, None);
        assert_eq!(user.avatar_url, None);

        let stored = store.find_by_openid("abc123").unwrap().unwrap();
        assert_eq!(stored.nickname, None);
    }

    #[test]
    fn test_distinct_openids_get_distinct_rows() {
        let store = memory_store();
        let (a, _) = store.upsert_user(&upsert("a", None)).unwrap();
        let (b, _) = store.upsert_user(&upsert("b", None)).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(store.count_users().unwrap(), 2);
    }

    #[test]
    fn test_unionid_must_be_unique() {
        let store = memory_store();
        let mut first = upsert("a", None);
        first.unionid = Some("shared".to_string());
        store.upsert_user(&first).unwrap();

        let mut second = upsert("b", None);
        second.unionid = Some("shared".to_string());
        assert!(matches!(
            store.upsert_user(&second),
            Err(StoreError::DatabaseError(_))
        ));
        assert_eq!(store.count_users().unwrap(), 1);
    }

    #[test]
    fn test_upsert_keeps_active_flag() {
        let store = memory_store();
        store.upsert_user(&upsert("abc123", Some("Alice"))).unwrap();
        assert!(store.set_active("abc123", false).unwrap());

        let (user, created) = store.upsert_user(&upsert("abc123", Some("Mallory"))).unwrap();
        assert!(!created);
        assert_eq!(user.nickname.as_deref(), Some("Mallory"));
        assert!(!user.is_active);

        assert!(store.set_active("abc123", true).unwrap());
        let (user, _) = store.upsert_user(&upsert("abc123", None)).unwrap();
        assert!(user.is_active);
    }

    #[test]
    fn test_set_active_unknown_user() {
        assert!(!memory_store().set_active("nobody", false).unwrap());
    }

    #[test]
    fn test_find_unknown_user() {
        assert!(memory_store().find_by_openid("nobody").unwrap().is_none());
    }

    #[test]
    fn test_file_database_persists_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("nested/users.db").display());

        UserStore::new(&url).unwrap().upsert_user(&upsert("abc123", None)).unwrap();

        let reopened = UserStore::new(&url).unwrap();
        let (user, created) = reopened.upsert_user(&upsert("abc123", None)).unwrap();
        assert!(!created);
        assert_eq!(user.id, 1);
    }

    #[test]
    fn test_concurrent_upserts_share_one_row() {
        let store = std::sync::Arc::new(memory_store());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || store.upsert_user(&upsert("race", None)).unwrap())
            })
            .collect();

        let results: Vec<(User, bool)> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|(_, created)| *created).count(), 1);
        assert!(results.iter().all(|(user, _)| user.id == results[0].0.id));
        assert_eq!(store.count_users().unwrap(), 1);
    }
}
