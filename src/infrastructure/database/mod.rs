//! SQLite user store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::application::errors::StorageError;
use crate::domain::entities::{Profile, User, UserStatus};
use crate::domain::traits::UserStore;

const USER_COLUMNS: &str =
    "id, external_id, display_name, status, kind, settings, created_at, updated_at";

/// Where a connection string points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    Memory,
    File(PathBuf),
}

impl DatabaseLocation {
    /// Parse `sqlite://path`, `sqlite:path`, `sqlite::memory:`, `:memory:` or a bare path
    pub fn parse(url: &str) -> Result<Self, StorageError> {
        let url = url.trim();
        let rest = if let Some(rest) = url.strip_prefix("sqlite://") {
            rest
        } else if let Some(rest) = url.strip_prefix("sqlite:") {
            rest
        } else if url.contains("://") {
            return Err(StorageError::InvalidUrl(format!(
                "only sqlite is supported, got '{}'",
                url
            )));
        } else {
            url
        };

        match rest {
            "" => Err(StorageError::InvalidUrl(format!("no database path in '{}'", url))),
            ":memory:" => Ok(DatabaseLocation::Memory),
            path => Ok(DatabaseLocation::File(PathBuf::from(path))),
        }
    }
}

/// SQLite-backed store. One connection, serialized behind a mutex; all
/// queries run on the blocking thread pool.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(url: &str) -> Result<Self, StorageError> {
        let conn = match DatabaseLocation::parse(url)? {
            DatabaseLocation::Memory => Connection::open_in_memory()?,
            DatabaseLocation::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| StorageError::InvalidUrl(format!("{}: {}", parent.display(), e)))?;
                }
                Connection::open(path)?
            }
        };

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.with_conn(init_tables)?;
        Ok(db)
    }

    pub fn in_memory() -> Result<Self, StorageError> {
        Self::open(":memory:")
    }

    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T, StorageError>) -> Result<T, StorageError> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| StorageError::Task("connection lock poisoned".to_string()))?;
        f(&mut conn)
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.with_conn(f))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?
    }
}

fn init_tables(conn: &mut Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS user (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            external_id INTEGER UNIQUE NOT NULL,
            display_name TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'active',
            kind TEXT NOT NULL DEFAULT 'individual',
            settings TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );",
    )?;
    Ok(())
}

fn parse_time(column: &str, raw: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StorageError::Corrupt(format!("{}: {}", column, e)))
}

/// Raw column values, converted outside the rusqlite row callback
struct UserRow {
    id: i64,
    external_id: i64,
    display_name: String,
    status: String,
    kind: String,
    settings: String,
    created_at: String,
    updated_at: String,
}

impl UserRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            external_id: row.get(1)?,
            display_name: row.get(2)?,
            status: row.get(3)?,
            kind: row.get(4)?,
            settings: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn into_user(self) -> Result<User, StorageError> {
        Ok(User {
            id: self.id,
            external_id: self.external_id,
            display_name: self.display_name,
            status: self.status.parse().map_err(StorageError::Corrupt)?,
            kind: self.kind.parse().map_err(StorageError::Corrupt)?,
            settings: serde_json::from_str(&self.settings)?,
            created_at: parse_time("created_at", &self.created_at)?,
            updated_at: parse_time("updated_at", &self.updated_at)?,
        })
    }
}

fn select_user(conn: &Connection, external_id: i64) -> Result<Option<User>, StorageError> {
    let row = conn
        .query_row(
            &format!("SELECT {} FROM user WHERE external_id = ?1", USER_COLUMNS),
            [external_id],
            UserRow::read,
        )
        .optional()?;
    row.map(UserRow::into_user).transpose()
}

fn get_or_create(conn: &mut Connection, profile: &Profile) -> Result<User, StorageError> {
    let tx = conn.transaction()?;
    let now = Utc::now().to_rfc3339();

    let inserted = tx.execute(
        "INSERT INTO user (external_id, display_name, status, kind, settings, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, '{}', ?5, ?5)
         ON CONFLICT(external_id) DO NOTHING",
        params![
            profile.external_id,
            profile.display_name(),
            UserStatus::Active.as_str(),
            profile.kind.as_str(),
            now
        ],
    )?;

    let user = select_user(&tx, profile.external_id)?.ok_or_else(|| {
        StorageError::Corrupt(format!("user {} missing after upsert", profile.external_id))
    })?;
    tx.commit()?;

    if inserted > 0 {
        tracing::info!("Created {}", user);
    }
    Ok(user)
}

#[async_trait]
impl UserStore for Database {
    async fn get_or_create_user(&self, profile: &Profile) -> Result<User, StorageError> {
        let profile = profile.clone();
        self.blocking(move |conn| get_or_create(conn, &profile)).await
    }

    async fn get_user(&self, external_id: i64) -> Result<Option<User>, StorageError> {
        self.blocking(move |conn| select_user(conn, external_id)).await
    }

    async fn set_status(&self, external_id: i64, status: UserStatus) -> Result<bool, StorageError> {
        self.blocking(move |conn| {
            let rows = conn.execute(
                "UPDATE user SET status = ?1, updated_at = ?2 WHERE external_id = ?3",
                params![status.as_str(), Utc::now().to_rfc3339(), external_id],
            )?;
            Ok(rows > 0)
        })
        .await
    }

    async fn list_users(&self) -> Result<Vec<User>, StorageError> {
        self.blocking(|conn| {
            let mut stmt = conn.prepare(&format!("SELECT {} FROM user ORDER BY id", USER_COLUMNS))?;
            let rows = stmt.query_map([], UserRow::read)?;

            let mut users = Vec::new();
            for row in rows {
                users.push(row?.into_user()?);
            }
            Ok(users)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::UserKind;

    #[test]
    fn parses_connection_strings() {
        assert_eq!(DatabaseLocation::parse(":memory:").unwrap(), DatabaseLocation::Memory);
        assert_eq!(DatabaseLocation::parse("sqlite::memory:").unwrap(), DatabaseLocation::Memory);
        assert_eq!(
            DatabaseLocation::parse("sqlite:///var/lib/bot.db").unwrap(),
            DatabaseLocation::File(PathBuf::from("/var/lib/bot.db"))
        );
        assert_eq!(
            DatabaseLocation::parse("sqlite://db.sqlite3").unwrap(),
            DatabaseLocation::File(PathBuf::from("db.sqlite3"))
        );
        assert_eq!(
            DatabaseLocation::parse("bot.db").unwrap(),
            DatabaseLocation::File(PathBuf::from("bot.db"))
        );
        assert!(DatabaseLocation::parse("postgres://localhost/bot").is_err());
        assert!(DatabaseLocation::parse("sqlite://").is_err());
    }

    #[tokio::test]
    async fn creates_once_then_returns_same_row() {
        let db = Database::in_memory().unwrap();
        let profile = Profile::new(555).with_name("Ada", Some("Lovelace"));

        let first = db.get_or_create_user(&profile).await.unwrap();
        let second = db.get_or_create_user(&profile).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.display_name, "Ada Lovelace");
        assert_eq!(first.status, UserStatus::Active);
        assert!(first.settings.is_empty());
        assert_eq!(db.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn existing_row_is_not_refreshed() {
        let db = Database::in_memory().unwrap();
        db.get_or_create_user(&Profile::new(9).with_name("Before", None::<String>))
            .await
            .unwrap();

        let again = db
            .get_or_create_user(&Profile::new(9).with_kind(UserKind::Group).with_title("After"))
            .await
            .unwrap();

        assert_eq!(again.display_name, "Before");
        assert_eq!(again.kind, UserKind::Individual);
    }

    #[tokio::test]
    async fn concurrent_first_contact_creates_one_row() {
        let db = Database::in_memory().unwrap();

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let db = db.clone();
                tokio::spawn(async move {
                    db.get_or_create_user(&Profile::new(77).with_name("Racer", None::<String>))
                        .await
                })
            })
            .collect();

        let mut ids = Vec::new();
        for task in tasks {
            ids.push(task.await.unwrap().unwrap().id);
        }

        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(db.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn status_update_round_trip() {
        let db = Database::in_memory().unwrap();
        let user = db
            .get_or_create_user(&Profile::new(-1001).with_kind(UserKind::Channel).with_title("News"))
            .await
            .unwrap();
        assert_eq!(user.kind, UserKind::Channel);

        assert!(db.set_status(-1001, UserStatus::TemporarilyBanned).await.unwrap());
        assert!(!db.set_status(12345, UserStatus::Suspended).await.unwrap());

        let stored = db.get_user(-1001).await.unwrap().unwrap();
        assert_eq!(stored.status, UserStatus::TemporarilyBanned);
        assert!(stored.updated_at >= stored.created_at);
    }

    #[tokio::test]
    async fn persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("nested/bot.db").display());

        {
            let db = Database::open(&url).unwrap();
            db.get_or_create_user(&Profile::new(1).with_name("Kept", None::<String>))
                .await
                .unwrap();
        }

        let reopened = Database::open(&url).unwrap();
        let user = reopened.get_user(1).await.unwrap().unwrap();
        assert_eq!(user.display_name, "Kept");
    }
}
