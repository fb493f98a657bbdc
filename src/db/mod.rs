//! Database module for Chorely.
//!
//! Provides pooled database connectivity and schema setup. SQLite is the
//! default backend; PostgreSQL is available behind the `postgres` feature.

mod one_time_token;
mod refresh_token;
mod user;

pub use one_time_token::{NewOneTimeToken, OneTimeToken, OneTimeTokenRepository, TokenPurpose};
pub use refresh_token::{NewRefreshToken, RefreshToken, RefreshTokenRepository};
pub use user::{NewUser, Role, User, UserRepository};

use tracing::{debug, info};

use crate::Result;

/// Connection pool type for the active backend.
#[cfg(feature = "sqlite")]
pub type DbPool = sqlx::SqlitePool;
#[cfg(feature = "postgres")]
pub type DbPool = sqlx::PgPool;

/// Schema statements, executed in order on startup.
#[cfg(feature = "sqlite")]
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'kid',
        password_hash TEXT,
        pin_hash TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    )",
    "CREATE TABLE IF NOT EXISTS one_time_tokens (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL,
        token_hash TEXT NOT NULL UNIQUE,
        purpose TEXT NOT NULL DEFAULT 'session',
        expires_at TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        used_at TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_one_time_tokens_email ON one_time_tokens(email)",
    "CREATE TABLE IF NOT EXISTS refresh_tokens (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        expires_at TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        revoked_at TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_refresh_tokens_user_id ON refresh_tokens(user_id)",
];

#[cfg(feature = "postgres")]
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'kid',
        password_hash TEXT,
        pin_hash TEXT,
        created_at TEXT NOT NULL DEFAULT TO_CHAR(NOW(), 'YYYY-MM-DD HH24:MI:SS'),
        updated_at TEXT NOT NULL DEFAULT TO_CHAR(NOW(), 'YYYY-MM-DD HH24:MI:SS')
    )",
    "CREATE TABLE IF NOT EXISTS one_time_tokens (
        id BIGSERIAL PRIMARY KEY,
        email TEXT NOT NULL,
        token_hash TEXT NOT NULL UNIQUE,
        purpose TEXT NOT NULL DEFAULT 'session',
        expires_at TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT TO_CHAR(NOW(), 'YYYY-MM-DD HH24:MI:SS'),
        used_at TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_one_time_tokens_email ON one_time_tokens(email)",
    "CREATE TABLE IF NOT EXISTS refresh_tokens (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        expires_at TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT TO_CHAR(NOW(), 'YYYY-MM-DD HH24:MI:SS'),
        revoked_at TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_refresh_tokens_user_id ON refresh_tokens(user_id)",
];

/// Database handle wrapping a connection pool.
///
/// Cheap to clone; all clones share the same pool.
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

#[cfg(feature = "sqlite")]
impl Database {
    /// Open a database at the specified path.
    ///
    /// The file and any parent directories are created if missing.
    /// The schema is applied automatically.
    pub async fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
        use std::time::Duration;

        let path = path.as_ref();
        info!("Opening database at {:?}", path);

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| crate::ChorelyError::DatabaseConnection(e.to_string()))?;

        let db = Self { pool };
        db.init_schema().await?;

        Ok(db)
    }

    /// Open an in-memory database for testing.
    ///
    /// In-memory SQLite databases live and die with their connection, so the
    /// pool is pinned to a single connection that never expires.
    pub async fn open_in_memory() -> Result<Self> {
        use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

        debug!("Opening in-memory database");

        let options = SqliteConnectOptions::new()
            .filename(":memory:")
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| crate::ChorelyError::DatabaseConnection(e.to_string()))?;

        let db = Self { pool };
        db.init_schema().await?;

        Ok(db)
    }
}

#[cfg(feature = "postgres")]
impl Database {
    /// Connect to a PostgreSQL database at the given URL.
    ///
    /// The schema is applied automatically.
    pub async fn open(url: &str) -> Result<Self> {
        use sqlx::postgres::PgPoolOptions;

        info!("Connecting to PostgreSQL database");

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| crate::ChorelyError::DatabaseConnection(e.to_string()))?;

        let db = Self { pool };
        db.init_schema().await?;

        Ok(db)
    }
}

impl Database {
    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Apply the schema. Statements are idempotent.
    async fn init_schema(&self) -> Result<()> {
        for stmt in SCHEMA {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| crate::ChorelyError::Database(e.to_string()))?;
        }
        debug!("Database schema initialized");
        Ok(())
    }
}
