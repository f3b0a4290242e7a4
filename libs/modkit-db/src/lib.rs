//! ModKit Database abstraction crate.
//!
//! A single [`DbHandle`] wraps one sqlx pool (SQLite or PostgreSQL) and the
//! matching SeaORM connection. SQLite connections are configured through typed
//! `SqliteConnectOptions`; PRAGMA hints may be passed in the DSN query string
//! (`journal_mode`, `synchronous`, `busy_timeout`).
//!
//! ```rust,no_run
//! # async fn demo() -> modkit_db::Result<()> {
//! use modkit_db::{ConnectOpts, DbHandle};
//!
//! let db = DbHandle::connect("sqlite::memory:", ConnectOpts::default()).await?;
//! let conn = db.sea();
//! # let _ = conn;
//! db.close().await;
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "sqlite")]
mod sqlite;

use std::time::Duration;
use thiserror::Error;

#[cfg(feature = "pg")]
use sqlx::{postgres::PgPoolOptions, PgPool};
#[cfg(feature = "sqlite")]
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    SqlitePool,
};

#[cfg(feature = "sea-orm")]
use sea_orm::DatabaseConnection;
#[cfg(all(feature = "sea-orm", feature = "pg"))]
use sea_orm::SqlxPostgresConnector;
#[cfg(all(feature = "sea-orm", feature = "sqlite"))]
use sea_orm::SqlxSqliteConnector;

/// Library-local result type.
pub type Result<T> = std::result::Result<T, DbError>;

/// Typed error for the DB handle and helpers.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Unknown DSN: {0}")]
    UnknownDsn(String),

    #[error("Feature not enabled: {0}")]
    FeatureDisabled(&'static str),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[cfg(feature = "sea-orm")]
    #[error(transparent)]
    Sea(#[from] sea_orm::DbErr),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Supported engines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DbEngine {
    Postgres,
    Sqlite,
}

/// Connection options; each driver applies the subset it supports.
#[derive(Clone, Debug)]
pub struct ConnectOpts {
    /// Maximum number of connections in the pool. In-memory SQLite is always pinned to one.
    pub max_conns: Option<u32>,
    /// Timeout to acquire a connection from the pool.
    pub acquire_timeout: Option<Duration>,
    /// SQLite busy timeout, unless the DSN carries `busy_timeout`.
    pub busy_timeout: Option<Duration>,
    /// For SQLite file DSNs, create parent directories if missing.
    pub create_sqlite_dirs: bool,
}

impl Default for ConnectOpts {
    fn default() -> Self {
        Self {
            max_conns: Some(10),
            acquire_timeout: Some(Duration::from_secs(30)),
            busy_timeout: Some(Duration::from_millis(DEFAULT_SQLITE_BUSY_TIMEOUT_MS)),
            create_sqlite_dirs: true,
        }
    }
}

const DEFAULT_SQLITE_BUSY_TIMEOUT_MS: u64 = 5000;

/// One concrete sqlx pool.
#[derive(Clone, Debug)]
pub enum DbPool {
    #[cfg(feature = "pg")]
    Postgres(PgPool),
    #[cfg(feature = "sqlite")]
    Sqlite(SqlitePool),
}

/// Main handle.
#[derive(Debug)]
pub struct DbHandle {
    engine: DbEngine,
    pool: DbPool,
    dsn: String,
    #[cfg(feature = "sea-orm")]
    sea: DatabaseConnection,
}

impl DbHandle {
    /// Detect engine by DSN scheme.
    pub fn detect(dsn: &str) -> Result<DbEngine> {
        let s = dsn.trim_start();
        if s.starts_with("postgres://") || s.starts_with("postgresql://") {
            Ok(DbEngine::Postgres)
        } else if s.starts_with("sqlite:") {
            Ok(DbEngine::Sqlite)
        } else {
            Err(DbError::UnknownDsn(redact_credentials_in_dsn(dsn)))
        }
    }

    /// Connect and build handle.
    pub async fn connect(dsn: &str, opts: ConnectOpts) -> Result<Self> {
        let engine = Self::detect(dsn)?;
        match engine {
            #[cfg(feature = "pg")]
            DbEngine::Postgres => {
                let mut o = PgPoolOptions::new();
                if let Some(n) = opts.max_conns {
                    o = o.max_connections(n);
                }
                if let Some(t) = opts.acquire_timeout {
                    o = o.acquire_timeout(t);
                }
                let pool = o.connect(dsn).await?;
                tracing::info!(dsn = %redact_credentials_in_dsn(dsn), "connected to PostgreSQL");
                #[cfg(feature = "sea-orm")]
                let sea = SqlxPostgresConnector::from_sqlx_postgres_pool(pool.clone());
                Ok(Self {
                    engine,
                    pool: DbPool::Postgres(pool),
                    dsn: dsn.to_string(),
                    #[cfg(feature = "sea-orm")]
                    sea,
                })
            }
            #[cfg(feature = "sqlite")]
            DbEngine::Sqlite => {
                let (clean_dsn, pragmas) = sqlite::split_pragmas(dsn);
                let memory = sqlite::is_memory_dsn(&clean_dsn);
                sqlite::prepare_sqlite_path(&clean_dsn, opts.create_sqlite_dirs)?;

                let mut co: SqliteConnectOptions = clean_dsn.parse()?;
                co = co.synchronous(pragmas.synchronous.unwrap_or(SqliteSynchronous::Normal));
                if memory {
                    co = co.journal_mode(SqliteJournalMode::Memory);
                } else {
                    co = co
                        .create_if_missing(true)
                        .journal_mode(pragmas.journal_mode.unwrap_or(SqliteJournalMode::Wal));
                    if let Some(t) = pragmas.busy_timeout.or(opts.busy_timeout) {
                        co = co.busy_timeout(t);
                    }
                }

                let mut o = SqlitePoolOptions::new();
                if memory {
                    // Every connection to :memory: is a separate database; keep exactly one alive.
                    o = o
                        .max_connections(1)
                        .min_connections(1)
                        .idle_timeout(None)
                        .max_lifetime(None);
                } else if let Some(n) = opts.max_conns {
                    o = o.max_connections(n);
                }
                if let Some(t) = opts.acquire_timeout {
                    o = o.acquire_timeout(t);
                }

                let pool = o.connect_with(co).await?;
                tracing::info!(dsn = %clean_dsn, memory, "connected to SQLite");
                #[cfg(feature = "sea-orm")]
                let sea = SqlxSqliteConnector::from_sqlx_sqlite_pool(pool.clone());

                Ok(Self {
                    engine,
                    pool: DbPool::Sqlite(pool),
                    dsn: clean_dsn,
                    #[cfg(feature = "sea-orm")]
                    sea,
                })
            }
            #[cfg(not(feature = "pg"))]
            DbEngine::Postgres => Err(DbError::FeatureDisabled("PostgreSQL feature not enabled")),
            #[cfg(not(feature = "sqlite"))]
            DbEngine::Sqlite => Err(DbError::FeatureDisabled("SQLite feature not enabled")),
        }
    }

    /// Graceful pool close.
    pub async fn close(&self) {
        match &self.pool {
            #[cfg(feature = "pg")]
            DbPool::Postgres(p) => p.close().await,
            #[cfg(feature = "sqlite")]
            DbPool::Sqlite(p) => p.close().await,
        }
    }

    pub fn engine(&self) -> DbEngine {
        self.engine
    }

    /// DSN used for this connection, without PRAGMA parameters.
    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    #[cfg(feature = "pg")]
    pub fn sqlx_postgres(&self) -> Option<&PgPool> {
        match self.pool {
            DbPool::Postgres(ref p) => Some(p),
            #[cfg(feature = "sqlite")]
            _ => None,
        }
    }

    #[cfg(feature = "sqlite")]
    pub fn sqlx_sqlite(&self) -> Option<&SqlitePool> {
        match self.pool {
            DbPool::Sqlite(ref p) => Some(p),
            #[cfg(feature = "pg")]
            _ => None,
        }
    }

    /// SeaORM connection (clone; cheap handle).
    #[cfg(feature = "sea-orm")]
    pub fn sea(&self) -> DatabaseConnection {
        self.sea.clone()
    }

    #[cfg(feature = "sea-orm")]
    pub fn seaorm(&self) -> &DatabaseConnection {
        &self.sea
    }
}

/// Replace the password of a URL-style DSN with `***` for logging.
pub fn redact_credentials_in_dsn(dsn: &str) -> String {
    match url::Url::parse(dsn) {
        Ok(mut u) if u.password().is_some() => {
            let _ = u.set_password(Some("***"));
            u.to_string()
        }
        _ => dsn.to_string(),
    }
}
