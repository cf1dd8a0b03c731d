//! Connection handle: owns the sqlx pool and the `SeaORM` connection built on it.

use std::str::FromStr;
use std::sync::Arc;

use sea_orm::DatabaseConnection;

#[cfg(any(feature = "pg", feature = "mysql", feature = "sqlite"))]
use sea_orm::sqlx::ConnectOptions;
#[cfg(feature = "mysql")]
use sea_orm::sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
#[cfg(feature = "pg")]
use sea_orm::sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
#[cfg(feature = "sqlite")]
use sea_orm::sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

#[cfg(feature = "mysql")]
use sea_orm::SqlxMySqlConnector;
#[cfg(feature = "pg")]
use sea_orm::SqlxPostgresConnector;
#[cfg(feature = "sqlite")]
use sea_orm::SqlxSqliteConnector;

use crate::clock::{Clock, SystemClock};
use crate::config::DbConfig;
use crate::dsn::{detect_engine, redact_credentials_in_dsn};
#[cfg(any(feature = "pg", feature = "mysql", feature = "sqlite"))]
use crate::pool_opts::ApplyPoolOpts;
use crate::session::Session;
use crate::{DbEngine, DbError, Result};

#[cfg(feature = "mysql")]
const MYSQL_DEFAULT_CHARSET: &str = "utf8mb4";

/// Engine-specific sqlx pool.
#[derive(Debug, Clone)]
enum DbPool {
    #[cfg(feature = "pg")]
    Postgres(PgPool),
    #[cfg(feature = "mysql")]
    MySql(MySqlPool),
    #[cfg(feature = "sqlite")]
    Sqlite(SqlitePool),
}

/// Explicitly owned database handle.
///
/// Cloning is cheap and shares the pool. The pool lives until [`DbHandle::close`]
/// is called or the last clone is dropped.
#[derive(Debug, Clone)]
pub struct DbHandle {
    engine: DbEngine,
    pool: DbPool,
    dsn: String,
    sea: DatabaseConnection,
}

impl DbHandle {
    /// Connect with default pool settings.
    ///
    /// # Errors
    /// Same as [`DbHandle::connect`].
    pub async fn connect_dsn(dsn: &str) -> Result<Self> {
        Self::connect(&DbConfig::from_dsn(dsn)).await
    }

    /// Connect and build the handle.
    ///
    /// The DSN has `${VAR}` references expanded and per-driver defaults
    /// applied (see [`DbConfig::effective_pool`]).
    ///
    /// # Errors
    /// Returns an error if the DSN is invalid, the backend feature is not
    /// enabled or the connection fails.
    pub async fn connect(cfg: &DbConfig) -> Result<Self> {
        let dsn = cfg.resolved_dsn()?;
        let engine = detect_engine(&dsn)?;
        let pool_cfg = cfg.effective_pool(&dsn)?;
        let redacted = redact_credentials_in_dsn(Some(&dsn));

        let pool = match engine {
            #[cfg(feature = "pg")]
            DbEngine::Postgres => {
                let mut opts = PgConnectOptions::from_str(&dsn)?;
                if !cfg.echo {
                    opts = opts.disable_statement_logging();
                }
                let pool = PgPoolOptions::new()
                    .apply(&pool_cfg)
                    .connect_with(opts)
                    .await?;
                DbPool::Postgres(pool)
            }
            #[cfg(not(feature = "pg"))]
            DbEngine::Postgres => {
                return Err(DbError::FeatureDisabled("PostgreSQL feature not enabled"));
            }
            #[cfg(feature = "mysql")]
            DbEngine::MySql => {
                let mut opts = MySqlConnectOptions::from_str(&dsn)?;
                if !has_query_param(&dsn, "charset")? {
                    opts = opts.charset(MYSQL_DEFAULT_CHARSET);
                }
                if !cfg.echo {
                    opts = opts.disable_statement_logging();
                }
                let pool = MySqlPoolOptions::new()
                    .apply(&pool_cfg)
                    .connect_with(opts)
                    .await?;
                DbPool::MySql(pool)
            }
            #[cfg(not(feature = "mysql"))]
            DbEngine::MySql => {
                return Err(DbError::FeatureDisabled("MySQL feature not enabled"));
            }
            #[cfg(feature = "sqlite")]
            DbEngine::Sqlite => {
                let mut opts = SqliteConnectOptions::from_str(&dsn)?.create_if_missing(true);
                if !cfg.echo {
                    opts = opts.disable_statement_logging();
                }
                let pool = SqlitePoolOptions::new()
                    .apply(&pool_cfg)
                    .connect_with(opts)
                    .await?;
                DbPool::Sqlite(pool)
            }
            #[cfg(not(feature = "sqlite"))]
            DbEngine::Sqlite => {
                return Err(DbError::FeatureDisabled("SQLite feature not enabled"));
            }
        };

        let sea = match &pool {
            #[cfg(feature = "pg")]
            DbPool::Postgres(p) => SqlxPostgresConnector::from_sqlx_postgres_pool(p.clone()),
            #[cfg(feature = "mysql")]
            DbPool::MySql(p) => SqlxMySqlConnector::from_sqlx_mysql_pool(p.clone()),
            #[cfg(feature = "sqlite")]
            DbPool::Sqlite(p) => SqlxSqliteConnector::from_sqlx_sqlite_pool(p.clone()),
        };

        tracing::info!(
            engine = engine.as_str(),
            dsn = %redacted,
            max_conns = pool_cfg.max_conns,
            echo = cfg.echo,
            "Connected to database"
        );

        Ok(Self {
            engine,
            pool,
            dsn: redacted,
            sea,
        })
    }

    /// Graceful pool close. Dropping every clone also closes it.
    pub async fn close(self) {
        tracing::info!(engine = self.engine.as_str(), dsn = %self.dsn, "Closing database pool");
        match self.pool {
            #[cfg(feature = "pg")]
            DbPool::Postgres(p) => p.close().await,
            #[cfg(feature = "mysql")]
            DbPool::MySql(p) => p.close().await,
            #[cfg(feature = "sqlite")]
            DbPool::Sqlite(p) => p.close().await,
        }
    }

    /// Get the backend.
    #[must_use]
    pub fn engine(&self) -> DbEngine {
        self.engine
    }

    /// DSN of this connection with the password redacted.
    #[must_use]
    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    /// Raw `SeaORM` connection for queries the session does not cover.
    #[must_use]
    pub fn conn(&self) -> &DatabaseConnection {
        &self.sea
    }

    #[cfg(feature = "sqlite")]
    #[must_use]
    pub fn sqlx_sqlite(&self) -> Option<&SqlitePool> {
        match self.pool {
            DbPool::Sqlite(ref p) => Some(p),
            #[cfg(any(feature = "pg", feature = "mysql"))]
            _ => None,
        }
    }

    #[cfg(feature = "pg")]
    #[must_use]
    pub fn sqlx_postgres(&self) -> Option<&PgPool> {
        match self.pool {
            DbPool::Postgres(ref p) => Some(p),
            #[cfg(any(feature = "mysql", feature = "sqlite"))]
            _ => None,
        }
    }

    #[cfg(feature = "mysql")]
    #[must_use]
    pub fn sqlx_mysql(&self) -> Option<&MySqlPool> {
        match self.pool {
            DbPool::MySql(ref p) => Some(p),
            #[cfg(any(feature = "pg", feature = "sqlite"))]
            _ => None,
        }
    }

    /// Unit-of-work entry point stamped by the system clock.
    #[must_use]
    pub fn session(&self) -> Session {
        self.session_with_clock(Arc::new(SystemClock))
    }

    /// Unit-of-work entry point stamped by `clock`.
    #[must_use]
    pub fn session_with_clock(&self, clock: Arc<dyn Clock>) -> Session {
        Session::new(self.sea.clone(), clock)
    }
}

#[cfg(feature = "mysql")]
fn has_query_param(dsn: &str, key: &str) -> Result<bool> {
    let url = url::Url::parse(dsn)?;
    Ok(url.query_pairs().any(|(k, _)| k == key))
}
