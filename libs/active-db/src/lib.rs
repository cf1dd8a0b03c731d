#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Active-record helpers on top of `SeaORM`.
//!
//! This crate does not generate SQL or manage connections on its own. It wraps
//! `SeaORM` (and the `SQLx` pools underneath) with a small set of conveniences:
//!
//! - [`DbHandle`]: an explicitly owned connection pool with `connect` / `close`
//! - [`Session`]: a unit-of-work entry point with `create` / `get` / `update` /
//!   `delete` and the soft-delete lifecycle
//! - [`EntityDescriptor`]: per-entity capability listing (auto id, timestamps,
//!   soft delete) and a [`Registry`] that creates and drops registered tables
//! - [`Paginator`]: page arithmetic, bounded fetches and windowed page numbers
//!
//! # Features
//! - `sqlite` (default), `pg`, `mysql`: enable `SQLx` backends
//!
//! # Example
//! ```rust,ignore
//! use active_db::{DbConfig, DbHandle, DeleteMode, PageRequest, Paginate, Registry};
//!
//! let db = DbHandle::connect(&DbConfig::from_dsn("sqlite::memory:")).await?;
//! Registry::new().register::<user::Entity>()?.create_all(&db).await?;
//!
//! let session = db.session();
//! let alice = session
//!     .create::<user::Entity>(user::ActiveModel {
//!         name: Set("alice".to_owned()),
//!         ..Default::default()
//!     })
//!     .await?;
//!
//! let alice = session.delete::<user::Entity>(alice, DeleteMode::Soft).await?;
//!
//! let page = session
//!     .all::<user::Entity>(false)
//!     .paginate_with(session.conn(), PageRequest::new(1).per_page(20))
//!     .await?;
//! for n in page.pages() {
//!     // Some(n) is a page link, None is an ellipsis
//! }
//! db.close().await;
//! ```

#![cfg_attr(
    not(any(feature = "pg", feature = "mysql", feature = "sqlite")),
    allow(
        unused_imports,
        unused_variables,
        dead_code,
        unreachable_code,
        unused_lifetimes,
        clippy::unused_async,
    )
)]

pub mod clock;
pub mod config;
pub mod dsn;
pub mod entity;
pub mod handle;
pub mod lifecycle;
pub mod paginate;
pub mod record;
pub mod session;

// Internal modules
mod pool_opts;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{DbConfig, PoolCfg};
pub use entity::{ActiveEntity, Capabilities, EntityDescriptor, Registry};
pub use handle::DbHandle;
pub use lifecycle::{DeleteMode, LifecycleState};
pub use paginate::{
    OnEmptyPage, PageNumber, PageRequest, PageWindow, Paginate, Paginator, Queryable,
    SelectQuery, WindowCfg,
};
pub use record::{ActiveRecord, RecordExt};
pub use session::Session;

use thiserror::Error;

/// Library-local result type.
pub type Result<T> = std::result::Result<T, DbError>;

/// Boxed error supplied by callers (e.g. the empty-page hook).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Typed error for the handle, the session and the paginator.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Unknown DSN: {0}")]
    UnknownDsn(String),

    #[error("Feature not enabled: {0}")]
    FeatureDisabled(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid pagination parameters: {0}")]
    InvalidPagination(String),

    #[error("Page {page} is empty ({num_pages} pages available)")]
    EmptyPage {
        page: u64,
        num_pages: u64,
        #[source]
        source: BoxError,
    },

    #[error("Table name for model '{model}' must be '{expected}', entity declares '{declared}'")]
    TableNameMismatch {
        model: &'static str,
        expected: String,
        declared: String,
    },

    #[error("Entity '{0}' is already registered")]
    DuplicateEntity(String),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error(transparent)]
    Config(#[from] Box<figment::Error>),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[cfg(any(feature = "pg", feature = "mysql", feature = "sqlite"))]
    #[error(transparent)]
    Sqlx(#[from] sea_orm::sqlx::Error),

    #[error(transparent)]
    Sea(#[from] sea_orm::DbErr),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<figment::Error> for DbError {
    fn from(e: figment::Error) -> Self {
        Self::Config(Box::new(e))
    }
}

/// Supported engines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DbEngine {
    Postgres,
    MySql,
    Sqlite,
}

impl DbEngine {
    /// Short engine name for logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite",
        }
    }
}
