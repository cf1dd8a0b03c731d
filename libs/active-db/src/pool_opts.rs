//! Apply [`PoolCfg`] to the per-driver sqlx pool builders.

use crate::config::PoolCfg;

/// Common interface over `PgPoolOptions`, `MySqlPoolOptions` and
/// `SqlitePoolOptions`.
pub trait ApplyPoolOpts: Sized {
    /// Apply the configured knobs; unset values keep the sqlx defaults.
    fn apply(self, cfg: &PoolCfg) -> Self;
}

macro_rules! impl_apply_pool_opts {
    ($feature:literal, $options:ty) => {
        #[cfg(feature = $feature)]
        impl ApplyPoolOpts for $options {
            fn apply(mut self, cfg: &PoolCfg) -> Self {
                if let Some(n) = cfg.max_conns {
                    self = self.max_connections(n);
                }
                if let Some(n) = cfg.min_conns {
                    self = self.min_connections(n);
                }
                if let Some(t) = cfg.acquire_timeout {
                    self = self.acquire_timeout(t);
                }
                if let Some(t) = cfg.idle_timeout {
                    self = self.idle_timeout(t);
                }
                if let Some(t) = cfg.max_lifetime {
                    self = self.max_lifetime(t);
                }
                if cfg.test_before_acquire {
                    self = self.test_before_acquire(true);
                }
                self
            }
        }
    };
}

impl_apply_pool_opts!("pg", sea_orm::sqlx::postgres::PgPoolOptions);
impl_apply_pool_opts!("mysql", sea_orm::sqlx::mysql::MySqlPoolOptions);
impl_apply_pool_opts!("sqlite", sea_orm::sqlx::sqlite::SqlitePoolOptions);

#[cfg(all(test, feature = "sqlite"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use sea_orm::sqlx::sqlite::SqlitePoolOptions;
    use std::time::Duration;

    #[test]
    fn test_apply_sets_configured_knobs() {
        let cfg = PoolCfg {
            max_conns: Some(3),
            min_conns: Some(1),
            acquire_timeout: Some(Duration::from_secs(2)),
            idle_timeout: Some(Duration::from_secs(30)),
            max_lifetime: None,
            test_before_acquire: true,
        };
        let opts = SqlitePoolOptions::new().apply(&cfg);
        assert_eq!(opts.get_max_connections(), 3);
        assert_eq!(opts.get_min_connections(), 1);
        assert_eq!(opts.get_acquire_timeout(), Duration::from_secs(2));
        assert_eq!(opts.get_idle_timeout(), Some(Duration::from_secs(30)));
        assert!(opts.get_test_before_acquire());
    }

    #[test]
    fn test_apply_keeps_defaults_when_unset() {
        let defaults = SqlitePoolOptions::new();
        let applied = SqlitePoolOptions::new().apply(&PoolCfg::default());
        assert_eq!(applied.get_max_connections(), defaults.get_max_connections());
        assert_eq!(applied.get_max_lifetime(), defaults.get_max_lifetime());
    }
}
