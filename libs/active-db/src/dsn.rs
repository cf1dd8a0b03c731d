//! DSN inspection helpers: engine detection, in-memory detection, env expansion
//! and credential redaction for logs.

use crate::{DbEngine, DbError, Result};

/// Detect engine by DSN.
///
/// Only scheme prefixes are checked; the tail (credentials etc.) is never touched.
///
/// # Errors
/// Returns `DbError::UnknownDsn` if the DSN scheme is not recognized.
pub fn detect_engine(dsn: &str) -> Result<DbEngine> {
    // Trim only leading spaces/newlines to be forgiving with env files.
    let s = dsn.trim_start();

    if s.starts_with("postgres://") || s.starts_with("postgresql://") {
        Ok(DbEngine::Postgres)
    } else if s.starts_with("mysql://") {
        Ok(DbEngine::MySql)
    } else if s.starts_with("sqlite:") {
        Ok(DbEngine::Sqlite)
    } else {
        Err(DbError::UnknownDsn(dsn.to_owned()))
    }
}

/// Whether a `SQLite` DSN points at an in-memory database.
///
/// Covers `sqlite::memory:`, `sqlite://:memory:`, a bare `sqlite:` / `sqlite://`
/// and shared-cache URIs with `mode=memory`.
#[must_use]
pub fn is_memory_dsn(dsn: &str) -> bool {
    let s = dsn.trim();
    let Some(rest) = s.strip_prefix("sqlite:") else {
        return false;
    };
    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let (path, query) = rest.split_once('?').unwrap_or((rest, ""));

    path.is_empty()
        || path == ":memory:"
        || query.split('&').any(|kv| kv.eq_ignore_ascii_case("mode=memory"))
}

/// Expand `${VAR}` references from the process environment.
///
/// # Errors
/// Returns `DbError::EnvVar` if a referenced variable is not set.
pub fn expand_env_vars(input: &str) -> Result<String> {
    let re = regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
        .map_err(|e| DbError::InvalidConfig(e.to_string()))?;
    let mut result = input.to_owned();

    for caps in re.captures_iter(input) {
        let full_match = &caps[0];
        let var_name = &caps[1];
        let value = std::env::var(var_name)?;
        result = result.replace(full_match, &value);
    }

    Ok(result)
}

/// Replace the password component of a DSN with `***` for logging.
#[must_use]
pub fn redact_credentials_in_dsn(dsn: Option<&str>) -> String {
    match dsn {
        Some(dsn) if dsn.contains('@') => match url::Url::parse(dsn) {
            Ok(mut parsed) => {
                if parsed.password().is_some() && parsed.set_password(Some("***")).is_err() {
                    return "***".to_owned();
                }
                parsed.to_string()
            }
            Err(_) => "***".to_owned(),
        },
        Some(dsn) => dsn.to_owned(),
        None => "none".to_owned(),
    }
}
