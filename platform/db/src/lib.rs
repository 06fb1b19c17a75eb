//! Storage adapter. Owns the connection pool, bootstraps the schema and hands
//! out one transaction per unit of work.

pub mod employees;

use std::time::Duration;

use entity::Employee;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DatabaseTransaction, Schema,
    TransactionTrait,
};
use thiserror::Error;
use tracing::info;

pub use sea_orm::DbErr;

/// Shared pool handle. Cloning is cheap; every clone talks to the same pool.
pub type DbPool = DatabaseConnection;

/// One unit of work. Dropping it without `commit` rolls back and returns the
/// connection to the pool.
pub type Session = DatabaseTransaction;

const DEFAULT_URL: &str = "sqlite://employees.db?mode=rwc";
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 8;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidSetting { key: &'static str, value: String },
    #[error("failed to connect to {url}")]
    Connect {
        url: String,
        #[source]
        source: DbErr,
    },
    #[error("failed to create the employee table")]
    Schema(#[source] DbErr),
    #[error(transparent)]
    Query(#[from] DbErr),
}

pub type DbResult<T> = Result<T, DbError>;

#[derive(Clone, Debug)]
pub struct DatabaseSettings {
    url: String,
    max_connections: u32,
    connect_timeout: Duration,
    log_sql: bool,
}

impl DatabaseSettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            log_sql: false,
        }
    }

    /// Reads `DATABASE_URL`, `DATABASE_MAX_CONNECTIONS`,
    /// `DATABASE_CONNECT_TIMEOUT_SECS` and `DATABASE_LOG_SQL`.
    pub fn from_env() -> DbResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DbResult<Self> {
        let url = lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_URL.to_string());
        let mut settings = Self::new(url);
        if let Some(max) = parse_setting::<u32>(&lookup, "DATABASE_MAX_CONNECTIONS")? {
            settings = settings.with_max_connections(max);
        }
        if let Some(secs) = parse_setting::<u64>(&lookup, "DATABASE_CONNECT_TIMEOUT_SECS")? {
            settings.connect_timeout = Duration::from_secs(secs);
        }
        settings.log_sql = lookup("DATABASE_LOG_SQL")
            .map(|val| matches!(val.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        Ok(settings)
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    /// The URL with any credentials replaced, safe for logs and errors.
    /// Only the authority (between `://` and the first `/`, `?` or `#`) is
    /// searched for userinfo.
    pub fn redacted_url(&self) -> String {
        let Some(scheme_end) = self.url.find("://") else {
            return self.url.clone();
        };
        let authority_start = scheme_end + 3;
        let rest = &self.url[authority_start..];
        let authority_len = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        match rest[..authority_len].rfind('@') {
            Some(at) => format!(
                "{}***{}",
                &self.url[..authority_start],
                &rest[at..]
            ),
            None => self.url.clone(),
        }
    }

    // Every pooled connection to an in-memory SQLite URL opens its own empty
    // database, so those pools are pinned to a single connection.
    fn pool_size(&self) -> u32 {
        if self.url.contains(":memory:") || self.url.contains("mode=memory") {
            1
        } else {
            self.max_connections
        }
    }
}

fn parse_setting<T: std::str::FromStr>(
    lookup: impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> DbResult<Option<T>> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| DbError::InvalidSetting { key, value: raw }),
        None => Ok(None),
    }
}

/// Open the pool described by `settings`.
pub async fn connect(settings: &DatabaseSettings) -> DbResult<DbPool> {
    let mut options = ConnectOptions::new(settings.url.clone());
    options
        .max_connections(settings.pool_size())
        .connect_timeout(settings.connect_timeout)
        .acquire_timeout(settings.connect_timeout)
        .sqlx_logging(settings.log_sql);
    Database::connect(options)
        .await
        .map_err(|source| DbError::Connect {
            url: settings.redacted_url(),
            source,
        })
}

/// Create the employee table when it does not exist yet. Safe to call on
/// every start.
pub async fn ensure_schema(pool: &DbPool) -> DbResult<()> {
    let backend = pool.get_database_backend();
    let mut statement = Schema::new(backend).create_table_from_entity(Employee);
    statement.if_not_exists();
    pool.execute(backend.build(&statement))
        .await
        .map_err(DbError::Schema)?;
    Ok(())
}

/// Connect and make sure the schema is in place. The process cannot serve
/// without a working store, so callers treat any error here as fatal.
pub async fn initialize(settings: &DatabaseSettings) -> DbResult<DbPool> {
    let pool = connect(settings).await?;
    ensure_schema(&pool).await?;
    info!(url = %settings.redacted_url(), "storage initialized");
    Ok(pool)
}

pub async fn open_session(pool: &DbPool) -> DbResult<Session> {
    Ok(pool.begin().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn redacts_credentials() {
        let settings = DatabaseSettings::new("postgres://app:secret@db:5432/employees");
        assert_eq!(settings.redacted_url(), "postgres://***@db:5432/employees");
        let settings = DatabaseSettings::new("sqlite::memory:");
        assert_eq!(settings.redacted_url(), "sqlite::memory:");
    }

    #[test]
    fn redaction_ignores_at_signs_after_the_host() {
        let settings =
            DatabaseSettings::new("postgres://app:secret@db/employees?application_name=a@b");
        assert_eq!(
            settings.redacted_url(),
            "postgres://***@db/employees?application_name=a@b"
        );
        let settings = DatabaseSettings::new("postgres://db/employees?options=x@y");
        assert_eq!(
            settings.redacted_url(),
            "postgres://db/employees?options=x@y"
        );
        let settings = DatabaseSettings::new("postgres://app:p@ss@db");
        assert_eq!(settings.redacted_url(), "postgres://***@db");
    }

    #[test]
    fn settings_default_when_unset() {
        let settings = DatabaseSettings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings.url, DEFAULT_URL);
        assert_eq!(settings.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(
            settings.connect_timeout,
            Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS)
        );
        assert!(!settings.log_sql);
    }

    #[test]
    fn settings_read_overrides() {
        let settings = DatabaseSettings::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/employees"),
            ("DATABASE_MAX_CONNECTIONS", " 4 "),
            ("DATABASE_CONNECT_TIMEOUT_SECS", "2"),
        ]))
        .unwrap();
        assert_eq!(settings.url, "postgres://db/employees");
        assert_eq!(settings.max_connections, 4);
        assert_eq!(settings.connect_timeout, Duration::from_secs(2));
    }

    #[test]
    fn sql_logging_accepts_truthy_values() {
        for raw in ["1", "true", "TRUE", "yes", "Yes"] {
            let settings =
                DatabaseSettings::from_lookup(lookup(&[("DATABASE_LOG_SQL", raw)])).unwrap();
            assert!(settings.log_sql, "{raw}");
        }
        for raw in ["0", "false", "no", "", "on"] {
            let settings =
                DatabaseSettings::from_lookup(lookup(&[("DATABASE_LOG_SQL", raw)])).unwrap();
            assert!(!settings.log_sql, "{raw}");
        }
    }

    #[test]
    fn non_numeric_settings_are_rejected() {
        let err = DatabaseSettings::from_lookup(lookup(&[("DATABASE_MAX_CONNECTIONS", "many")]))
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::InvalidSetting { key: "DATABASE_MAX_CONNECTIONS", ref value } if value == "many"
        ));
        let err =
            DatabaseSettings::from_lookup(lookup(&[("DATABASE_CONNECT_TIMEOUT_SECS", "-1")]))
                .unwrap_err();
        assert!(matches!(
            err,
            DbError::InvalidSetting {
                key: "DATABASE_CONNECT_TIMEOUT_SECS",
                ..
            }
        ));
    }

    #[test]
    fn zero_max_connections_is_clamped() {
        let settings =
            DatabaseSettings::from_lookup(lookup(&[("DATABASE_MAX_CONNECTIONS", "0")])).unwrap();
        assert_eq!(settings.max_connections, 1);
    }

    #[test]
    fn in_memory_pools_use_one_connection() {
        let settings = DatabaseSettings::new("sqlite::memory:").with_max_connections(8);
        assert_eq!(settings.pool_size(), 1);
        let settings = DatabaseSettings::new("postgres://db/employees").with_max_connections(8);
        assert_eq!(settings.pool_size(), 8);
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let pool = initialize(&DatabaseSettings::new("sqlite::memory:"))
            .await
            .unwrap();
        ensure_schema(&pool).await.unwrap();
        let rows = employees::list(&pool).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn uncommitted_session_rolls_back() {
        let pool = initialize(&DatabaseSettings::new("sqlite::memory:"))
            .await
            .unwrap();
        {
            let session = open_session(&pool).await.unwrap();
            employees::insert(&session, "Alice".into(), "Eng".into())
                .await
                .unwrap();
        }
        assert!(employees::list(&pool).await.unwrap().is_empty());

        let session = open_session(&pool).await.unwrap();
        employees::insert(&session, "Bob".into(), "Ops".into())
            .await
            .unwrap();
        session.commit().await.unwrap();
        assert_eq!(employees::list(&pool).await.unwrap().len(), 1);
    }
}
