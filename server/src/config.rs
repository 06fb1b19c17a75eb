use anyhow::{Context, Result};
use platform_db::DatabaseSettings;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseSettings,
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database =
            DatabaseSettings::from_lookup(&lookup).context("invalid database settings")?;
        let cors_allowed_origins =
            parse_origins(&lookup("CORS_ALLOWED_ORIGINS").unwrap_or_default());
        Ok(Self {
            database,
            cors_allowed_origins,
        })
    }

    pub fn with_database(database: DatabaseSettings) -> Self {
        Self {
            database,
            cors_allowed_origins: Vec::new(),
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_reads_origins_and_database() {
        let config = AppConfig::from_lookup(|key| match key {
            "CORS_ALLOWED_ORIGINS" => Some("http://a.test".into()),
            "DATABASE_URL" => Some("postgres://app:secret@db/employees".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.cors_allowed_origins, vec!["http://a.test".to_string()]);
        assert_eq!(
            config.database.redacted_url(),
            "postgres://***@db/employees"
        );
    }

    #[test]
    fn load_defaults_without_env() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        assert!(config.cors_allowed_origins.is_empty());
        assert_eq!(
            config.database.redacted_url(),
            "sqlite://employees.db?mode=rwc"
        );
    }

    #[test]
    fn load_surfaces_bad_database_settings() {
        let err = AppConfig::from_lookup(|key| {
            (key == "DATABASE_CONNECT_TIMEOUT_SECS").then(|| "soon".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("invalid database settings"));
        assert!(format!("{err:#}").contains("DATABASE_CONNECT_TIMEOUT_SECS"));
    }

    #[test]
    fn origins_skip_blank_entries() {
        assert_eq!(
            parse_origins(" http://a.test, ,http://b.test,"),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
        assert!(parse_origins("").is_empty());
    }
}
