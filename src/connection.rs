use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::db::DatabaseType;

const DEFAULT_MYSQL_PORT: u64 = 3306;

#[derive(Debug, Deserialize, Clone)]
pub struct Connection {
    pub r#type: DatabaseType,
    pub name: Option<String>,
    pub user: Option<String>,
    pub host: Option<String>,
    pub port: Option<u64>,
    pub path: Option<PathBuf>,
    pub password: Option<String>,
    pub database: Option<String>,
}

impl Connection {
    /// MySQL connection described by `DB_HOST`, `DB_USER`, `DB_PASSWORD`,
    /// `DB_DATABASE` and `DB_PORT`. A `.env` file is honoured when present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenv::dotenv();
        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());

        let port = match var("DB_PORT") {
            Some(p) => p
                .parse::<u64>()
                .with_context(|| format!("DB_PORT is not a port number: {p}"))?,
            None => DEFAULT_MYSQL_PORT,
        };

        Ok(Self {
            r#type: DatabaseType::MySql,
            name: None,
            user: var("DB_USER"),
            host: var("DB_HOST"),
            port: Some(port),
            path: None,
            password: var("DB_PASSWORD"),
            database: var("DB_DATABASE"),
        })
    }

    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self {
            r#type: DatabaseType::Sqlite,
            name: None,
            user: None,
            host: None,
            port: None,
            path: Some(path.into()),
            password: None,
            database: None,
        }
    }

    /// Short human-readable target, never including the password.
    pub fn describe(&self) -> String {
        match self.r#type {
            DatabaseType::Sqlite => format!(
                "sqlite:{}",
                self.path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default()
            ),
            DatabaseType::MySql | DatabaseType::Postgres => format!(
                "{}://{}@{}:{}/{}",
                self.r#type.scheme(),
                self.user.as_deref().unwrap_or("?"),
                self.host.as_deref().unwrap_or("?"),
                self.port.map(|p| p.to_string()).unwrap_or_default(),
                self.database.as_deref().unwrap_or(""),
            ),
        }
    }

    pub(crate) fn require<'a>(&self, field: &'a Option<String>, name: &str) -> Result<&'a str> {
        field.as_deref().ok_or_else(|| {
            anyhow::anyhow!("type {} needs the {} field", self.r#type.scheme(), name)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_hides_password() {
        let conn = Connection {
            r#type: DatabaseType::MySql,
            name: None,
            user: Some("admin".into()),
            host: Some("db.local".into()),
            port: Some(3306),
            path: None,
            password: Some("hunter2".into()),
            database: Some("shop".into()),
        };
        let shown = conn.describe();
        assert_eq!(shown, "mysql://admin@db.local:3306/shop");
        assert!(!shown.contains("hunter2"));
    }

    #[test]
    fn missing_field_names_the_backend() {
        let conn = Connection::sqlite("x.db");
        let err = conn.require(&conn.host, "host").unwrap_err();
        assert_eq!(err.to_string(), "type sqlite needs the host field");
    }
}
