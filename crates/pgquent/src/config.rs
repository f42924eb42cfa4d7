//! Connection settings.
//!
//! Read from the environment (and a `.env` file, if present):
//!
//! | key            | default     |
//! |----------------|-------------|
//! | `DB_HOST`      | `localhost` |
//! | `DB_PORT`      | `5432`      |
//! | `DB_USER`      | `postgres`  |
//! | `DB_PASS`      | empty       |
//! | `DB_NAME`      | `postgres`  |
//! | `DB_SSLMODE`   | `disable`   |
//! | `DATABASE_URL` | unset; when set it replaces all of the above |

use crate::error::{OrmError, OrmResult};
use crate::log::TARGET;
use tokio_postgres::{Client, NoTls};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub sslmode: String,
    /// Full connection URL; overrides the individual fields.
    pub url: Option<String>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            database: "postgres".to_string(),
            sslmode: "disable".to_string(),
            url: None,
        }
    }
}

impl DbConfig {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> OrmResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> OrmResult<Self> {
        let mut config = DbConfig::default();
        if let Some(host) = lookup("DB_HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("DB_PORT") {
            config.port = port
                .trim()
                .parse()
                .map_err(|_| OrmError::config(format!("DB_PORT is not a port number: {port:?}")))?;
        }
        if let Some(user) = lookup("DB_USER") {
            config.user = user;
        }
        if let Some(password) = lookup("DB_PASS") {
            config.password = password;
        }
        if let Some(database) = lookup("DB_NAME") {
            config.database = database;
        }
        if let Some(sslmode) = lookup("DB_SSLMODE") {
            config.sslmode = sslmode;
        }
        config.url = lookup("DATABASE_URL").filter(|u| !u.trim().is_empty());
        Ok(config)
    }

    /// libpq-style `key=value` string, or the URL when one is set.
    pub fn connection_string(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        let mut parts = vec![
            format!("host={}", quote_value(&self.host)),
            format!("port={}", self.port),
            format!("user={}", quote_value(&self.user)),
        ];
        if !self.password.is_empty() {
            parts.push(format!("password={}", quote_value(&self.password)));
        }
        parts.push(format!("dbname={}", quote_value(&self.database)));
        parts.push(format!("sslmode={}", quote_value(&self.sslmode)));
        parts.join(" ")
    }

    /// Open a connection without TLS and drive it on a spawned tokio task.
    pub async fn connect(&self) -> OrmResult<Client> {
        let pg: tokio_postgres::Config = self
            .connection_string()
            .parse()
            .map_err(|e: tokio_postgres::Error| OrmError::Connection(e.to_string()))?;
        let (client, connection) = pg
            .connect(NoTls)
            .await
            .map_err(|e| OrmError::Connection(e.to_string()))?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(target: TARGET, error = %e, "postgres connection closed with error");
            }
        });
        Ok(client)
    }
}

/// Quote a libpq connection value when it is empty or contains spaces, quotes or backslashes.
fn quote_value(value: &str) -> String {
    if !value.is_empty() && !value.contains([' ', '\'', '\\']) {
        return value.to_string();
    }
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}
