//! Configuration module
//!
//! Configuration is read from the environment (after loading an optional `.env` file).
//! Every setting has a default so an embedding host only sets what it needs.

use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

const DB_MAX_CONNECTIONS: u32 = 10;
const REFERENCE_CACHE_CAPACITY: usize = 1024;
const DEFAULT_LOG_FILTER: &str = "stash=debug";

/// How concurrent writers of the same reference entity are reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Updates are applied unconditionally; the last writer wins.
    #[default]
    LastWriteWins,
    /// Updates carry the version they were read at and fail when it is stale.
    RejectOnConflict,
}

impl FromStr for ConflictPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "last-write-wins" | "lww" => Ok(ConflictPolicy::LastWriteWins),
            "reject" | "reject-on-conflict" => Ok(ConflictPolicy::RejectOnConflict),
            _ => Err(anyhow::anyhow!("Invalid conflict policy: {}", s)),
        }
    }
}

impl Display for ConflictPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ConflictPolicy::LastWriteWins => write!(f, "last-write-wins"),
            ConflictPolicy::RejectOnConflict => write!(f, "reject-on-conflict"),
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    /// Record store connection string; `None` when the host wires its own repositories.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub conflict_policy: ConflictPolicy,
    /// Entries kept by the reference lookup cache. 0 disables caching.
    pub reference_cache_capacity: usize,
    pub log_filter: String,
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            database_url: None,
            db_max_connections: DB_MAX_CONNECTIONS,
            conflict_policy: ConflictPolicy::default(),
            reference_cache_capacity: REFERENCE_CACHE_CAPACITY,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            log_json: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let conflict_policy = match env::var("STASH_CONFLICT_POLICY") {
            Ok(value) => value.parse()?,
            Err(_) => ConflictPolicy::default(),
        };

        let config = Config {
            environment,
            database_url: env::var("STASH_DATABASE_URL")
                .or_else(|_| env::var("DATABASE_URL"))
                .ok(),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| DB_MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(DB_MAX_CONNECTIONS),
            conflict_policy,
            reference_cache_capacity: env::var("STASH_REFERENCE_CACHE_CAPACITY")
                .unwrap_or_else(|_| REFERENCE_CACHE_CAPACITY.to_string())
                .parse()
                .map_err(|_| {
                    anyhow::anyhow!("STASH_REFERENCE_CACHE_CAPACITY must be a valid number")
                })?,
            log_filter: env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string()),
            log_json: env::var("STASH_LOG_JSON")
                .unwrap_or_else(|_| "false".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(false),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if let Some(url) = &self.database_url {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                return Err(anyhow::anyhow!(
                    "STASH_DATABASE_URL must be a valid PostgreSQL connection string"
                ));
            }
        }

        if self.db_max_connections == 0 {
            return Err(anyhow::anyhow!("DB_MAX_CONNECTIONS must be greater than 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_policy_parsing() {
        assert_eq!(
            "reject".parse::<ConflictPolicy>().unwrap(),
            ConflictPolicy::RejectOnConflict
        );
        assert_eq!(
            "Last-Write-Wins".parse::<ConflictPolicy>().unwrap(),
            ConflictPolicy::LastWriteWins
        );
        assert!("first-write-wins".parse::<ConflictPolicy>().is_err());
    }

    #[test]
    fn test_conflict_policy_display_round_trips() {
        for policy in [ConflictPolicy::LastWriteWins, ConflictPolicy::RejectOnConflict] {
            assert_eq!(policy.to_string().parse::<ConflictPolicy>().unwrap(), policy);
        }
    }

    #[test]
    fn test_validate_rejects_non_postgres_url() {
        let config = Config {
            database_url: Some("mysql://localhost/stash".to_string()),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            database_url: Some("postgres://localhost/stash".to_string()),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.conflict_policy, ConflictPolicy::LastWriteWins);
    }
}
