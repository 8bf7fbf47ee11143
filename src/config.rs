//! Store connection parameters.
//!
//! Values come from an optional YAML file and are overridden by the process
//! environment (`DB_HOST`, `DB_PORT`, `DB_NAME`, `DB_USER`, `DB_PASSWORD`).
//! All five are required; validation happens once at startup.

use std::{fmt, fs, io, path::Path, path::PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const ENV_HOST: &str = "DB_HOST";
pub const ENV_PORT: &str = "DB_PORT";
pub const ENV_NAME: &str = "DB_NAME";
pub const ENV_USER: &str = "DB_USER";
pub const ENV_PASSWORD: &str = "DB_PASSWORD";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required connection parameter(s): {}", .keys.join(", "))]
    Missing { keys: Vec<&'static str> },
    #[error("connection parameter {key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("failed to read config file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Settings as written in a YAML config file; every field is optional there.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl FileSettings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    password: String,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl DatabaseConfig {
    /// Loads `.env`, then the optional YAML file, then the environment.
    pub fn from_sources(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        let file = match config_file {
            Some(path) => FileSettings::load(path)?,
            None => FileSettings::default(),
        };
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Merges file settings with `lookup` (environment wins) and validates.
    pub fn resolve<F>(file: FileSettings, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |key: &str, fallback: Option<String>| {
            lookup(key)
                .or(fallback)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let host = pick(ENV_HOST, file.host);
        let port = pick(ENV_PORT, file.port.map(|p| p.to_string()));
        let database = pick(ENV_NAME, file.database);
        let user = pick(ENV_USER, file.user);
        let password = pick(ENV_PASSWORD, file.password);

        let keys = [
            (ENV_HOST, host.is_none()),
            (ENV_PORT, port.is_none()),
            (ENV_NAME, database.is_none()),
            (ENV_USER, user.is_none()),
            (ENV_PASSWORD, password.is_none()),
        ]
        .into_iter()
        .filter_map(|(key, missing)| missing.then_some(key))
        .collect::<Vec<_>>();
        let (Some(host), Some(port), Some(database), Some(user), Some(password)) =
            (host, port, database, user, password)
        else {
            return Err(ConfigError::Missing { keys });
        };

        let port = match port.parse::<u16>() {
            Ok(0) => {
                return Err(ConfigError::Invalid {
                    key: ENV_PORT,
                    reason: "port must be between 1 and 65535".to_string(),
                });
            }
            Ok(value) => value,
            Err(err) => {
                return Err(ConfigError::Invalid {
                    key: ENV_PORT,
                    reason: format!("'{port}' is not a port number ({err})"),
                });
            }
        };

        Ok(Self {
            host,
            port,
            database,
            user,
            password,
        })
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn to_postgres(&self) -> postgres::Config {
        let mut config = postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .dbname(&self.database)
            .user(&self.user)
            .password(&self.password);
        config
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        move |key| map.get(key).cloned()
    }

    fn full_env() -> Vec<(&'static str, &'static str)> {
        vec![
            (ENV_HOST, "localhost"),
            (ENV_PORT, "5432"),
            (ENV_NAME, "covid19_dashboard"),
            (ENV_USER, "loader"),
            (ENV_PASSWORD, "s3cret"),
        ]
    }

    #[test]
    fn resolves_from_environment() {
        let config = DatabaseConfig::resolve(FileSettings::default(), env(&full_env())).unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 5432);
        assert_eq!(config.database, "covid19_dashboard");
        assert_eq!(config.password(), "s3cret");
    }

    #[test]
    fn lists_every_missing_parameter() {
        let err = DatabaseConfig::resolve(
            FileSettings::default(),
            env(&[(ENV_HOST, "localhost"), (ENV_USER, "  ")]),
        )
        .unwrap_err();
        match err {
            ConfigError::Missing { keys } => {
                assert_eq!(keys, vec![ENV_PORT, ENV_NAME, ENV_USER, ENV_PASSWORD]);
            }
            other => panic!("expected missing parameters, got {other:?}"),
        }
    }

    #[test]
    fn environment_overrides_file_settings() {
        let file = FileSettings {
            host: Some("file-host".into()),
            port: Some(6543),
            database: Some("file_db".into()),
            user: Some("file_user".into()),
            password: Some("file_pw".into()),
        };
        let config = DatabaseConfig::resolve(file, env(&[(ENV_HOST, "env-host")])).unwrap();
        assert_eq!(config.host, "env-host");
        assert_eq!(config.port, 6543);
        assert_eq!(config.user, "file_user");
    }

    #[test]
    fn rejects_bad_port() {
        let mut pairs = full_env();
        pairs[1] = (ENV_PORT, "fifty");
        let err = DatabaseConfig::resolve(FileSettings::default(), env(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: ENV_PORT, .. }));

        pairs[1] = (ENV_PORT, "0");
        let err = DatabaseConfig::resolve(FileSettings::default(), env(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: ENV_PORT, .. }));
    }

    #[test]
    fn debug_output_redacts_password() {
        let config = DatabaseConfig::resolve(FileSettings::default(), env(&full_env())).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("<redacted>"));
    }
}
