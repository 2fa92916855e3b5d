//! Configuration management for the Folio server

use std::env;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub publication: PublicationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublicationConfig {
    /// Zip archive or exploded directory
    pub path: PathBuf,
    /// JSON-serialized publication context
    pub manifest_path: PathBuf,
    /// User style overrides for EPUB content
    pub user_properties_path: Option<PathBuf>,
    /// Base URL for injected stylesheets and scripts
    pub assets_base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any variable source
    ///
    /// `PUBLICATION_PATH` and `MANIFEST_PATH` are required; everything else
    /// has a default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        Ok(Config {
            server: ServerConfig {
                host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: lookup("SERVER_PORT")
                    .and_then(|port| port.parse().ok())
                    .unwrap_or(3000),
            },
            publication: PublicationConfig {
                path: required("PUBLICATION_PATH")?.into(),
                manifest_path: required("MANIFEST_PATH")?.into(),
                user_properties_path: lookup("USER_PROPERTIES_PATH").map(PathBuf::from),
                assets_base_url: lookup("ASSETS_BASE_URL")
                    .unwrap_or_else(|| "/assets".to_string()),
            },
        })
    }
}
