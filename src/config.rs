//! Configuration loading: TOML file, then environment overrides, then
//! built-in defaults.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

fn default_server_port() -> u16 {
    8080
}
fn default_default_durability() -> i64 {
    2
}
fn default_max_filename_length() -> usize {
    255
}
fn default_pretty_print() -> bool {
    false
}
fn default_s3_version() -> String {
    "2006-03-01".to_string()
}
fn default_storage_class_mapping() -> HashMap<String, i64> {
    let mut m = HashMap::new();
    m.insert("STANDARD".to_string(), 2);
    m.insert("REDUCED_REDUNDANCY".to_string(), 1);
    m
}
fn default_durability_mapping() -> HashMap<String, String> {
    let mut m = HashMap::new();
    m.insert("2".to_string(), "STANDARD".to_string());
    m.insert("1".to_string(), "REDUCED_REDUNDANCY".to_string());
    m
}
fn default_bucket_path() -> String {
    "./data".to_string()
}
fn default_max_key_length() -> usize {
    1024
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_bucket_path")]
    pub bucket_path: String,
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    #[serde(default = "default_default_durability")]
    pub default_durability: i64,
    #[serde(default = "default_max_filename_length")]
    pub max_filename_length: usize,
    #[serde(default = "default_pretty_print")]
    pub pretty_print: bool,
    #[serde(default = "default_s3_version")]
    pub s3_version: String,
    #[serde(default = "default_storage_class_mapping")]
    pub storage_class_mapping_to_durability: HashMap<String, i64>,
    #[serde(default = "default_durability_mapping")]
    pub durability_mapping_to_storage_class: HashMap<String, String>,
    /// Maximum accepted key length, independent of the filesystem's own
    /// per-segment limit (`max_filename_length`).
    #[serde(default = "default_max_key_length")]
    pub max_key_length: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bucket_path: default_bucket_path(),
            server_port: default_server_port(),
            default_durability: default_default_durability(),
            max_filename_length: default_max_filename_length(),
            pretty_print: default_pretty_print(),
            s3_version: default_s3_version(),
            storage_class_mapping_to_durability: default_storage_class_mapping(),
            durability_mapping_to_storage_class: default_durability_mapping(),
            max_key_length: default_max_key_length(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl Config {
    /// Loads from an explicit TOML file, then overlays `GATEWAY_*`
    /// environment variables, then fills in defaults for anything unset.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("GATEWAY_BUCKET_PATH") {
            self.bucket_path = v;
        }
        if let Ok(v) = std::env::var("GATEWAY_SERVER_PORT") {
            if let Ok(v) = v.parse() {
                self.server_port = v;
            }
        }
        if let Ok(v) = std::env::var("GATEWAY_DEFAULT_DURABILITY") {
            if let Ok(v) = v.parse() {
                self.default_durability = v;
            }
        }
        if let Ok(v) = std::env::var("GATEWAY_MAX_FILENAME_LENGTH") {
            if let Ok(v) = v.parse() {
                self.max_filename_length = v;
            }
        }
        if let Ok(v) = std::env::var("GATEWAY_PRETTY_PRINT") {
            if let Ok(v) = v.parse() {
                self.pretty_print = v;
            }
        }
        if let Ok(v) = std::env::var("GATEWAY_S3_VERSION") {
            self.s3_version = v;
        }
    }

    pub fn durability_map(&self) -> crate::metadata_codec::DurabilityMap {
        let level_to_class = self
            .durability_mapping_to_storage_class
            .iter()
            .filter_map(|(level, class)| level.parse::<i64>().ok().map(|level| (level, class.clone())))
            .collect();
        crate::metadata_codec::DurabilityMap::new(
            self.storage_class_mapping_to_durability.clone(),
            level_to_class,
            self.default_durability,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let config = Config::default();
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.default_durability, 2);
        assert!(config
            .storage_class_mapping_to_durability
            .contains_key("STANDARD"));
    }

    #[test]
    fn parses_toml() {
        let toml_str = r#"
            bucket_path = "/srv/gateway"
            server_port = 9001
            default_durability = 3
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.bucket_path, "/srv/gateway");
        assert_eq!(config.server_port, 9001);
        assert_eq!(config.default_durability, 3);
        // unset fields still get their defaults
        assert_eq!(config.max_filename_length, 255);
    }
}
