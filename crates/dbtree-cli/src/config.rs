use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::{env, fs};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DATA_DIR_ENV: &str = "DBTREE_DATA_DIR";
pub const BIND_ENV: &str = "DBTREE_BIND";

const DB_FILE: &str = "dbtree.db";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            data_dir: default_data_dir(),
        }
    }
}

impl Config {
    /// Load from `path` when given, otherwise from `config.toml` in the data
    /// directory if one exists, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let implicit = env::var(DATA_DIR_ENV)
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| default_data_dir())
                    .join(CONFIG_FILE);
                if implicit.is_file() {
                    Self::from_file(&implicit)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply `DBTREE_DATA_DIR` / `DBTREE_BIND` from `lookup`. Blank or
    /// unparsable values are ignored with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup(DATA_DIR_ENV) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                self.data_dir = PathBuf::from(trimmed);
            }
        }

        if let Some(raw) = lookup(BIND_ENV) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                match trimmed.parse::<SocketAddr>() {
                    Ok(addr) => self.bind_addr = addr,
                    Err(err) => tracing::warn!("invalid {BIND_ENV}, ignoring: {err}"),
                }
            }
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE)
    }
}

fn default_data_dir() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".dbtree")
}
