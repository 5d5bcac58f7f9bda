//! Raw configuration layers as read from disk.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::validation::ValidationError;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no config file exists: {0}")]
    Missing(PathBuf),
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not determine hostname: {0}")]
    Hostname(#[source] std::io::Error),
    #[error("invalid configuration: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// One JSON configuration file.
///
/// Every key is optional so that a `.local` override only has to name the
/// keys it changes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigLayer {
    pub server: Option<String>,
    pub port: Option<u16>,
    pub tls: Option<bool>,
    pub password: Option<String>,
    /// Poll interval in seconds.
    pub poll: Option<u64>,
    /// Retry interval in seconds.
    pub retry: Option<u64>,
    /// Sender-mode ack timeout in seconds.
    pub send: Option<u64>,
    pub joint: Option<String>,
    pub rooms: Option<Vec<String>>,
    pub permitted: Option<Vec<String>>,
    pub bridge_port: Option<u16>,
    /// Legacy spelling of `bridge_port`.
    pub zmq: Option<u16>,
    /// Bot identity (nick).
    pub name: Option<String>,
    /// Home channel.
    pub hostname: Option<String>,
    pub command_timeout: Option<u64>,
    pub cooldown: Option<u64>,
    /// Trigger token (without sentinel) to shell executable path.
    #[serde(default)]
    pub commands: BTreeMap<String, String>,
    /// Trigger token (without sentinel) to module path.
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ConfigLayer {
    /// Load a layer from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &content)
    }

    /// Parse a layer from JSON text; `path` is used for error reporting.
    pub fn parse(path: &Path, content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay `other` on top of `self`: keys present in `other` win.
    ///
    /// `commands`/`modules` are not merged here; the registry merges them by
    /// trigger token so that it can warn on replacement.
    pub fn overlay(&mut self, other: &ConfigLayer) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() {
                    self.$field = other.$field.clone();
                })*
            };
        }
        take!(
            server,
            port,
            tls,
            password,
            poll,
            retry,
            send,
            joint,
            rooms,
            permitted,
            bridge_port,
            zmq,
            name,
            hostname,
            command_timeout,
            cooldown
        );
    }
}
