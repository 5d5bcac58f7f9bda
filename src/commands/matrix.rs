//! Built-in observer that mirrors chat lines into a Matrix room.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::module::{Capabilities, Module};
use crate::event::ChatEvent;

/// Environment file read when no path is given.
pub const DEFAULT_ENV_PATH: &str = "/etc/epiphyte.d/environment";

const POST_TIMEOUT: Duration = Duration::from_secs(10);

/// Matrix endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixTarget {
    pub host: String,
    pub token: String,
    pub room: String,
}

impl MatrixTarget {
    /// Read `SYNAPSE_HOST`, `SYNAPSE_API_TOKEN` and `SYNAPSE_DEBUGGING` from
    /// `KEY="value"` lines. All three must be present.
    pub fn from_env_text(text: &str) -> Option<Self> {
        let vars: HashMap<&str, &str> = text
            .lines()
            .filter_map(|line| line.split_once('='))
            .map(|(k, v)| (k.trim(), unquote(v.trim())))
            .collect();

        Some(Self {
            host: vars.get("SYNAPSE_HOST")?.to_string(),
            token: vars.get("SYNAPSE_API_TOKEN")?.to_string(),
            room: vars.get("SYNAPSE_DEBUGGING")?.to_string(),
        })
    }

    /// Send endpoint for the room; room and token are percent-encoded.
    pub fn url(&self) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.host)
            .with_context(|| format!("invalid matrix host: {}", self.host))?;
        url.path_segments_mut()
            .map_err(|()| anyhow::anyhow!("matrix host cannot carry a path: {}", self.host))?
            .pop_if_empty()
            .extend([
                "_matrix",
                "client",
                "r0",
                "rooms",
                self.room.as_str(),
                "send",
                "m.room.message",
            ]);
        url.query_pairs_mut()
            .append_pair("access_token", &self.token);
        Ok(url)
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value)
}

#[derive(Debug, Serialize)]
struct RoomMessage<'a> {
    body: &'a str,
    msgtype: &'static str,
}

/// Posts every observed chat line to the configured room.
pub struct MatrixBridge {
    target: Option<MatrixTarget>,
    client: reqwest::Client,
}

impl MatrixBridge {
    pub fn new(target: Option<MatrixTarget>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(POST_TIMEOUT)
            .user_agent(concat!("smirc/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        if target.is_none() {
            warn!("matrix bridge has no post settings, lines will be dropped");
        } else {
            info!("matrix bridge initialized");
        }

        Self { target, client }
    }

    pub fn from_default_env() -> Self {
        Self::from_env_file(DEFAULT_ENV_PATH)
    }

    pub fn from_env_file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let target = match std::fs::read_to_string(path) {
            Ok(text) => MatrixTarget::from_env_text(&text),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read matrix environment");
                None
            }
        };
        Self::new(target)
    }

    pub fn target(&self) -> Option<&MatrixTarget> {
        self.target.as_ref()
    }
}

#[async_trait]
impl Module for MatrixBridge {
    fn name(&self) -> &str {
        "matrix-bridge"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            observe: true,
            execute: false,
        }
    }

    async fn on_event(&self, event: &ChatEvent) -> Result<Vec<String>> {
        let Some(target) = &self.target else {
            debug!("no matrix post settings, skipping");
            return Ok(Vec::new());
        };

        let body = RoomMessage {
            body: &event.text,
            msgtype: "m.text",
        };
        self.client
            .post(target.url()?)
            .json(&body)
            .send()
            .await
            .context("matrix post failed")?
            .error_for_status()
            .context("matrix server rejected post")?;

        Ok(Vec::new())
    }
}
