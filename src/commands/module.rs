//! Module handlers: code that observes chat lines, executes on a trigger
//! token, or both.
//!
//! A module path names either a built-in handler (`builtin:<name>`) or an
//! external executable that speaks a small JSON protocol:
//!
//! - `<path> capabilities` prints the supported capability names
//!   (`event`, `execute`), whitespace or comma separated
//! - `<path> event` receives the [`ChatEvent`] as JSON on stdin
//! - `<path> execute ARGS...` receives the [`Invocation`] as JSON on stdin
//!
//! Non-empty stdout lines are relayed to the originating channel.

use std::time::Duration;

use anyhow::{Context as _, Result, bail};
use async_trait::async_trait;
use tracing::{debug, warn};

use super::matrix::MatrixBridge;
use super::shell::run_captured;
use crate::error::CommandError;
use crate::event::{ChatEvent, Invocation};

/// Prefix marking a built-in module path.
pub const BUILTIN_PREFIX: &str = "builtin:";

/// Which hooks a module implements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Called for every qualifying chat line.
    pub observe: bool,
    /// Called when the module's trigger token is invoked.
    pub execute: bool,
}

impl Capabilities {
    pub fn is_empty(&self) -> bool {
        !self.observe && !self.execute
    }

    /// Parse capability names as printed by an external module.
    pub fn parse(raw: &str) -> Self {
        let mut caps = Self::default();
        for name in raw.split(|c: char| c.is_whitespace() || c == ',') {
            match name.trim().to_ascii_lowercase().as_str() {
                "event" | "handle" => caps.observe = true,
                "execute" => caps.execute = true,
                "" => {}
                other => debug!(capability = %other, "ignoring unknown module capability"),
            }
        }
        caps
    }
}

/// A loaded module.
///
/// Both hooks default to doing nothing; [`Module::capabilities`] tells the
/// router which of them are worth calling.
#[async_trait]
pub trait Module: Send + Sync {
    fn name(&self) -> &str;

    fn capabilities(&self) -> Capabilities;

    /// Observe a chat line. Returned lines are said in the event's channel.
    async fn on_event(&self, _event: &ChatEvent) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    /// Run for an explicit invocation. Returned lines are said in the
    /// invocation's target channel.
    async fn on_execute(&self, _call: &Invocation) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Load the module named by `path`.
pub async fn load_module(
    token: &str,
    path: &str,
    timeout: Duration,
) -> Result<Box<dyn Module>, CommandError> {
    if let Some(builtin) = path.strip_prefix(BUILTIN_PREFIX) {
        return load_builtin(token, builtin);
    }
    let module = ProcessModule::load(token, path, timeout).await?;
    Ok(Box::new(module))
}

fn load_builtin(token: &str, spec: &str) -> Result<Box<dyn Module>, CommandError> {
    let (name, arg) = spec.split_once(':').unwrap_or((spec, ""));
    match name {
        "matrix-bridge" => {
            let bridge = if arg.is_empty() {
                MatrixBridge::from_default_env()
            } else {
                MatrixBridge::from_env_file(arg)
            };
            Ok(Box::new(bridge))
        }
        other => Err(CommandError::Module {
            name: token.to_string(),
            reason: format!("unknown builtin module: {other}"),
        }),
    }
}

/// An external executable module.
#[derive(Debug, Clone)]
pub struct ProcessModule {
    name: String,
    path: String,
    capabilities: Capabilities,
    timeout: Duration,
}

impl ProcessModule {
    /// Probe `path` for its capabilities.
    pub async fn load(token: &str, path: &str, timeout: Duration) -> Result<Self, CommandError> {
        let captured = run_captured(path, &["capabilities".to_string()], None, timeout).await?;
        if captured.timed_out() {
            return Err(CommandError::Module {
                name: token.to_string(),
                reason: "capability probe timed out".to_string(),
            });
        }
        if let Some(status) = captured.status
            && !status.success()
        {
            warn!(module = %token, status = %status, "capability probe exited unsuccessfully");
        }
        let capabilities = Capabilities::parse(&captured.into_text()?);

        Ok(Self {
            name: token.to_string(),
            path: path.to_string(),
            capabilities,
            timeout,
        })
    }

    async fn call(&self, verb: &str, extra: &[String], payload: String) -> Result<Vec<String>> {
        let mut args = vec![verb.to_string()];
        args.extend_from_slice(extra);

        let captured = run_captured(&self.path, &args, Some(payload.as_bytes()), self.timeout)
            .await
            .with_context(|| format!("module '{}' failed to run", self.name))?;
        if captured.timed_out() {
            bail!("module '{}' timed out after {:?}", self.name, self.timeout);
        }
        if let Some(status) = captured.status
            && !status.success()
        {
            bail!("module '{}' exited with {}", self.name, status);
        }

        let text = captured.into_text()?;
        Ok(text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(str::to_owned)
            .collect())
    }
}

#[async_trait]
impl Module for ProcessModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    async fn on_event(&self, event: &ChatEvent) -> Result<Vec<String>> {
        let payload = serde_json::to_string(event).context("failed to serialize chat event")?;
        self.call("event", &[], payload).await
    }

    async fn on_execute(&self, call: &Invocation) -> Result<Vec<String>> {
        let payload = serde_json::to_string(call).context("failed to serialize invocation")?;
        self.call("execute", &call.args, payload).await
    }
}
