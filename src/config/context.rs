//! The resolved, read-mostly runtime context.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use super::defaults::{self, LOCAL_SUFFIX};
use super::types::{ConfigError, ConfigLayer};
use super::validation::validate;
use crate::commands::{CommandRegistry, CommandSpec, EntryKind};

/// Configuration snapshot shared by every component.
///
/// Built once at startup; the only shared mutable state lives in
/// [`crate::session::SharedState`].
#[derive(Clone)]
pub struct Context {
    /// Bot identity, used as the IRC nick.
    pub name: String,
    /// Private control channel.
    pub home: String,
    /// Default shared room, always a member of `rooms`.
    pub joint: String,
    /// Shared rooms joined besides `home`.
    pub rooms: Vec<String>,
    /// Substrings of `nick!user@host` allowed to run commands.
    pub permitted: Vec<String>,
    pub server: String,
    pub port: u16,
    pub tls: bool,
    pub password: Option<String>,
    pub bridge_port: u16,
    pub poll: Duration,
    pub retry: Duration,
    pub send: Duration,
    pub command_timeout: Duration,
    pub cooldown: Duration,
    pub registry: Arc<CommandRegistry>,
}

impl Context {
    /// Resolve a merged layer against the machine hostname.
    ///
    /// The returned context has an empty command registry.
    pub fn resolve(layer: &ConfigLayer, host: &str) -> Self {
        let joint = layer.joint.clone().unwrap_or_else(defaults::default_joint);
        let mut rooms = layer.rooms.clone().unwrap_or_default();
        if !rooms.contains(&joint) {
            rooms.push(joint.clone());
        }

        Self {
            name: layer.name.clone().unwrap_or_else(|| format!("{host}-bot")),
            home: layer.hostname.clone().unwrap_or_else(|| format!("#{host}")),
            joint,
            rooms,
            permitted: layer
                .permitted
                .clone()
                .unwrap_or_else(defaults::default_permitted),
            server: layer.server.clone().unwrap_or_else(defaults::default_server),
            port: layer.port.unwrap_or_else(defaults::default_port),
            tls: layer.tls.unwrap_or(true),
            password: layer.password.clone().filter(|p| !p.is_empty()),
            bridge_port: layer
                .bridge_port
                .or(layer.zmq)
                .unwrap_or_else(defaults::default_bridge_port),
            poll: Duration::from_secs(layer.poll.unwrap_or_else(defaults::default_poll)),
            retry: Duration::from_secs(layer.retry.unwrap_or_else(defaults::default_retry)),
            send: Duration::from_secs(layer.send.unwrap_or_else(defaults::default_send)),
            command_timeout: Duration::from_secs(
                layer
                    .command_timeout
                    .unwrap_or_else(defaults::default_command_timeout),
            ),
            cooldown: Duration::from_secs(
                layer.cooldown.unwrap_or_else(defaults::default_cooldown),
            ),
            registry: Arc::new(CommandRegistry::default()),
        }
    }

    /// Replace the command registry.
    pub fn with_registry(mut self, registry: CommandRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// Every channel the bot joins: home first, then the rooms.
    pub fn channels(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.home.as_str()).chain(self.rooms.iter().map(String::as_str))
    }

    /// Whether `target` is the home channel or one of the rooms.
    pub fn is_channel(&self, target: &str) -> bool {
        target == self.home || self.is_room(target)
    }

    pub fn is_room(&self, target: &str) -> bool {
        self.rooms.iter().any(|r| r == target)
    }

    /// Whether a sender mask matches any permitted pattern.
    pub fn is_permitted(&self, source: &str) -> bool {
        self.permitted.iter().any(|p| source.contains(p.as_str()))
    }
}

/// All configuration layers merged, with command specs in load order.
#[derive(Debug, Default)]
pub struct LoadedConfig {
    pub layer: ConfigLayer,
    pub specs: Vec<CommandSpec>,
}

/// Path of the override file for `path`.
pub fn local_path(path: &Path) -> PathBuf {
    let mut raw = path.as_os_str().to_os_string();
    raw.push(LOCAL_SUFFIX);
    PathBuf::from(raw)
}

/// Read the base file and, if present, its `.local` override.
pub fn load_layers(path: &Path) -> Result<LoadedConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::Missing(path.to_path_buf()));
    }

    let mut loaded = LoadedConfig::default();
    let base = ConfigLayer::load(path)?;
    merge_layer(&mut loaded, base);

    let local = local_path(path);
    if local.exists() {
        info!(path = %local.display(), "loading local config");
        merge_layer(&mut loaded, ConfigLayer::load(&local)?);
    }

    Ok(loaded)
}

fn merge_layer(loaded: &mut LoadedConfig, layer: ConfigLayer) {
    for key in layer.extra.keys() {
        debug!(key = %key, "ignoring unknown config key");
    }
    loaded.layer.overlay(&layer);
    let shells = layer
        .commands
        .iter()
        .map(|(token, path)| CommandSpec::new(token, EntryKind::Shell, path));
    let modules = layer
        .modules
        .iter()
        .map(|(token, path)| CommandSpec::new(token, EntryKind::Module, path));
    loaded.specs.extend(shells.chain(modules));
}

/// Machine hostname used for identity defaults.
pub fn machine_hostname() -> Result<String, ConfigError> {
    let raw = hostname::get().map_err(ConfigError::Hostname)?;
    Ok(raw.to_string_lossy().into_owned())
}

/// Read the layers and resolve them for this machine, without loading commands.
pub fn resolve(path: &Path) -> Result<Context, ConfigError> {
    let loaded = load_layers(path)?;
    Ok(Context::resolve(&loaded.layer, &machine_hostname()?))
}

/// Load configuration layers, resolve and validate the context, then load
/// the command registry.
pub async fn load(path: &Path) -> Result<Context, ConfigError> {
    let loaded = load_layers(path)?;
    let host = machine_hostname()?;
    let ctx = Context::resolve(&loaded.layer, &host);
    validate(&ctx).map_err(ConfigError::Invalid)?;
    let registry = CommandRegistry::load(&loaded.specs, ctx.command_timeout).await;
    info!(commands = ?registry.tokens().collect::<Vec<_>>(), "command registry loaded");
    Ok(ctx.with_registry(registry))
}
