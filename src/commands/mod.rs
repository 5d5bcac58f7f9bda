//! Command registry: trigger tokens mapped to shell commands or modules.
//!
//! Entries come from the `commands` and `modules` config maps. Tokens are
//! unique; a later registration replaces an earlier one, so the `.local`
//! layer wins over the base file.

pub mod matrix;
pub mod module;
pub mod shell;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

pub use module::{Capabilities, Module, ProcessModule};
pub use shell::{Captured, ShellCommand, run_captured};

/// Leading character of a command line.
pub const SENTINEL: char = '!';

/// Tokens handled by the router itself.
pub const BUILTINS: &[&str] = &["!status", "!debug", "!help", "!restart", "!killkillkill"];

pub fn is_builtin(token: &str) -> bool {
    BUILTINS.contains(&token)
}

/// Config map an entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Shell,
    Module,
}

/// An unloaded registry entry, as read from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Trigger token including the sentinel.
    pub token: String,
    pub kind: EntryKind,
    pub path: String,
}

impl CommandSpec {
    /// Config keys are stored without the sentinel; it is added here.
    pub fn new(token: &str, kind: EntryKind, path: &str) -> Self {
        let token = if token.starts_with(SENTINEL) {
            token.to_string()
        } else {
            format!("{SENTINEL}{token}")
        };
        Self {
            token,
            kind,
            path: path.to_string(),
        }
    }
}

/// A loaded registry entry.
#[derive(Clone)]
pub enum CommandEntry {
    Shell(ShellCommand),
    Module(Arc<dyn Module>),
}

impl std::fmt::Debug for CommandEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shell(cmd) => f.debug_tuple("Shell").field(&cmd.path()).finish(),
            Self::Module(m) => f
                .debug_tuple("Module")
                .field(&m.name())
                .field(&m.capabilities())
                .finish(),
        }
    }
}

/// Trigger token lookup table.
#[derive(Debug, Default, Clone)]
pub struct CommandRegistry {
    entries: BTreeMap<String, CommandEntry>,
}

impl CommandRegistry {
    /// Load every spec in order. Entries that fail to load are logged and
    /// skipped without affecting the rest.
    pub async fn load(specs: &[CommandSpec], timeout: Duration) -> Self {
        let mut registry = Self::default();
        for spec in specs {
            match spec.kind {
                EntryKind::Shell => {
                    registry.register(
                        &spec.token,
                        CommandEntry::Shell(ShellCommand::new(&spec.path, timeout)),
                    );
                }
                EntryKind::Module => {
                    match module::load_module(&spec.token, &spec.path, timeout).await {
                        Ok(loaded) => {
                            if loaded.capabilities().is_empty() {
                                warn!(
                                    token = %spec.token,
                                    path = %spec.path,
                                    "module exposes no capabilities and will never be invoked"
                                );
                            }
                            registry.register(&spec.token, CommandEntry::Module(Arc::from(loaded)));
                        }
                        Err(e) => {
                            warn!(token = %spec.token, path = %spec.path, error = %e, "failed to load module");
                        }
                    }
                }
            }
        }
        registry
    }

    /// Insert or replace an entry.
    pub fn register(&mut self, token: &str, entry: CommandEntry) {
        if is_builtin(token) {
            warn!(token = %token, "command shadows a builtin and will not be reachable by token");
        }
        info!(token = %token, entry = ?entry, "registering command");
        if self.entries.insert(token.to_string(), entry).is_some() {
            warn!(token = %token, "command re-registered, replacing previous entry");
        }
    }

    pub fn get(&self, token: &str) -> Option<&CommandEntry> {
        self.entries.get(token)
    }

    /// Registered tokens in sorted order.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Modules with the observe capability, in token order.
    pub fn observers(&self) -> impl Iterator<Item = &Arc<dyn Module>> {
        self.entries.values().filter_map(|entry| match entry {
            CommandEntry::Module(m) if m.capabilities().observe => Some(m),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
