//! Configuration loading and management.
//!
//! - [`types`]: raw JSON layers ([`ConfigLayer`]) and [`ConfigError`]
//! - [`context`]: layer merging and the resolved [`Context`]
//! - [`validation`]: startup checks ([`ValidationError`])
//! - [`defaults`]: default values

pub mod context;
pub mod defaults;
mod types;
pub mod validation;

pub use context::{
    Context, LoadedConfig, load, load_layers, local_path, machine_hostname, resolve,
};
pub use types::{ConfigError, ConfigLayer};
pub use validation::{ValidationError, is_placeholder_server, validate};
