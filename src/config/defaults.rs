//! Default values for configuration keys.
//!
//! Separated into its own module for clarity and reuse.

/// Default config location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/epiphyte.d/smirc.json";

/// Suffix of the optional override file loaded after the base file.
pub const LOCAL_SUFFIX: &str = ".local";

/// The example server value shipped in sample configs; refused at startup.
pub const PLACEHOLDER_SERVER: &str = "example.com";

// =============================================================================
// Connection Defaults
// =============================================================================

pub fn default_server() -> String {
    PLACEHOLDER_SERVER.to_string()
}

pub fn default_port() -> u16 {
    6697
}

pub fn default_bridge_port() -> u16 {
    5555
}

// =============================================================================
// Timing Defaults (seconds)
// =============================================================================

pub fn default_poll() -> u64 {
    3
}

pub fn default_retry() -> u64 {
    10
}

pub fn default_send() -> u64 {
    60
}

pub fn default_command_timeout() -> u64 {
    60
}

pub fn default_cooldown() -> u64 {
    900
}

// =============================================================================
// Room Defaults
// =============================================================================

pub fn default_joint() -> String {
    "#fragmented".to_string()
}

// =============================================================================
// Permission Defaults
// =============================================================================

/// The empty pattern matches every sender.
pub fn default_permitted() -> Vec<String> {
    vec![String::new()]
}
