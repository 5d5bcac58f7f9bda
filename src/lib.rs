//! smirc - IRC status/control bot with a local message bridge.
//!
//! The bot keeps one IRC session alive (the [`session`] connection
//! manager), relays publish requests from local senders (the [`bridge`]),
//! and answers `!` commands in its channels (the [`router`] plus the
//! [`commands`] registry).

pub mod bridge;
pub mod cli;
pub mod commands;
pub mod config;
pub mod delivery;
pub mod error;
pub mod event;
pub mod router;
pub mod session;
pub mod telemetry;
