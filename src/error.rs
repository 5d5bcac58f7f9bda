//! Unified error handling for smirc.
//!
//! Errors are grouped by how far they are allowed to travel:
//! [`SessionError`] unwinds the chat session into the reconnect path,
//! [`BridgeError`] makes the bridge rebind, and [`CommandError`] never leaves
//! the dispatch of the command that raised it.

use smirc_proto::{ProtocolError, TransportReadError};
use thiserror::Error;

// ============================================================================
// Session Errors (recoverable, trigger reconnect)
// ============================================================================

/// Errors that end the current chat session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("connect to {server} failed: {source}")]
    Connect {
        server: String,
        #[source]
        source: std::io::Error,
    },

    #[error("tls handshake with {server} failed: {reason}")]
    Tls { server: String, reason: String },

    #[error("transport read failed: {0}")]
    Read(#[from] TransportReadError),

    #[error("transport write failed: {0}")]
    Write(#[from] ProtocolError),

    #[error("connection closed by server")]
    Closed,

    #[error("restart requested")]
    ResetRequested,

    #[error("no recent pongs ({0} pings outstanding)")]
    PingTimeout(u32),
}

impl SessionError {
    /// Whether the session was torn down on purpose (restart command or
    /// unresponsive peer) rather than by a transport failure.
    pub fn is_requested(&self) -> bool {
        matches!(self, Self::ResetRequested | Self::PingTimeout(_))
    }

    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect",
            Self::Tls { .. } => "tls",
            Self::Read(_) => "read",
            Self::Write(_) => "write",
            Self::Closed => "closed",
            Self::ResetRequested => "reset_requested",
            Self::PingTimeout(_) => "ping_timeout",
        }
    }
}

// ============================================================================
// Bridge Errors (recoverable, trigger rebind)
// ============================================================================

/// Errors raised by the message bridge listener and the one-shot sender.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to bind bridge port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("bridge accept failed: {0}")]
    Accept(#[source] std::io::Error),

    #[error("bridge connection error: {0}")]
    Connection(#[from] tokio_util::codec::LinesCodecError),

    #[error("delivery queue closed")]
    QueueClosed,

    #[error("failed to connect to bridge port {port}: {source}")]
    Connect {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("no reply within {0:?}")]
    Timeout(std::time::Duration),

    #[error("connection closed before reply")]
    NoReply,

    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),
}

// ============================================================================
// Command Errors (contained per invocation)
// ============================================================================

/// Failures of a single shell or module invocation.
///
/// These are reported back to the requesting channel as text and never
/// escalate into session or bridge errors.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to spawn {path}: {source}")]
    Spawn {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to collect output: {0}")]
    Io(#[from] std::io::Error),

    #[error("output is not valid UTF-8: {0}")]
    Decode(#[from] std::string::FromUtf8Error),

    #[error("module {name} failed: {reason}")]
    Module { name: String, reason: String },
}
