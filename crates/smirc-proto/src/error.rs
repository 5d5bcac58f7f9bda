//! Error types for the IRC protocol library.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Top-level protocol errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Message exceeded maximum allowed length.
    #[error("message too long: {actual} bytes (limit: {limit})")]
    MessageTooLong {
        /// Actual message length.
        actual: usize,
        /// Maximum allowed length.
        limit: usize,
    },

    /// Illegal control character in message.
    #[error("illegal control character: {0:?}")]
    IllegalControlChar(char),

    /// Failed to parse an IRC message.
    #[error("invalid message: {string}")]
    InvalidMessage {
        /// The invalid message string.
        string: String,
        /// The underlying cause.
        #[source]
        cause: MessageParseError,
    },
}

/// Errors produced while parsing a single IRC line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum MessageParseError {
    /// The line was empty after trimming the line ending.
    #[error("empty message")]
    EmptyMessage,

    /// The line had tags or a prefix but no command.
    #[error("missing command")]
    MissingCommand,

    /// The prefix contained whitespace or control characters.
    #[error("invalid prefix: {0}")]
    InvalidPrefix(String),
}

/// Control characters that may never appear inside an IRC line.
///
/// NUL is tolerated; CR and LF are handled by the framing layer.
pub(crate) fn is_illegal_control_char(ch: char) -> bool {
    matches!(ch, '\r' | '\n')
}
