//! # smirc-proto
//!
//! The client half of the IRC protocol as the smirc bot speaks it: message
//! parsing and serialization, a tokio line codec, and a framed transport over
//! plain TCP or client-side TLS.
//!
//! ```rust
//! use smirc_proto::{Command, Message};
//!
//! let msg: Message = ":alice!a@example.org PRIVMSG #ops :!status".parse().unwrap();
//! assert_eq!(msg.source_nickname(), Some("alice"));
//! assert!(matches!(msg.command, Command::PRIVMSG(ref t, _) if t == "#ops"));
//!
//! let reply = Message::privmsg("#ops", "alive: 1.0");
//! assert_eq!(reply.to_string(), "PRIVMSG #ops :alive: 1.0\r\n");
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod command;
pub mod error;
pub mod irc;
pub mod line;
pub mod message;
pub mod prefix;
pub mod transport;

pub use self::command::Command;
pub use self::error::{MessageParseError, ProtocolError};
pub use self::irc::IrcCodec;
pub use self::line::LineCodec;
pub use self::message::Message;
pub use self::prefix::Prefix;
pub use self::transport::{Transport, TransportReadError, MAX_IRC_LINE_LEN};
