//! Chat events handed from the session to the router and modules.

use serde::Serialize;
use smirc_proto::{Command, Message};

/// A channel message the bot observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatEvent {
    /// Full sender mask, `nick!user@host`.
    pub source: String,
    /// Sender nickname, when the prefix carries one.
    pub nick: Option<String>,
    /// Channel the line was sent to.
    pub target: String,
    /// The line itself.
    pub text: String,
}

impl ChatEvent {
    /// Extract a channel PRIVMSG from a raw message.
    ///
    /// Direct messages to the bot's nick are not events: only channel
    /// traffic qualifies.
    pub fn from_message(msg: &Message) -> Option<Self> {
        match &msg.command {
            Command::PRIVMSG(target, text) if is_channel_name(target) => Some(Self {
                source: msg
                    .prefix
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default(),
                nick: msg.source_nickname().map(str::to_owned),
                target: target.clone(),
                text: text.clone(),
            }),
            _ => None,
        }
    }
}

/// A trigger-token invocation passed to a command handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    /// Trigger token including the sentinel, e.g. `!uptime`.
    pub token: String,
    /// Whitespace-separated tokens after the trigger.
    pub args: Vec<String>,
    /// Channel the reply goes to.
    pub target: String,
    /// Full sender mask.
    pub source: String,
}

fn is_channel_name(target: &str) -> bool {
    target.starts_with(['#', '&', '+', '!'])
}
