//! Owned IRC messages: parsing and serialization.
//!
//! IRCv3 tags are accepted on input and discarded; the bot never sends them.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::command::Command;
use crate::error::{MessageParseError, ProtocolError};
use crate::prefix::Prefix;

/// An owned IRC message.
///
/// ```
/// use smirc_proto::Message;
///
/// let msg: Message = ":nick!user@host PRIVMSG #channel :Hello!".parse().unwrap();
/// assert_eq!(msg.source_nickname(), Some("nick"));
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct Message {
    /// Message prefix/source (e.g., `nick!user@host`).
    pub prefix: Option<Prefix>,
    /// The IRC command and its parameters.
    pub command: Command,
}

impl Message {
    /// Get the nickname from the message prefix, if present.
    pub fn source_nickname(&self) -> Option<&str> {
        self.prefix.as_ref().and_then(Prefix::nick)
    }

    /// Create a PRIVMSG message to a target with text.
    #[must_use]
    pub fn privmsg<T, M>(target: T, text: M) -> Self
    where
        T: Into<String>,
        M: Into<String>,
    {
        Command::PRIVMSG(target.into(), text.into()).into()
    }

    /// Create a JOIN message for a channel.
    #[must_use]
    pub fn join<C>(channel: C) -> Self
    where
        C: Into<String>,
    {
        Command::JOIN(channel.into(), None).into()
    }

    /// Create a NICK message.
    #[must_use]
    pub fn nick<N>(nickname: N) -> Self
    where
        N: Into<String>,
    {
        Command::NICK(nickname.into()).into()
    }

    /// Create a USER message for registration.
    #[must_use]
    pub fn user<U, R>(username: U, realname: R) -> Self
    where
        U: Into<String>,
        R: Into<String>,
    {
        Command::USER(username.into(), "0".into(), realname.into()).into()
    }

    /// Create a PASS message.
    #[must_use]
    pub fn pass<P>(password: P) -> Self
    where
        P: Into<String>,
    {
        Command::PASS(password.into()).into()
    }

    /// Create a PING message.
    #[must_use]
    pub fn ping<S>(server: S) -> Self
    where
        S: Into<String>,
    {
        Command::PING(server.into(), None).into()
    }

    /// Create a PONG message.
    #[must_use]
    pub fn pong<S>(server: S) -> Self
    where
        S: Into<String>,
    {
        Command::PONG(server.into(), None).into()
    }

    /// Create a QUIT message with an optional reason.
    #[must_use]
    pub fn quit(reason: Option<&str>) -> Self {
        Command::QUIT(reason.map(str::to_owned)).into()
    }
}

impl From<Command> for Message {
    fn from(command: Command) -> Self {
        Message {
            prefix: None,
            command,
        }
    }
}

impl FromStr for Message {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Message, Self::Err> {
        let invalid = |cause| ProtocolError::InvalidMessage {
            string: s.to_owned(),
            cause,
        };

        let mut rest = s.trim_end_matches(&['\r', '\n'][..]);
        if rest.trim().is_empty() {
            return Err(invalid(MessageParseError::EmptyMessage));
        }

        // Tags are parsed past, not kept.
        if rest.starts_with('@') {
            rest = rest.split_once(' ').map(|(_, r)| r).unwrap_or("");
        }
        rest = rest.trim_start_matches(' ');

        let prefix = match rest.strip_prefix(':') {
            Some(stripped) => {
                let (raw, remainder) = stripped.split_once(' ').unwrap_or((stripped, ""));
                rest = remainder.trim_start_matches(' ');
                Some(Prefix::try_from_str(raw).map_err(invalid)?)
            }
            None => None,
        };

        let (name, mut params) = rest.split_once(' ').unwrap_or((rest, ""));
        if name.is_empty() {
            return Err(invalid(MessageParseError::MissingCommand));
        }

        let mut args = Vec::new();
        loop {
            params = params.trim_start_matches(' ');
            if params.is_empty() {
                break;
            }
            if let Some(trailing) = params.strip_prefix(':') {
                args.push(trailing);
                break;
            }
            match params.split_once(' ') {
                Some((arg, remainder)) => {
                    args.push(arg);
                    params = remainder;
                }
                None => {
                    args.push(params);
                    break;
                }
            }
        }

        Ok(Message {
            prefix,
            command: Command::new(name, args),
        })
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(ref prefix) = self.prefix {
            write!(f, ":{} ", prefix)?;
        }

        write!(f, "{}\r\n", self.command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_ping() {
        let msg: Message = "PING :server\r\n".parse().unwrap();
        assert_eq!(msg.command, Command::PING("server".into(), None));
        assert!(msg.prefix.is_none());
    }

    #[test]
    fn test_parse_privmsg_with_prefix() {
        let msg: Message = ":alice!al@ops.example.org PRIVMSG #ops :!restart bob-bot"
            .parse()
            .unwrap();
        assert_eq!(msg.source_nickname(), Some("alice"));
        assert_eq!(
            msg.command,
            Command::PRIVMSG("#ops".into(), "!restart bob-bot".into())
        );
    }

    #[test]
    fn test_parse_discards_tags() {
        let msg: Message = "@time=2023-01-01T00:00:00Z :srv.example.org 001 bot :Welcome"
            .parse()
            .unwrap();
        assert!(msg.command.is_welcome());
        assert_eq!(
            msg.prefix,
            Some(Prefix::ServerName("srv.example.org".into()))
        );
    }

    #[test]
    fn test_parse_middle_params_only() {
        let msg: Message = "JOIN #ops".parse().unwrap();
        assert_eq!(msg.command, Command::JOIN("#ops".into(), None));
    }

    #[test]
    fn test_parse_empty_fails() {
        assert!("\r\n".parse::<Message>().is_err());
        assert!(":prefix.only ".parse::<Message>().is_err());
    }

    #[test]
    fn test_serialize_with_prefix() {
        let mut msg = Message::privmsg("#ops", "hi");
        msg.prefix = Some(Prefix::new_from_str("bot!b@host"));
        assert_eq!(msg.to_string(), ":bot!b@host PRIVMSG #ops :hi\r\n");
    }
}
