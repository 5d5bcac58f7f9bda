//! IRC command types.
//!
//! Only the commands a registering, chatting client needs are typed; anything
//! else is preserved verbatim in [`Command::Raw`].
//!
//! # Reference
//! - RFC 2812: Internet Relay Chat: Client Protocol

use std::fmt::{self, Write};

/// RPL_WELCOME, sent once registration completes.
pub const RPL_WELCOME: u16 = 1;

/// IRC command with its parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Command {
    /// `PASS password`
    PASS(String),
    /// `NICK nickname`
    NICK(String),
    /// `USER username mode realname`
    USER(String, String, String),
    /// `QUIT [message]`
    QUIT(Option<String>),
    /// `JOIN channels [keys]`
    JOIN(String, Option<String>),
    /// `PART channels [message]`
    PART(String, Option<String>),
    /// `PRIVMSG target text`
    PRIVMSG(String, String),
    /// `NOTICE target text`
    NOTICE(String, String),
    /// `PING server1 [server2]`
    PING(String, Option<String>),
    /// `PONG server1 [server2]`
    PONG(String, Option<String>),
    /// Numeric reply: code and arguments.
    Response(u16, Vec<String>),
    /// Any command without a typed representation.
    Raw(String, Vec<String>),
}

impl Command {
    /// Build a command from its name and arguments.
    ///
    /// Known commands with an unexpected argument count fall back to
    /// [`Command::Raw`] so that a lenient server never breaks the reader.
    pub fn new(name: &str, args: Vec<&str>) -> Command {
        let upper = name.to_ascii_uppercase();
        let owned = |s: &&str| (*s).to_owned();

        match (upper.as_str(), args.as_slice()) {
            ("PASS", [p]) => Command::PASS(owned(p)),
            ("NICK", [n, ..]) => Command::NICK(owned(n)),
            ("USER", [u, m, _, r]) => Command::USER(owned(u), owned(m), owned(r)),
            ("QUIT", []) => Command::QUIT(None),
            ("QUIT", [m]) => Command::QUIT(Some(owned(m))),
            ("JOIN", [c]) => Command::JOIN(owned(c), None),
            ("JOIN", [c, k, ..]) => Command::JOIN(owned(c), Some(owned(k))),
            ("PART", [c]) => Command::PART(owned(c), None),
            ("PART", [c, m]) => Command::PART(owned(c), Some(owned(m))),
            ("PRIVMSG", [t, m]) => Command::PRIVMSG(owned(t), owned(m)),
            ("NOTICE", [t, m]) => Command::NOTICE(owned(t), owned(m)),
            ("PING", [s]) => Command::PING(owned(s), None),
            ("PING", [s, s2]) => Command::PING(owned(s), Some(owned(s2))),
            ("PONG", [s]) => Command::PONG(owned(s), None),
            ("PONG", [s, s2]) => Command::PONG(owned(s), Some(owned(s2))),
            (code, _) if code.len() == 3 && code.bytes().all(|b| b.is_ascii_digit()) => {
                match code.parse::<u16>() {
                    Ok(n) => Command::Response(n, args.iter().map(owned).collect()),
                    Err(_) => Command::Raw(upper.clone(), args.iter().map(owned).collect()),
                }
            }
            _ => Command::Raw(upper.clone(), args.iter().map(owned).collect()),
        }
    }

    /// The command verb as sent on the wire.
    pub fn name(&self) -> String {
        match self {
            Command::PASS(_) => "PASS".into(),
            Command::NICK(_) => "NICK".into(),
            Command::USER(..) => "USER".into(),
            Command::QUIT(_) => "QUIT".into(),
            Command::JOIN(..) => "JOIN".into(),
            Command::PART(..) => "PART".into(),
            Command::PRIVMSG(..) => "PRIVMSG".into(),
            Command::NOTICE(..) => "NOTICE".into(),
            Command::PING(..) => "PING".into(),
            Command::PONG(..) => "PONG".into(),
            Command::Response(code, _) => format!("{:03}", code),
            Command::Raw(name, _) => name.clone(),
        }
    }

    /// Whether this is RPL_WELCOME.
    pub fn is_welcome(&self) -> bool {
        matches!(self, Command::Response(RPL_WELCOME, _))
    }
}

/// Add a colon prefix if the trailing parameter is empty, contains a space,
/// or starts with ':'.
fn needs_colon_prefix(s: &str) -> bool {
    s.is_empty() || s.contains(' ') || s.starts_with(':')
}

/// Write `cmd` followed by its arguments, the last one as trailing when needed.
fn write_cmd(f: &mut fmt::Formatter<'_>, cmd: &str, args: &[&str]) -> fmt::Result {
    f.write_str(cmd)?;
    if let Some((trailing, middle)) = args.split_last() {
        for param in middle {
            f.write_char(' ')?;
            f.write_str(param)?;
        }
        f.write_char(' ')?;
        if needs_colon_prefix(trailing) {
            f.write_char(':')?;
        }
        f.write_str(trailing)?;
    }
    Ok(())
}

/// Write `cmd` with the last argument always in trailing position.
fn write_cmd_freeform(f: &mut fmt::Formatter<'_>, cmd: &str, args: &[&str]) -> fmt::Result {
    match args.split_last() {
        Some((suffix, middle)) => {
            f.write_str(cmd)?;
            for arg in middle {
                f.write_char(' ')?;
                f.write_str(arg)?;
            }
            f.write_str(" :")?;
            f.write_str(suffix)
        }
        None => f.write_str(cmd),
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::PASS(p) => write_cmd(f, "PASS", &[p]),
            Command::NICK(n) => write_cmd(f, "NICK", &[n]),
            Command::USER(u, m, r) => write_cmd_freeform(f, "USER", &[u, m, "*", r]),
            Command::QUIT(Some(m)) => write_cmd_freeform(f, "QUIT", &[m]),
            Command::QUIT(None) => f.write_str("QUIT"),
            Command::JOIN(c, Some(k)) => write_cmd(f, "JOIN", &[c, k]),
            Command::JOIN(c, None) => write_cmd(f, "JOIN", &[c]),
            Command::PART(c, Some(m)) => write_cmd_freeform(f, "PART", &[c, m]),
            Command::PART(c, None) => write_cmd(f, "PART", &[c]),
            Command::PRIVMSG(t, m) => write_cmd_freeform(f, "PRIVMSG", &[t, m]),
            Command::NOTICE(t, m) => write_cmd_freeform(f, "NOTICE", &[t, m]),
            Command::PING(s, Some(s2)) => write_cmd(f, "PING", &[s, s2]),
            Command::PING(s, None) => write_cmd(f, "PING", &[s]),
            Command::PONG(s, Some(s2)) => write_cmd(f, "PONG", &[s, s2]),
            Command::PONG(s, None) => write_cmd(f, "PONG", &[s]),
            Command::Response(code, args) => {
                let args: Vec<&str> = args.iter().map(String::as_str).collect();
                write_cmd(f, &format!("{:03}", code), &args)
            }
            Command::Raw(name, args) => {
                let args: Vec<&str> = args.iter().map(String::as_str).collect();
                write_cmd(f, name, &args)
            }
        }
    }
}
