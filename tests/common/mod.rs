//! Integration test common infrastructure.
//!
//! Provides a scripted chat connector so the connection manager can be
//! driven without a network, plus context and message helpers.

#[allow(dead_code)]
pub mod mock;

#[allow(unused_imports)]
pub use mock::{MockConnector, SessionHandle};

use smirc::config::{ConfigLayer, Context};
use smirc_proto::{Command, Message};

/// Context with home `#box1`, rooms `#ops` and `#fragmented`, identity
/// `box1-bot`, permitted pattern `admin@`, 1s poll and 10s retry.
#[allow(dead_code)]
pub fn test_context() -> Context {
    let layer = ConfigLayer {
        server: Some("irc.test".into()),
        rooms: Some(vec!["#ops".into()]),
        permitted: Some(vec!["admin@".into()]),
        poll: Some(1),
        retry: Some(10),
        cooldown: Some(900),
        ..Default::default()
    };
    Context::resolve(&layer, "box1")
}

/// Parse a raw IRC line.
#[allow(dead_code)]
pub fn line(raw: &str) -> Message {
    raw.parse().expect("valid IRC line")
}

#[allow(dead_code)]
pub fn welcome() -> Message {
    line(":irc.test 001 box1-bot :Welcome")
}

/// A channel message from `nick!user@host`.
#[allow(dead_code)]
pub fn privmsg(source: &str, target: &str, text: &str) -> Message {
    line(&format!(":{source} PRIVMSG {target} :{text}"))
}

/// `(target, text)` of every PRIVMSG in `sent`.
#[allow(dead_code)]
pub fn said(sent: &[Message]) -> Vec<(String, String)> {
    sent.iter()
        .filter_map(|m| match &m.command {
            Command::PRIVMSG(t, x) => Some((t.clone(), x.clone())),
            _ => None,
        })
        .collect()
}
