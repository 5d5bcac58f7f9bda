//! Delivery messages bridged from external publishers into the chat session.

use serde::{Deserialize, Serialize};

use crate::config::Context;

/// Type tag fanning a message out to every room.
pub const PUBLIC: &str = "pub";
/// Type tag sending a message to the home channel.
pub const PRIVATE: &str = "priv";

/// One publish request.
///
/// `kind` holds any mix of [`PUBLIC`], [`PRIVATE`] and room names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryMessage {
    #[serde(rename = "type")]
    pub kind: Vec<String>,
    pub data: String,
}

/// Which delivery classes the session currently emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Targeting {
    pub rooms: bool,
    pub private: bool,
}

impl Default for Targeting {
    fn default() -> Self {
        Self {
            rooms: true,
            private: true,
        }
    }
}

impl DeliveryMessage {
    pub fn new(kind: Vec<String>, data: impl Into<String>) -> Self {
        Self {
            kind,
            data: data.into(),
        }
    }

    fn has(&self, tag: &str) -> bool {
        self.kind.iter().any(|k| k == tag)
    }

    /// Channels this message goes to, without duplicates, rooms first.
    pub fn targets(&self, ctx: &Context, targeting: Targeting) -> Vec<String> {
        let mut targets = Vec::new();
        if targeting.rooms {
            let broadcast = self.has(PUBLIC);
            targets.extend(
                ctx.rooms
                    .iter()
                    .filter(|room| broadcast || self.has(room))
                    .cloned(),
            );
        }
        if targeting.private && self.has(PRIVATE) && !targets.contains(&ctx.home) {
            targets.push(ctx.home.clone());
        }
        targets
    }

    /// Payload lines with blank lines removed.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.data.lines().filter(|l| !l.trim().is_empty())
    }
}
