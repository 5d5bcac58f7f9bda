//! Outbound message buffer filled by dispatch and flushed by the session.

use smirc_proto::Message;

/// Messages waiting to be written to the chat connection, in order.
#[derive(Debug, Default)]
pub struct Outbox {
    queue: Vec<Message>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `text` for `target`, one PRIVMSG per non-blank line.
    pub fn say(&mut self, target: &str, text: &str) {
        self.queue.extend(
            text.lines()
                .filter(|line| !line.trim().is_empty())
                .map(|line| Message::privmsg(target, line)),
        );
    }

    pub fn push(&mut self, msg: Message) {
        self.queue.push(msg);
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Take all queued messages, leaving the outbox empty.
    pub fn drain(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.queue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smirc_proto::Command;

    #[test]
    fn say_splits_and_skips_blank_lines() {
        let mut outbox = Outbox::new();
        outbox.say("#ops", "one\n\n  \ntwo\r\n");
        let sent = outbox.drain();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].command, Command::PRIVMSG("#ops".into(), "one".into()));
        assert_eq!(sent[1].command, Command::PRIVMSG("#ops".into(), "two".into()));
        assert!(outbox.is_empty());
    }
}
