//! Scripted chat connector.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use smirc::config::Context;
use smirc::error::SessionError;
use smirc::session::{ChatConnection, Connector};
use smirc_proto::Message;
use tokio::sync::mpsc;

/// Test-side view of one accepted session.
pub struct SessionHandle {
    /// Messages the bot will receive.
    pub inbound: mpsc::UnboundedSender<Message>,
    sent: Arc<Mutex<Vec<Message>>>,
}

impl SessionHandle {
    /// Everything the bot wrote so far.
    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().clone()
    }

    pub fn push(&self, msg: Message) {
        let _ = self.inbound.send(msg);
    }
}

struct MockConnection {
    inbound: mpsc::UnboundedReceiver<Message>,
    sent: Arc<Mutex<Vec<Message>>>,
}

#[async_trait]
impl ChatConnection for MockConnection {
    async fn send(&mut self, msg: &Message) -> Result<(), SessionError> {
        self.sent.lock().push(msg.clone());
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<Message>, SessionError> {
        Ok(self.inbound.recv().await)
    }
}

enum Plan {
    Refuse,
    Accept(MockConnection),
}

#[derive(Default)]
struct Inner {
    attempts: u32,
    plans: VecDeque<Plan>,
}

/// Connector that follows a script of accepted and refused attempts.
///
/// Once the script runs out every further attempt is refused.
#[derive(Clone, Default)]
pub struct MockConnector {
    inner: Arc<Mutex<Inner>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an accepted session and return its handle.
    pub fn accept(&self) -> SessionHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let sent = Arc::new(Mutex::new(Vec::new()));
        self.inner.lock().plans.push_back(Plan::Accept(MockConnection {
            inbound: rx,
            sent: Arc::clone(&sent),
        }));
        SessionHandle { inbound: tx, sent }
    }

    /// Queue a refused attempt.
    #[allow(dead_code)]
    pub fn refuse(&self) {
        self.inner.lock().plans.push_back(Plan::Refuse);
    }

    /// Connection attempts made so far.
    pub fn attempts(&self) -> u32 {
        self.inner.lock().attempts
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, ctx: &Context) -> Result<Box<dyn ChatConnection>, SessionError> {
        let plan = {
            let mut inner = self.inner.lock();
            inner.attempts += 1;
            inner.plans.pop_front().unwrap_or(Plan::Refuse)
        };
        match plan {
            Plan::Accept(conn) => Ok(Box::new(conn)),
            Plan::Refuse => Err(SessionError::Connect {
                server: ctx.server.clone(),
                source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
            }),
        }
    }
}
