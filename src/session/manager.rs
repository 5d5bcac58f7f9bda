//! Connection manager: the chat session state machine.
//!
//! ```text
//! Connecting --welcome--> Joining --joined--> Ready
//!     ^                                         |
//!     |                        reset / no pongs / transport error
//!     |                                         v
//!     +---------------- Backoff <---------- Resetting
//!                          |
//!                  failures > 3: cooldown, stop bridge, exit
//! ```
//!
//! `Killed` is entered from any phase once a kill command was accepted.

use smirc_proto::{Command, Message};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{Instrument, debug, info, warn};

use super::connection::{ChatConnection, Connector};
use super::outbox::Outbox;
use super::state::SharedState;
use crate::bridge::BridgeHandle;
use crate::config::Context;
use crate::delivery::DeliveryMessage;
use crate::error::SessionError;
use crate::event::ChatEvent;
use crate::router::Router;
use crate::telemetry::spans;

/// Poll cycles between health pings.
pub const PING_EVERY: u32 = 10;
/// Outstanding pings tolerated before the peer is declared unresponsive.
pub const PONG_LIMIT: u32 = 10;
/// Consecutive failures tolerated before the process gives up.
pub const MAX_FAILURES: u32 = 3;

/// Session lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Connecting,
    Joining,
    Ready,
    Resetting,
    Killed,
    Backoff,
}

/// Why the manager stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    /// A kill command was accepted.
    Killed,
    /// Too many consecutive session failures.
    RetriesExhausted,
}

impl Shutdown {
    /// Process exit status for this shutdown.
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Killed => 1,
            Self::RetriesExhausted => 0,
        }
    }
}

/// Owns the chat session lifecycle.
pub struct ConnectionManager<C> {
    ctx: Context,
    connector: C,
    state: SharedState,
    router: Router,
    deliveries: mpsc::UnboundedReceiver<DeliveryMessage>,
    bridge: BridgeHandle,
    phase: Phase,
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(
        ctx: Context,
        connector: C,
        state: SharedState,
        deliveries: mpsc::UnboundedReceiver<DeliveryMessage>,
        bridge: BridgeHandle,
    ) -> Self {
        let router = Router::new(ctx.clone(), state.clone());
        Self {
            ctx,
            connector,
            state,
            router,
            deliveries,
            bridge,
            phase: Phase::Connecting,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn transition(&mut self, to: Phase) {
        if self.phase != to {
            debug!(from = ?self.phase, to = ?to, "session phase");
            self.phase = to;
        }
    }

    /// Run sessions until killed or out of retries.
    pub async fn run(mut self) -> Shutdown {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            self.transition(Phase::Connecting);
            self.state.begin_handshake();

            let span = spans::session(&self.ctx.server, attempt);
            let outcome = self.attempt().instrument(span).await;

            let err = match outcome {
                Ok(shutdown) => {
                    self.transition(Phase::Killed);
                    self.bridge.stop();
                    info!("killed.");
                    return shutdown;
                }
                Err(err) => err,
            };

            if err.is_requested() {
                self.transition(Phase::Resetting);
                info!(reason = %err, "resetting session");
            } else {
                warn!(error = %err, code = err.error_code(), "session failed");
            }
            self.state.mark_not_ready();
            self.transition(Phase::Backoff);

            let failures = self.state.record_failure();
            if failures > MAX_FAILURES {
                warn!(
                    failures,
                    cooldown = ?self.ctx.cooldown,
                    "too many failures, cooling down before exit"
                );
                tokio::time::sleep(self.ctx.cooldown).await;
                self.bridge.stop();
                info!("retries exhausted.");
                return Shutdown::RetriesExhausted;
            }
            info!(failures, retry = ?self.ctx.retry, "will retry shortly");
            tokio::time::sleep(self.ctx.retry).await;
        }
    }

    /// One connect-and-serve attempt. `Ok` only for a kill.
    async fn attempt(&mut self) -> Result<Shutdown, SessionError> {
        let mut conn = self.connector.connect(&self.ctx).await?;
        let result = self.serve(conn.as_mut()).await;
        let reason = if result.is_ok() {
            "killed"
        } else {
            "reconnecting..."
        };
        if let Err(e) = conn.disconnect(reason).await {
            debug!(error = %e, "disconnect failed");
        }
        result
    }

    async fn serve(&mut self, conn: &mut dyn ChatConnection) -> Result<Shutdown, SessionError> {
        let mut ping_cycles = 0u32;
        loop {
            self.pump(conn).await?;

            if self.state.kill_requested() {
                return Ok(Shutdown::Killed);
            }
            if self.state.is_ready() {
                self.drain_one(conn).await?;
            }
            if self.state.take_reset() {
                return Err(SessionError::ResetRequested);
            }
            if let Some(pending) = self.state.take_ping_timeout(PONG_LIMIT) {
                return Err(SessionError::PingTimeout(pending));
            }

            ping_cycles += 1;
            if ping_cycles >= PING_EVERY {
                ping_cycles = 0;
                conn.send(&Message::ping(self.ctx.home.as_str())).await?;
                let pending = self.state.ping_sent();
                debug!(pending, "health ping sent");
            }
        }
    }

    /// Handle inbound messages until one poll interval has elapsed.
    async fn pump(&mut self, conn: &mut dyn ChatConnection) -> Result<(), SessionError> {
        let deadline = Instant::now() + self.ctx.poll;
        loop {
            match tokio::time::timeout_at(deadline, conn.recv()).await {
                Err(_) => return Ok(()),
                Ok(Ok(Some(msg))) => self.on_message(conn, msg).await?,
                Ok(Ok(None)) => return Err(SessionError::Closed),
                Ok(Err(e)) => return Err(e),
            }
        }
    }

    async fn on_message(
        &mut self,
        conn: &mut dyn ChatConnection,
        msg: Message,
    ) -> Result<(), SessionError> {
        match &msg.command {
            Command::PING(server, extra) => {
                conn.send(&Command::PONG(server.clone(), extra.clone()).into())
                    .await?;
            }
            Command::PONG(..) => {
                debug!("pong");
                self.state.pong_received();
            }
            command if command.is_welcome() => self.join(conn).await?,
            Command::PRIVMSG(..) => {
                if let Some(event) = ChatEvent::from_message(&msg) {
                    let mut outbox = Outbox::new();
                    self.router.handle(&event, &mut outbox).await;
                    flush(conn, &mut outbox).await?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    async fn join(&mut self, conn: &mut dyn ChatConnection) -> Result<(), SessionError> {
        info!("connected");
        self.transition(Phase::Joining);
        for channel in self.ctx.channels() {
            info!(channel = %channel, "joining");
            conn.send(&Message::join(channel)).await?;
        }
        let first = self.state.mark_ready();
        self.transition(Phase::Ready);
        if first {
            conn.send(&Message::privmsg(self.ctx.home.as_str(), "online"))
                .await?;
        }
        Ok(())
    }

    async fn drain_one(&mut self, conn: &mut dyn ChatConnection) -> Result<(), SessionError> {
        let Ok(msg) = self.deliveries.try_recv() else {
            return Ok(());
        };
        let mut outbox = Outbox::new();
        self.router.deliver(&msg, &mut outbox);
        flush(conn, &mut outbox).await
    }
}

async fn flush(conn: &mut dyn ChatConnection, outbox: &mut Outbox) -> Result<(), SessionError> {
    for msg in outbox.drain() {
        conn.send(&msg).await?;
    }
    Ok(())
}
