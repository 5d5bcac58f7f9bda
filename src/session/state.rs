//! Session flags shared between the event loop and command dispatch.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::delivery::Targeting;

/// Flags and counters for the chat session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// Joined and serving.
    pub ready: bool,
    /// Health pings sent without a pong since.
    pub pending_pongs: u32,
    /// A restart was requested.
    pub reset: bool,
    /// A full process kill was requested.
    pub kill: bool,
    /// Consecutive failed sessions; survives reconnects.
    pub failures: u32,
    /// Which delivery classes are emitted.
    pub targeting: Targeting,
    /// Whether the online report was already sent in this process.
    pub reported_in: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            ready: false,
            pending_pongs: 0,
            reset: false,
            kill: false,
            failures: 0,
            targeting: Targeting::default(),
            reported_in: false,
        }
    }
}

/// Cloneable handle to the session state.
///
/// Every accessor takes the lock for one short critical section; nothing
/// awaits while holding it.
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<Mutex<SessionState>>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> SessionState {
        self.inner.lock().clone()
    }

    /// Start of a new handshake: not ready, no pending pongs, no reset.
    pub fn begin_handshake(&self) {
        let mut state = self.inner.lock();
        state.ready = false;
        state.pending_pongs = 0;
        state.reset = false;
    }

    /// Joined all channels. Clears the failure counter.
    ///
    /// Returns `true` the first time it is called in this process, which
    /// is when the online report is due.
    pub fn mark_ready(&self) -> bool {
        let mut state = self.inner.lock();
        state.ready = true;
        state.failures = 0;
        !std::mem::replace(&mut state.reported_in, true)
    }

    pub fn is_ready(&self) -> bool {
        self.inner.lock().ready
    }

    pub fn mark_not_ready(&self) {
        self.inner.lock().ready = false;
    }

    /// Count a failed session and return the new total.
    pub fn record_failure(&self) -> u32 {
        let mut state = self.inner.lock();
        state.failures += 1;
        state.failures
    }

    pub fn failures(&self) -> u32 {
        self.inner.lock().failures
    }

    /// A health ping went out; returns the pending count.
    pub fn ping_sent(&self) -> u32 {
        let mut state = self.inner.lock();
        state.pending_pongs += 1;
        state.pending_pongs
    }

    pub fn pong_received(&self) {
        self.inner.lock().pending_pongs = 0;
    }

    pub fn pending_pongs(&self) -> u32 {
        self.inner.lock().pending_pongs
    }

    /// If more than `limit` pings are outstanding, clear the counter and
    /// return the count that tripped it.
    pub fn take_ping_timeout(&self, limit: u32) -> Option<u32> {
        let mut state = self.inner.lock();
        (state.pending_pongs > limit).then(|| std::mem::take(&mut state.pending_pongs))
    }

    pub fn request_reset(&self) {
        self.inner.lock().reset = true;
    }

    /// Consume a pending reset request.
    pub fn take_reset(&self) -> bool {
        std::mem::take(&mut self.inner.lock().reset)
    }

    pub fn request_kill(&self) {
        self.inner.lock().kill = true;
    }

    pub fn kill_requested(&self) -> bool {
        self.inner.lock().kill
    }

    pub fn targeting(&self) -> Targeting {
        self.inner.lock().targeting
    }

    pub fn set_targeting(&self, targeting: Targeting) {
        self.inner.lock().targeting = targeting;
    }
}
