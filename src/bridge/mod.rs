//! Message bridge: accepts publish requests and feeds the delivery queue.
//!
//! The listener serves one connection at a time. Each request line is a
//! JSON [`DeliveryMessage`]; it is answered with `ack` and then queued. A
//! line that does not decode is not acked and the connection is dropped.
//! Every wait is bounded by the poll interval so the stop signal is
//! checked regularly. Any other failure unbinds the socket and rebinds
//! after the retry interval.

pub mod sender;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{Instrument, debug, info, warn};

use crate::config::Context;
use crate::delivery::DeliveryMessage;
use crate::error::BridgeError;
use crate::telemetry::spans;

pub use sender::send;

/// Reply line for an accepted request.
pub const ACK: &str = "ack";

/// Longest accepted request line in bytes.
pub const MAX_REQUEST_LEN: usize = 64 * 1024;

/// Control requests for the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Stop,
}

/// Handle used to stop a running bridge.
#[derive(Debug, Clone)]
pub struct BridgeHandle {
    control: mpsc::UnboundedSender<Control>,
}

impl BridgeHandle {
    /// A handle and the receiving end of its control channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Control>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { control: tx }, rx)
    }

    /// Ask the listener to unwind at its next poll timeout.
    pub fn stop(&self) {
        if self.control.send(Control::Stop).is_err() {
            debug!("bridge already stopped");
        }
    }
}

enum Served {
    Continue,
    Stopped,
}

/// The bridge listener actor.
pub struct Bridge {
    addr: SocketAddr,
    poll: Duration,
    retry: Duration,
    queue: mpsc::UnboundedSender<DeliveryMessage>,
    control: mpsc::UnboundedReceiver<Control>,
}

impl Bridge {
    /// Create a listener for all interfaces on the configured bridge port.
    pub fn new(ctx: &Context, queue: mpsc::UnboundedSender<DeliveryMessage>) -> (Self, BridgeHandle) {
        let (handle, control) = BridgeHandle::channel();
        let bridge = Self {
            addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), ctx.bridge_port),
            poll: ctx.poll,
            retry: ctx.retry,
            queue,
            control,
        };
        (bridge, handle)
    }

    /// Bind to `addr` instead.
    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    /// Run until stopped.
    pub async fn listen(mut self) {
        let span = spans::bridge(self.addr.port());
        async move {
            loop {
                match self.serve().await {
                    Ok(()) => {
                        info!("stopping...");
                        return;
                    }
                    Err(BridgeError::QueueClosed) => {
                        warn!("delivery queue closed, stopping");
                        return;
                    }
                    Err(e) => {
                        warn!(error = %e, "bridge error");
                        info!("will rebind shortly");
                        tokio::select! {
                            _ = tokio::time::sleep(self.retry) => {}
                            _ = self.control.recv() => {
                                info!("stopping...");
                                return;
                            }
                        }
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    fn stop_requested(&mut self) -> bool {
        match self.control.try_recv() {
            Ok(Control::Stop) => true,
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Disconnected) => {
                debug!("control channel closed");
                true
            }
        }
    }

    async fn serve(&mut self) -> Result<(), BridgeError> {
        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|source| BridgeError::Bind {
                port: self.addr.port(),
                source,
            })?;
        info!(addr = %self.addr, "bridge listening");

        loop {
            match tokio::time::timeout(self.poll, listener.accept()).await {
                Err(_) => {
                    if self.stop_requested() {
                        return Ok(());
                    }
                }
                Ok(Ok((stream, peer))) => {
                    debug!(peer = %peer, "bridge connection");
                    if let Served::Stopped = self.serve_connection(stream, peer).await? {
                        return Ok(());
                    }
                }
                Ok(Err(e)) => return Err(BridgeError::Accept(e)),
            }
        }
    }

    async fn serve_connection(
        &mut self,
        stream: TcpStream,
        peer: SocketAddr,
    ) -> Result<Served, BridgeError> {
        let mut framed = Framed::new(stream, LinesCodec::new_with_max_length(MAX_REQUEST_LEN));

        loop {
            let line = match tokio::time::timeout(self.poll, framed.next()).await {
                Err(_) => {
                    if self.stop_requested() {
                        return Ok(Served::Stopped);
                    }
                    continue;
                }
                Ok(None) => return Ok(Served::Continue),
                Ok(Some(Err(e))) => {
                    warn!(peer = %peer, error = %e, "bridge connection error");
                    return Ok(Served::Continue);
                }
                Ok(Some(Ok(line))) => line,
            };

            let msg: DeliveryMessage = match serde_json::from_str(&line) {
                Ok(msg) => msg,
                Err(e) => {
                    warn!(peer = %peer, error = %e, "malformed delivery request, dropping connection");
                    return Ok(Served::Continue);
                }
            };

            if let Err(e) = framed.send(ACK).await {
                warn!(peer = %peer, error = %e, "failed to ack request");
                return Ok(Served::Continue);
            }
            debug!(kind = ?msg.kind, "delivery accepted");
            self.queue.send(msg).map_err(|_| BridgeError::QueueClosed)?;
        }
    }
}
