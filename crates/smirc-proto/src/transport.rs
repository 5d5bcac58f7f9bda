//! Framed IRC transport over plain TCP or client-side TLS.
//!
//! - [`Transport::tcp`]: plain TCP connections
//! - [`Transport::client_tls`]: TLS connections to servers on e.g. port 6697
//!
//! Establishing the TLS session is left to the caller; the transport only
//! frames an already connected stream.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream as ClientTlsStream;
use tokio_util::codec::Framed;
use tracing::warn;

use crate::error::ProtocolError;
use crate::irc::IrcCodec;
use crate::message::Message;

/// Maximum IRC line length accepted from the server (8191 bytes as per modern
/// IRC conventions, which leaves room for IRCv3 tags).
pub const MAX_IRC_LINE_LEN: usize = 8191;

/// Errors that can occur when reading from a transport.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportReadError {
    /// An I/O error occurred.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A protocol error occurred.
    #[error("transport protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// IRC transport over the supported stream types.
#[allow(clippy::large_enum_variant)]
#[non_exhaustive]
pub enum Transport {
    /// Plain TCP transport.
    Tcp {
        /// The framed codec for TCP.
        framed: Framed<TcpStream, IrcCodec>,
    },
    /// Client-side TLS-encrypted transport.
    ClientTls {
        /// The framed codec for client-side TLS.
        framed: Framed<ClientTlsStream<TcpStream>, IrcCodec>,
    },
}

impl Transport {
    /// Create a new TCP transport from a connected stream.
    pub fn tcp(stream: TcpStream) -> Self {
        if let Err(e) = enable_keepalive(&stream) {
            warn!("failed to enable TCP keepalive: {}", e);
        }

        Self::Tcp {
            framed: Framed::new(stream, IrcCodec::with_max_len(MAX_IRC_LINE_LEN)),
        }
    }

    /// Create a new client-side TLS transport from an established TLS stream.
    pub fn client_tls(stream: ClientTlsStream<TcpStream>) -> Self {
        if let Err(e) = enable_keepalive(stream.get_ref().0) {
            warn!("failed to enable TCP keepalive: {}", e);
        }

        Self::ClientTls {
            framed: Framed::new(stream, IrcCodec::with_max_len(MAX_IRC_LINE_LEN)),
        }
    }

    /// Check if this transport uses TLS encryption.
    pub fn is_tls(&self) -> bool {
        matches!(self, Self::ClientTls { .. })
    }

    /// Read the next IRC message from the transport.
    ///
    /// Returns `Ok(None)` when the connection is closed. Cancel safe: a read
    /// abandoned by a timeout loses no buffered bytes.
    pub async fn read_message(&mut self) -> Result<Option<Message>, TransportReadError> {
        macro_rules! read_framed {
            ($framed:expr) => {
                match $framed.next().await {
                    Some(Ok(msg)) => Ok(Some(msg)),
                    Some(Err(e)) => Err(TransportReadError::from(e)),
                    None => Ok(None),
                }
            };
        }

        match self {
            Transport::Tcp { framed } => read_framed!(framed),
            Transport::ClientTls { framed } => read_framed!(framed),
        }
    }

    /// Write an IRC message to the transport and flush it.
    pub async fn write_message(&mut self, message: &Message) -> Result<(), ProtocolError> {
        match self {
            Transport::Tcp { framed } => framed.send(message.clone()).await,
            Transport::ClientTls { framed } => framed.send(message.clone()).await,
        }
    }
}

fn enable_keepalive(stream: &TcpStream) -> std::io::Result<()> {
    use socket2::{SockRef, TcpKeepalive};

    let sock = SockRef::from(stream);
    let keepalive = TcpKeepalive::new()
        .with_time(Duration::from_secs(120))
        .with_interval(Duration::from_secs(30));

    sock.set_tcp_keepalive(&keepalive)
}
