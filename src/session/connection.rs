//! Chat connection abstraction and its IRC implementation.

use std::sync::Arc;

use async_trait::async_trait;
use smirc_proto::{Command, Message, Transport};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tracing::{debug, info, warn};

use crate::config::Context;
use crate::error::SessionError;

/// One established chat session.
#[async_trait]
pub trait ChatConnection: Send {
    /// Write one message.
    async fn send(&mut self, msg: &Message) -> Result<(), SessionError>;

    /// Read the next message; `Ok(None)` once the peer closed the stream.
    ///
    /// Must be cancel safe: the session bounds every read with a timeout.
    async fn recv(&mut self) -> Result<Option<Message>, SessionError>;

    /// Best-effort clean disconnect.
    async fn disconnect(&mut self, reason: &str) -> Result<(), SessionError> {
        self.send(&Message::quit(Some(reason))).await
    }
}

/// Opens chat sessions.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect and send the registration handshake.
    async fn connect(&self, ctx: &Context) -> Result<Box<dyn ChatConnection>, SessionError>;
}

/// IRC over plain TCP or TLS.
#[derive(Debug, Default, Clone, Copy)]
pub struct IrcConnector;

#[async_trait]
impl Connector for IrcConnector {
    async fn connect(&self, ctx: &Context) -> Result<Box<dyn ChatConnection>, SessionError> {
        let stream = TcpStream::connect((ctx.server.as_str(), ctx.port))
            .await
            .map_err(|source| SessionError::Connect {
                server: ctx.server.clone(),
                source,
            })?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!(error = %e, "failed to set TCP_NODELAY");
        }

        let transport = if ctx.tls {
            Transport::client_tls(upgrade_to_tls(stream, &ctx.server).await?)
        } else {
            Transport::tcp(stream)
        };
        info!(server = %ctx.server, port = ctx.port, tls = transport.is_tls(), "connected");

        let mut conn = IrcConnection { transport };
        if let Some(password) = &ctx.password {
            conn.send(&Message::pass(password.as_str())).await?;
        }
        conn.send(&Message::nick(ctx.name.as_str())).await?;
        conn.send(&Message::user(ctx.name.as_str(), ctx.name.as_str())).await?;
        Ok(Box::new(conn))
    }
}

/// Upgrades a TCP stream to TLS, verifying the server against the system roots.
async fn upgrade_to_tls(
    tcp_stream: TcpStream,
    hostname: &str,
) -> Result<tokio_rustls::client::TlsStream<TcpStream>, SessionError> {
    let tls_error = |reason: String| SessionError::Tls {
        server: hostname.to_string(),
        reason,
    };

    let mut roots = RootCertStore::empty();
    let certs = rustls_native_certs::load_native_certs();
    for cert in certs.certs {
        if let Err(e) = roots.add(cert) {
            warn!("Failed to add root cert: {}", e);
        }
    }
    for e in &certs.errors {
        warn!("Error loading native certs: {}", e);
    }

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| tls_error(e.to_string()))?
        .with_root_certificates(roots)
        .with_no_client_auth();
    let connector = TlsConnector::from(Arc::new(config));
    let server_name =
        ServerName::try_from(hostname.to_string()).map_err(|e| tls_error(e.to_string()))?;

    let tls_stream = connector
        .connect(server_name, tcp_stream)
        .await
        .map_err(|e| tls_error(e.to_string()))?;
    info!(hostname = %hostname, "TLS handshake completed");
    Ok(tls_stream)
}

/// An IRC session over a [`Transport`].
pub struct IrcConnection {
    transport: Transport,
}

impl IrcConnection {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl ChatConnection for IrcConnection {
    async fn send(&mut self, msg: &Message) -> Result<(), SessionError> {
        if !matches!(msg.command, Command::PASS(_)) {
            debug!(message = %msg.to_string().trim_end(), "send");
        }
        self.transport.write_message(msg).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<Message>, SessionError> {
        Ok(self.transport.read_message().await?)
    }
}
