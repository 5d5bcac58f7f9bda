//! One-shot client used by sender mode.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec};
use tracing::debug;

use super::{ACK, MAX_REQUEST_LEN};
use crate::delivery::DeliveryMessage;
use crate::error::BridgeError;

/// Send one request to the local bridge and wait up to `wait` for the ack.
pub async fn send(port: u16, msg: &DeliveryMessage, wait: Duration) -> Result<(), BridgeError> {
    send_to(SocketAddr::from((Ipv4Addr::LOCALHOST, port)), msg, wait).await
}

/// Send one request to the bridge at `addr`.
pub async fn send_to(
    addr: SocketAddr,
    msg: &DeliveryMessage,
    wait: Duration,
) -> Result<(), BridgeError> {
    let payload = serde_json::to_string(msg)?;

    let exchange = async {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| BridgeError::Connect {
                port: addr.port(),
                source,
            })?;
        let mut framed = Framed::new(stream, LinesCodec::new_with_max_length(MAX_REQUEST_LEN));
        framed.send(payload.as_str()).await?;
        match framed.next().await {
            Some(Ok(reply)) if reply.trim() == ACK => Ok(()),
            Some(Ok(reply)) => Err(BridgeError::UnexpectedReply(reply)),
            Some(Err(e)) => Err(e.into()),
            None => Err(BridgeError::NoReply),
        }
    };

    let result = tokio::time::timeout(wait, exchange).await;
    match result {
        Ok(outcome) => {
            if outcome.is_ok() {
                debug!(addr = %addr, "request acked");
            }
            outcome
        }
        Err(_) => Err(BridgeError::Timeout(wait)),
    }
}
