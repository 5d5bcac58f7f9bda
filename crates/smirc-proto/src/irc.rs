//! IRC message codec for tokio.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::error::{self, is_illegal_control_char};
use crate::line::LineCodec;
use crate::message::Message;

/// Tokio codec for encoding/decoding IRC messages.
///
/// Wraps [`LineCodec`] and parses lines into [`Message`] types.
pub struct IrcCodec {
    inner: LineCodec,
}

impl IrcCodec {
    /// Create a new codec with a custom max line length.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            inner: LineCodec::with_max_len(max_len),
        }
    }

    /// Sanitize outgoing message data.
    ///
    /// - Truncates at first line ending
    /// - Rejects illegal control characters
    pub fn sanitize(mut data: String) -> error::Result<String> {
        if let Some((pos, len)) = ["\r\n", "\r", "\n"]
            .iter()
            .flat_map(|needle| data.find(needle).map(|pos| (pos, needle.len())))
            .min_by_key(|&(pos, _)| pos)
        {
            data.truncate(pos + len);
        }

        let body = data.trim_end_matches(&['\r', '\n'][..]);
        if let Some(ch) = body.chars().find(|ch| is_illegal_control_char(*ch)) {
            return Err(error::ProtocolError::IllegalControlChar(ch));
        }

        Ok(data)
    }
}

impl Decoder for IrcCodec {
    type Item = Message;
    type Error = error::ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<Message>> {
        // A bad line is already consumed from `src`; an `Err` here would end the stream.
        loop {
            match self.inner.decode(src) {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => match line.parse::<Message>() {
                    Ok(msg) => return Ok(Some(msg)),
                    Err(e) => warn!(error = %e, "skipping unparseable line"),
                },
                Ok(None) => return Ok(None),
                Err(error::ProtocolError::IllegalControlChar(ch)) => {
                    warn!(char = ?ch, "skipping line with illegal control character");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Encoder<Message> for IrcCodec {
    type Error = error::ProtocolError;

    fn encode(&mut self, msg: Message, dst: &mut BytesMut) -> error::Result<()> {
        let sanitized = Self::sanitize(msg.to_string())?;
        self.inner.encode(sanitized, dst)
    }
}
