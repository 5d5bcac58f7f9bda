//! Line-based codec for tokio.
//!
//! Reads and writes newline-terminated lines with a length limit. Inbound
//! bytes that are not UTF-8 are replaced rather than rejected.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{self, is_illegal_control_char};

/// Line-based codec that handles newline-terminated messages.
pub struct LineCodec {
    /// Index of next byte to check for newline
    next_index: usize,
    /// Maximum line length
    max_len: usize,
}

impl LineCodec {
    /// Create a codec limited to `max_len` bytes per line.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
        }
    }

    fn validate_line(s: &str) -> error::Result<()> {
        let trimmed = s.trim_end_matches(&['\r', '\n'][..]);
        match trimmed.chars().find(|ch| is_illegal_control_char(*ch)) {
            Some(ch) => Err(error::ProtocolError::IllegalControlChar(ch)),
            None => Ok(()),
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::with_max_len(512)
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = error::ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<String>> {
        if let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') {
            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if line.len() > self.max_len {
                return Err(error::ProtocolError::MessageTooLong {
                    actual: line.len(),
                    limit: self.max_len,
                });
            }

            let data = String::from_utf8_lossy(&line).into_owned();

            Self::validate_line(&data)?;

            Ok(Some(data))
        } else {
            // No complete line yet - remember where we stopped
            self.next_index = src.len();

            if src.len() > self.max_len {
                return Err(error::ProtocolError::MessageTooLong {
                    actual: src.len(),
                    limit: self.max_len,
                });
            }

            Ok(None)
        }
    }
}

impl Encoder<String> for LineCodec {
    type Error = error::ProtocolError;

    fn encode(&mut self, msg: String, dst: &mut BytesMut) -> error::Result<()> {
        dst.extend(msg.into_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_complete_line() {
        let mut codec = LineCodec::default();
        let mut buf = BytesMut::from("PING :test\r\n");

        let result = codec.decode(&mut buf).unwrap();
        assert_eq!(result, Some("PING :test\r\n".to_string()));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_partial_line() {
        let mut codec = LineCodec::default();
        let mut buf = BytesMut::from("PING :");

        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"test\r\n");
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some("PING :test\r\n".to_string())
        );
    }

    #[test]
    fn test_decode_too_long() {
        let mut codec = LineCodec::with_max_len(10);
        let mut buf = BytesMut::from("this is way too long\n");

        let result = codec.decode(&mut buf);
        assert!(matches!(
            result,
            Err(error::ProtocolError::MessageTooLong { .. })
        ));
    }

    #[test]
    fn test_decode_latin1_is_replaced() {
        let mut codec = LineCodec::default();
        let mut buf = BytesMut::from(&b"PRIVMSG #ops :caf\xe9\r\n"[..]);
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some("PRIVMSG #ops :caf\u{FFFD}\r\n".to_string())
        );
    }

    #[test]
    fn test_decode_stray_cr_consumes_line() {
        let mut codec = LineCodec::default();
        let mut buf = BytesMut::from("PING a\rb\r\nPING :next\r\n");
        assert!(matches!(
            codec.decode(&mut buf),
            Err(error::ProtocolError::IllegalControlChar('\r'))
        ));
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some("PING :next\r\n".to_string())
        );
    }
}
