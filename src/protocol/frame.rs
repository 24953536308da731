//! Frame decoding over an async byte stream.
//!
//! A frame is an optional type byte, a 4-byte big-endian length that counts
//! itself, and `length - 4` payload bytes. Only the client's startup packet
//! is sent without a type byte.

use tokio::io::{AsyncRead, AsyncReadExt, BufReader};

use crate::error::{Error, Result};
use crate::protocol::backend::RawMessage;
use crate::protocol::codec::LENGTH_SIZE;

/// Default upper bound on a declared frame length.
pub const DEFAULT_MAX_MESSAGE_LEN: usize = 1 << 30;

/// Reads frames from a byte stream into a reusable payload buffer.
///
/// Partial reads are accumulated until the whole frame is available, and the
/// reader never consumes bytes past the end of the current frame.
pub struct FrameReader<R> {
    reader: BufReader<R>,
    max_message_len: usize,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Wrap a byte stream.
    pub fn new(reader: R) -> Self {
        Self::with_max_message_len(reader, DEFAULT_MAX_MESSAGE_LEN)
    }

    /// Wrap a byte stream, rejecting frames longer than `max_message_len`.
    pub fn with_max_message_len(reader: R, max_message_len: usize) -> Self {
        Self {
            reader: BufReader::new(reader),
            max_message_len,
        }
    }

    /// Read one tagged frame.
    ///
    /// Returns `Ok(None)` when the stream ends cleanly between frames. An end
    /// of stream inside a frame is a protocol error.
    pub async fn read_message<'b>(
        &mut self,
        payload: &'b mut Vec<u8>,
    ) -> Result<Option<RawMessage<'b>>> {
        let mut type_byte = [0u8; 1];
        if self.reader.read(&mut type_byte).await? == 0 {
            return Ok(None);
        }
        self.read_body(payload).await?;
        Ok(Some(RawMessage::new(type_byte[0], payload)))
    }

    /// Read one untagged startup frame, returning its payload.
    ///
    /// Returns `Ok(None)` when the stream ends before the frame starts.
    pub async fn read_startup<'b>(&mut self, payload: &'b mut Vec<u8>) -> Result<Option<&'b [u8]>> {
        let mut first = [0u8; 1];
        if self.reader.read(&mut first).await? == 0 {
            return Ok(None);
        }
        let mut rest = [0u8; LENGTH_SIZE - 1];
        self.read_exact(&mut rest).await?;
        let len = i32::from_be_bytes([first[0], rest[0], rest[1], rest[2]]);
        self.read_payload(len, payload).await?;
        Ok(Some(payload.as_slice()))
    }

    async fn read_body(&mut self, payload: &mut Vec<u8>) -> Result<()> {
        let mut len = [0u8; LENGTH_SIZE];
        self.read_exact(&mut len).await?;
        self.read_payload(i32::from_be_bytes(len), payload).await
    }

    async fn read_payload(&mut self, len: i32, payload: &mut Vec<u8>) -> Result<()> {
        let len = usize::try_from(len)
            .ok()
            .filter(|&len| len >= LENGTH_SIZE)
            .ok_or_else(|| Error::Protocol(format!("invalid message length: {len}")))?;
        if len > self.max_message_len {
            return Err(Error::Protocol(format!(
                "message length {len} exceeds limit {}",
                self.max_message_len
            )));
        }

        payload.clear();
        payload.resize(len - LENGTH_SIZE, 0);
        self.read_exact(payload).await
    }

    async fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        match self.reader.read_exact(buf).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(Error::Protocol(
                "stream closed in the middle of a message".into(),
            )),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncWriteExt;

    use super::*;

    fn frame(tag: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = vec![tag];
        out.extend_from_slice(&(payload.len() as i32 + 4).to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[tokio::test]
    async fn reads_back_to_back_frames() {
        let mut bytes = frame(b'1', b"");
        bytes.extend(frame(b'Z', b"I"));
        let mut reader = FrameReader::new(bytes.as_slice());
        let mut buf = Vec::new();

        let msg = reader.read_message(&mut buf).await.unwrap().unwrap();
        assert_eq!((msg.type_byte, msg.payload), (b'1', &b""[..]));
        let msg = reader.read_message(&mut buf).await.unwrap().unwrap();
        assert_eq!((msg.type_byte, msg.payload), (b'Z', &b"I"[..]));
        assert!(reader.read_message(&mut buf).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn tolerates_split_reads() {
        let bytes = frame(b'S', b"server_version\x0016.0\0");
        let (mut tx, rx) = tokio::io::duplex(2);
        let writer = tokio::spawn(async move {
            for chunk in bytes.chunks(3) {
                tx.write_all(chunk).await.unwrap();
            }
        });

        let mut reader = FrameReader::new(rx);
        let mut buf = Vec::new();
        let msg = reader.read_message(&mut buf).await.unwrap().unwrap();
        assert_eq!(msg.type_byte, b'S');
        assert_eq!(msg.payload, b"server_version\x0016.0\0");
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn eof_inside_frame_is_an_error() {
        let bytes = frame(b'K', &[0, 0, 0, 1, 0, 0]);
        let mut reader = FrameReader::new(&bytes[..bytes.len() - 1]);
        let mut buf = Vec::new();
        let err = reader.read_message(&mut buf).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[tokio::test]
    async fn rejects_short_length() {
        let bytes = [b'Z', 0, 0, 0, 3];
        let mut reader = FrameReader::new(&bytes[..]);
        let mut buf = Vec::new();
        let err = reader.read_message(&mut buf).await.unwrap_err();
        assert_eq!(err.to_string(), "Protocol error: invalid message length: 3");
    }

    #[tokio::test]
    async fn rejects_oversized_length() {
        let bytes = frame(b'S', &[0; 16]);
        let mut reader = FrameReader::with_max_message_len(bytes.as_slice(), 8);
        let mut buf = Vec::new();
        assert!(reader.read_message(&mut buf).await.is_err());
    }

    #[tokio::test]
    async fn reads_untagged_startup_frame() {
        let mut bytes = 8_i32.to_be_bytes().to_vec();
        bytes.extend_from_slice(&196608_i32.to_be_bytes());
        bytes.extend(frame(b'X', b""));
        let mut reader = FrameReader::new(bytes.as_slice());
        let mut buf = Vec::new();

        let payload = reader.read_startup(&mut buf).await.unwrap().unwrap();
        assert_eq!(payload, &196608_i32.to_be_bytes());
        let msg = reader.read_message(&mut buf).await.unwrap().unwrap();
        assert_eq!(msg.type_byte, b'X');
    }
}
