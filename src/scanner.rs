//! Background frame decoding.
//!
//! A [`Scanner`] owns the read half of the transport. A spawned task reads
//! frames, parses them into [`BackendMessage`]s and pushes them through a
//! bounded channel in arrival order. The last item on the channel is always a
//! [`Termination`]; after it the task exits and never reads again.

use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::protocol::backend::BackendMessage;
use crate::protocol::frame::FrameReader;

/// Why the scanner stopped.
#[derive(Debug)]
pub enum Termination {
    /// The server closed the stream between frames.
    Eof,
    /// Reading or parsing failed; the connection is unusable.
    Failed(Error),
}

impl Termination {
    fn into_error(self) -> Error {
        match self {
            Termination::Eof => Error::ConnectionClosed,
            Termination::Failed(e) => e,
        }
    }
}

#[derive(Debug)]
enum Event {
    Message(BackendMessage),
    Closed(Termination),
}

/// Receiving end of the background decoder.
///
/// Dropping the scanner aborts the background task.
pub struct Scanner {
    rx: mpsc::Receiver<Event>,
    task: JoinHandle<()>,
    terminated: bool,
}

impl Scanner {
    /// Spawn the decoder task on the current Tokio runtime.
    ///
    /// `capacity` bounds how many parsed messages may wait for the consumer;
    /// the task stops reading the socket while the queue is full.
    pub fn spawn<R>(reader: R, capacity: usize, max_message_len: usize) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let frames = FrameReader::with_max_message_len(reader, max_message_len);
        let task = tokio::spawn(run(frames, tx));
        Self {
            rx,
            task,
            terminated: false,
        }
    }

    /// Wait for the next message.
    ///
    /// The terminal error is returned exactly once; later calls fail with
    /// [`Error::ConnectionBroken`].
    pub async fn recv(&mut self) -> Result<BackendMessage> {
        if self.terminated {
            return Err(Error::ConnectionBroken);
        }
        match self.rx.recv().await {
            Some(Event::Message(msg)) => Ok(msg),
            Some(Event::Closed(termination)) => {
                self.terminated = true;
                Err(termination.into_error())
            }
            None => {
                self.terminated = true;
                Err(Error::ConnectionBroken)
            }
        }
    }

    /// Returns true once the terminal state has been delivered.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }
}

impl Drop for Scanner {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run<R: AsyncRead + Unpin>(mut frames: FrameReader<R>, tx: mpsc::Sender<Event>) {
    let mut buf = Vec::new();
    let termination = loop {
        let raw = match frames.read_message(&mut buf).await {
            Ok(Some(raw)) => raw,
            Ok(None) => break Termination::Eof,
            Err(e) => break Termination::Failed(e),
        };
        tracing::trace!(
            type_byte = %char::from(raw.type_byte),
            len = raw.payload.len(),
            "received frame"
        );
        let msg = match BackendMessage::parse(raw) {
            Ok(msg) => msg,
            Err(e) => break Termination::Failed(e),
        };
        if tx.send(Event::Message(msg)).await.is_err() {
            // Consumer is gone
            return;
        }
    };

    if let Termination::Failed(e) = &termination {
        tracing::warn!("scanner stopped: {}", e);
    }
    if tx.send(Event::Closed(termination)).await.is_err() {
        tracing::trace!("scanner terminated after consumer dropped");
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;
    use crate::protocol::frame::DEFAULT_MAX_MESSAGE_LEN;
    use crate::protocol::types::TransactionStatus;

    fn frame(tag: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = vec![tag];
        out.extend_from_slice(&(payload.len() as i32 + 4).to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[tokio::test]
    async fn delivers_in_order_then_eof_once() {
        let mut bytes = frame(b'R', &[0, 0, 0, 0]);
        bytes.extend(frame(b'Z', b"I"));
        let mut scanner = Scanner::spawn(std::io::Cursor::new(bytes), 1, DEFAULT_MAX_MESSAGE_LEN);

        assert_eq!(scanner.recv().await.unwrap(), BackendMessage::AuthenticationOk);
        assert_eq!(
            scanner.recv().await.unwrap(),
            BackendMessage::ReadyForQuery(TransactionStatus::Idle)
        );
        assert!(matches!(scanner.recv().await, Err(Error::ConnectionClosed)));
        assert!(scanner.is_terminated());
        assert!(matches!(scanner.recv().await, Err(Error::ConnectionBroken)));
    }

    #[tokio::test]
    async fn stops_at_first_parse_failure() {
        let mut bytes = frame(b'1', b"");
        bytes.extend(frame(b'?', b""));
        bytes.extend(frame(b'1', b""));
        let mut scanner = Scanner::spawn(std::io::Cursor::new(bytes), 8, DEFAULT_MAX_MESSAGE_LEN);

        assert_eq!(scanner.recv().await.unwrap(), BackendMessage::ParseComplete);
        let err = scanner.recv().await.unwrap_err();
        assert_eq!(err.to_string(), "Protocol error: unknown message type: '?'");
        assert!(matches!(scanner.recv().await, Err(Error::ConnectionBroken)));
    }

    #[tokio::test]
    async fn waits_for_bytes_written_later() {
        let (mut server, client) = tokio::io::duplex(64);
        let mut scanner = Scanner::spawn(client, 4, DEFAULT_MAX_MESSAGE_LEN);

        let pending = tokio::spawn(async move {
            let msg = scanner.recv().await;
            (scanner, msg)
        });
        server.write_all(&frame(b'1', b"")).await.unwrap();

        let (_scanner, msg) = pending.await.unwrap();
        assert_eq!(msg.unwrap(), BackendMessage::ParseComplete);
    }

    #[tokio::test]
    async fn dropping_scanner_releases_the_stream() {
        let (mut server, client) = tokio::io::duplex(64);
        let scanner = Scanner::spawn(client, 4, DEFAULT_MAX_MESSAGE_LEN);
        drop(scanner);

        // The aborted task drops its half of the pipe, which reads as EOF here.
        let mut byte = [0_u8; 1];
        assert_eq!(server.read(&mut byte).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn single_slot_queue_keeps_order() {
        let mut bytes = Vec::new();
        for i in 0..16 {
            bytes.extend(frame(b'S', format!("param_{i}\0{i}\0").as_bytes()));
        }
        let mut scanner = Scanner::spawn(std::io::Cursor::new(bytes), 1, DEFAULT_MAX_MESSAGE_LEN);

        for i in 0..16 {
            assert_eq!(
                scanner.recv().await.unwrap(),
                BackendMessage::ParameterStatus {
                    name: format!("param_{i}"),
                    value: i.to_string(),
                }
            );
        }
        assert!(matches!(scanner.recv().await, Err(Error::ConnectionClosed)));
    }

    #[tokio::test]
    async fn full_queue_stops_reading_the_stream() {
        let (mut server, client) = tokio::io::duplex(64);
        let mut scanner = Scanner::spawn(client, 1, DEFAULT_MAX_MESSAGE_LEN);

        // 1000 bytes: far more than the queue, the read buffer and the pipe hold.
        let writer = tokio::spawn(async move {
            for _ in 0..200 {
                server.write_all(&frame(b'1', b"")).await.unwrap();
            }
            server
        });
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
        assert!(!writer.is_finished());

        for _ in 0..200 {
            assert_eq!(scanner.recv().await.unwrap(), BackendMessage::ParseComplete);
        }
        let _server = writer.await.unwrap();
    }
}
