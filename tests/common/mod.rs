//! In-process fake server speaking the backend side of the protocol.

use tokio::io::{AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};

use zero_pq::protocol::codec::MessageBuilder;
use zero_pq::protocol::{FrameReader, FrontendMessage};
use zero_pq::{Conn, Opts};

pub struct FakeServer {
    frames: FrameReader<ReadHalf<DuplexStream>>,
    writer: WriteHalf<DuplexStream>,
    buf: Vec<u8>,
}

impl FakeServer {
    pub async fn expect_startup(&mut self) -> FrontendMessage {
        let payload = self.frames.read_startup(&mut self.buf).await.unwrap().unwrap();
        FrontendMessage::parse_startup(payload).unwrap()
    }

    pub async fn expect_message(&mut self) -> FrontendMessage {
        let raw = self.frames.read_message(&mut self.buf).await.unwrap().unwrap();
        FrontendMessage::parse(raw).unwrap()
    }

    pub async fn send(&mut self, frames: &[Vec<u8>]) {
        for frame in frames {
            self.writer.write_all(frame).await.unwrap();
        }
        self.writer.flush().await.unwrap();
    }

    /// Answer a startup packet the way a trust-auth server does.
    pub async fn accept_startup(&mut self) {
        self.expect_startup().await;
        self.send(&[
            auth_ok(),
            parameter_status("server_version", "16.0"),
            backend_key(123, 456),
            ready(b'I'),
        ])
        .await;
    }
}

/// Connect a client to a fake server through an in-memory pipe.
///
/// `max_buf_size` bounds each direction of the pipe; small values force
/// frames to be split across many reads.
pub fn pair(max_buf_size: usize, opts: &Opts) -> (Conn<DuplexStream>, FakeServer) {
    let (client, server) = tokio::io::duplex(max_buf_size);
    let (reader, writer) = tokio::io::split(server);
    let server = FakeServer {
        frames: FrameReader::new(reader),
        writer,
        buf: Vec::new(),
    };
    (Conn::new(client, opts), server)
}

fn message(tag: u8, write: impl FnOnce(&mut MessageBuilder<'_>)) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut msg = MessageBuilder::new(&mut buf, tag);
    write(&mut msg);
    msg.finish().unwrap();
    buf
}

pub fn auth_ok() -> Vec<u8> {
    auth_request(0)
}

pub fn auth_request(code: i32) -> Vec<u8> {
    message(b'R', |m| m.write_i32(code))
}

pub fn parameter_status(name: &str, value: &str) -> Vec<u8> {
    message(b'S', |m| {
        m.write_cstr(name).unwrap();
        m.write_cstr(value).unwrap();
    })
}

pub fn backend_key(pid: u32, secret: u32) -> Vec<u8> {
    message(b'K', |m| {
        m.write_i32(pid as i32);
        m.write_i32(secret as i32);
    })
}

pub fn ready(status: u8) -> Vec<u8> {
    message(b'Z', |m| m.write_u8(status))
}

pub fn parse_complete() -> Vec<u8> {
    message(b'1', |_| {})
}

pub fn error_response(code: &str, text: &str) -> Vec<u8> {
    message(b'E', |m| {
        m.write_u8(b'S');
        m.write_cstr("ERROR").unwrap();
        m.write_u8(b'C');
        m.write_cstr(code).unwrap();
        m.write_u8(b'M');
        m.write_cstr(text).unwrap();
        m.write_u8(0);
    })
}
