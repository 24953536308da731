//! Frontend (client → server) messages.
//!
//! Encoders append complete frames to a write buffer. [`FrontendMessage`]
//! decodes them again, which is what an in-process test server needs.

pub mod extended;
pub mod startup;

pub use extended::{write_parse, write_sync};
pub use startup::{write_startup, write_startup_with_version, write_terminate};

use crate::error::{Error, Result};
use crate::protocol::backend::RawMessage;
use crate::protocol::codec::{expect_end, read_cstr, read_i16, read_i32};
use crate::protocol::types::Oid;

/// Frontend message type bytes.
pub mod msg_type {
    /// Parse (extended query protocol)
    pub const PARSE: u8 = b'P';
    /// Sync (extended query protocol)
    pub const SYNC: u8 = b'S';
    /// Terminate
    pub const TERMINATE: u8 = b'X';
}

/// A decoded frontend message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontendMessage {
    /// Untagged startup packet
    Startup {
        /// Requested protocol version
        version: i32,
        /// Session parameters in the order they were sent
        params: Vec<(String, String)>,
    },
    /// `P`: prepare a statement
    Parse {
        /// Statement name (empty for the unnamed statement)
        name: String,
        /// Query text
        query: String,
        /// Explicit parameter types (0 = infer)
        param_oids: Vec<Oid>,
    },
    /// `S`: end of an extended query sequence
    Sync,
    /// `X`: connection shutdown
    Terminate,
}

impl FrontendMessage {
    /// Decode the payload of an untagged startup frame.
    pub fn parse_startup(payload: &[u8]) -> Result<Self> {
        let (version, mut data) = read_i32(payload)?;
        let mut params = Vec::new();
        loop {
            let (name, rest) = read_cstr(data)?;
            if name.is_empty() {
                expect_end(rest, "StartupMessage")?;
                return Ok(FrontendMessage::Startup { version, params });
            }
            let (value, rest) = read_cstr(rest)?;
            params.push((name.to_string(), value.to_string()));
            data = rest;
        }
    }

    /// Decode a tagged frontend message.
    pub fn parse(raw: RawMessage<'_>) -> Result<Self> {
        match raw.type_byte {
            msg_type::PARSE => {
                let (name, rest) = read_cstr(raw.payload)?;
                let (query, rest) = read_cstr(rest)?;
                let (count, mut rest) = read_i16(rest)?;
                let mut param_oids = Vec::with_capacity(usize::try_from(count).unwrap_or(0));
                for _ in 0..count {
                    let (oid, remaining) = read_i32(rest)?;
                    param_oids.push(oid as Oid);
                    rest = remaining;
                }
                expect_end(rest, "Parse")?;
                Ok(FrontendMessage::Parse {
                    name: name.to_string(),
                    query: query.to_string(),
                    param_oids,
                })
            }
            msg_type::SYNC => {
                expect_end(raw.payload, "Sync")?;
                Ok(FrontendMessage::Sync)
            }
            msg_type::TERMINATE => {
                expect_end(raw.payload, "Terminate")?;
                Ok(FrontendMessage::Terminate)
            }
            other => Err(Error::Protocol(format!(
                "unknown frontend message type: '{}'",
                char::from(other)
            ))),
        }
    }
}
