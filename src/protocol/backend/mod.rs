//! Backend (server → client) messages.

pub mod auth;
pub mod error;
pub mod extended;

pub use auth::{AuthenticationOk, BackendKeyData, ParameterStatus, ReadyForQuery};
pub use error::ErrorResponse;
pub use extended::ParseComplete;

use crate::error::{Error, ErrorFields, Result};
use crate::protocol::types::TransactionStatus;

/// Backend message type bytes.
pub mod msg_type {
    /// Authentication request
    pub const AUTHENTICATION: u8 = b'R';
    /// BackendKeyData
    pub const BACKEND_KEY_DATA: u8 = b'K';
    /// ParameterStatus
    pub const PARAMETER_STATUS: u8 = b'S';
    /// ReadyForQuery
    pub const READY_FOR_QUERY: u8 = b'Z';
    /// ErrorResponse
    pub const ERROR_RESPONSE: u8 = b'E';
    /// ParseComplete
    pub const PARSE_COMPLETE: u8 = b'1';
}

/// Raw message from the server.
///
/// This is a thin wrapper around the message type byte and payload, borrowed
/// from the frame reader's buffer.
#[derive(Debug, Clone, Copy)]
pub struct RawMessage<'a> {
    /// Message type byte
    pub type_byte: u8,
    /// Message payload (after length field)
    pub payload: &'a [u8],
}

impl<'a> RawMessage<'a> {
    /// Create a new RawMessage.
    pub fn new(type_byte: u8, payload: &'a [u8]) -> Self {
        Self { type_byte, payload }
    }
}

/// A fully parsed backend message.
///
/// Owned, so it can leave the read buffer and cross the scanner channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendMessage {
    /// `E`: the server rejected the current request
    ErrorResponse(Box<ErrorFields>),
    /// `R` with code 0: authentication succeeded
    AuthenticationOk,
    /// `S`: runtime parameter report
    ParameterStatus {
        /// Parameter name
        name: String,
        /// Parameter value
        value: String,
    },
    /// `K`: cancellation key for this session
    BackendKeyData {
        /// Backend process id
        pid: u32,
        /// Secret key
        secret: u32,
    },
    /// `Z`: the server is ready for the next request
    ReadyForQuery(TransactionStatus),
    /// `1`: Parse succeeded
    ParseComplete,
}

impl BackendMessage {
    /// Parse a raw message by its type byte.
    pub fn parse(raw: RawMessage<'_>) -> Result<Self> {
        let payload = raw.payload;
        match raw.type_byte {
            msg_type::ERROR_RESPONSE => {
                Ok(BackendMessage::ErrorResponse(Box::new(
                    ErrorResponse::parse(payload)?.fields,
                )))
            }
            msg_type::AUTHENTICATION => {
                AuthenticationOk::parse(payload)?;
                Ok(BackendMessage::AuthenticationOk)
            }
            msg_type::PARAMETER_STATUS => {
                let status = ParameterStatus::parse(payload)?;
                Ok(BackendMessage::ParameterStatus {
                    name: status.name.to_string(),
                    value: status.value.to_string(),
                })
            }
            msg_type::BACKEND_KEY_DATA => {
                let key = BackendKeyData::parse(payload)?;
                Ok(BackendMessage::BackendKeyData {
                    pid: key.process_id(),
                    secret: key.secret(),
                })
            }
            msg_type::READY_FOR_QUERY => {
                let ready = ReadyForQuery::parse(payload)?;
                Ok(BackendMessage::ReadyForQuery(ready.transaction_status()?))
            }
            msg_type::PARSE_COMPLETE => {
                ParseComplete::parse(payload)?;
                Ok(BackendMessage::ParseComplete)
            }
            other => Err(Error::Protocol(format!(
                "unknown message type: '{}'",
                char::from(other)
            ))),
        }
    }

    /// Type byte this message was framed under.
    pub fn type_byte(&self) -> u8 {
        match self {
            BackendMessage::ErrorResponse(_) => msg_type::ERROR_RESPONSE,
            BackendMessage::AuthenticationOk => msg_type::AUTHENTICATION,
            BackendMessage::ParameterStatus { .. } => msg_type::PARAMETER_STATUS,
            BackendMessage::BackendKeyData { .. } => msg_type::BACKEND_KEY_DATA,
            BackendMessage::ReadyForQuery(_) => msg_type::READY_FOR_QUERY,
            BackendMessage::ParseComplete => msg_type::PARSE_COMPLETE,
        }
    }
}
