//! Startup-phase backend messages.

use zerocopy::byteorder::big_endian::U32 as U32BE;
use zerocopy::{FromBytes, Immutable, KnownLayout};

use crate::error::{Error, Result};
use crate::protocol::codec::{expect_end, read_cstr, read_i32};
use crate::protocol::types::TransactionStatus;

/// Authentication request codes.
pub mod auth_type {
    pub const OK: i32 = 0;
}

/// AuthenticationOk - the only authentication request this client accepts.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticationOk;

impl AuthenticationOk {
    /// Parse an Authentication message, accepting only code 0.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let (code, rest) = read_i32(payload)?;
        if code != auth_type::OK {
            return Err(Error::Unsupported(format!(
                "unknown authentication type ({code})"
            )));
        }
        expect_end(rest, "AuthenticationOk")?;
        Ok(Self)
    }
}

/// BackendKeyData message - contains process ID and secret key for cancellation.
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
#[repr(C, packed)]
pub struct BackendKeyData {
    /// Process ID of the backend
    pub pid: U32BE,
    /// Secret key for cancellation
    pub secret_key: U32BE,
}

impl BackendKeyData {
    /// Parse a BackendKeyData message from payload bytes.
    pub fn parse(payload: &[u8]) -> Result<&Self> {
        Ok(Self::ref_from_bytes(payload)?)
    }

    /// Get the process ID.
    pub fn process_id(&self) -> u32 {
        self.pid.get()
    }

    /// Get the secret key.
    pub fn secret(&self) -> u32 {
        self.secret_key.get()
    }
}

/// ParameterStatus message - server parameter name and value.
#[derive(Debug, Clone)]
pub struct ParameterStatus<'a> {
    /// Parameter name
    pub name: &'a str,
    /// Parameter value
    pub value: &'a str,
}

impl<'a> ParameterStatus<'a> {
    /// Parse a ParameterStatus message from payload bytes.
    pub fn parse(payload: &'a [u8]) -> Result<Self> {
        let (name, rest) = read_cstr(payload)?;
        let (value, rest) = read_cstr(rest)?;
        expect_end(rest, "ParameterStatus")?;
        Ok(Self { name, value })
    }
}

/// ReadyForQuery message - indicates server is ready for a new query.
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
#[repr(C, packed)]
pub struct ReadyForQuery {
    /// Transaction status byte
    pub status: u8,
}

impl ReadyForQuery {
    /// Parse a ReadyForQuery message from payload bytes.
    pub fn parse(payload: &[u8]) -> Result<&Self> {
        Ok(Self::ref_from_bytes(payload)?)
    }

    /// Get the transaction status.
    pub fn transaction_status(&self) -> Result<TransactionStatus> {
        let status = self.status;
        TransactionStatus::from_byte(status).ok_or_else(|| {
            Error::Protocol(format!(
                "ReadyForQuery: unknown transaction status '{}'",
                char::from(status)
            ))
        })
    }
}
