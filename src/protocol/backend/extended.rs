//! Extended query protocol backend messages.

use crate::error::Result;
use crate::protocol::codec::expect_end;

/// ParseComplete message - statement parsing completed.
#[derive(Debug, Clone, Copy)]
pub struct ParseComplete;

impl ParseComplete {
    /// Parse a ParseComplete message from payload bytes.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        expect_end(payload, "ParseComplete")?;
        Ok(Self)
    }
}
