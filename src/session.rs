//! Per-connection session state reported by the server.

use crate::protocol::types::TransactionStatus;
use crate::settings::Settings;

/// What the server told us about this session.
///
/// Created once per physical connection and updated by the startup and
/// prepare exchanges.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Runtime parameters from ParameterStatus messages
    pub settings: Settings,
    /// Backend process id from BackendKeyData
    pub pid: u32,
    /// Cancellation secret from BackendKeyData
    pub secret: u32,
    /// Transaction status from the last ReadyForQuery
    pub transaction_status: TransactionStatus,
}
