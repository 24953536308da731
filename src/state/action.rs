//! Action types for state machine I/O requests.

/// Action requested by a state machine.
///
/// The caller should perform the requested I/O and then feed the next
/// message to the state machine's `step()` method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Write the write buffer to the server and flush, then read a message.
    WriteAndReadMessage,

    /// Read the next message from the server.
    ReadMessage,

    /// The exchange is complete.
    Finished,
}
