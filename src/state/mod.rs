//! Sans-I/O state machines for the startup and prepare exchanges.
//!
//! A state machine writes its request into a buffer and then consumes parsed
//! messages one at a time. It produces [`Action`] values that tell the driver
//! what to do next; it never touches the transport itself.

pub mod action;
pub mod prepare;
pub mod startup;

pub use action::Action;
pub use prepare::{PrepareState, PrepareStateMachine, PreparedStatement};
pub use startup::{StartupState, StartupStateMachine};

use crate::error::Result;
use crate::protocol::backend::BackendMessage;

/// A request/response exchange driven by [`crate::Conn`].
pub trait StateMachine {
    /// Encode the request into `buf` and return the first action.
    ///
    /// An error here means nothing was sent.
    fn start(&mut self, buf: &mut Vec<u8>) -> Result<Action>;

    /// Consume one message from the server.
    fn step(&mut self, msg: BackendMessage) -> Result<Action>;
}
