//! Prepare-statement state machine.

use crate::error::{Error, Phase, Result};
use crate::protocol::backend::BackendMessage;
use crate::protocol::frontend::{write_parse, write_sync};

use super::StateMachine;
use super::action::Action;

/// Prepare state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrepareState {
    SendingParse,
    AwaitingParseComplete,
    Done,
    Failed,
}

/// A statement the server has parsed and stored under `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedStatement {
    /// Statement name (empty for the unnamed statement)
    pub name: String,
    /// Query text
    pub query: String,
}

/// Prepare state machine.
///
/// Sends Parse followed by Sync and reads exactly one reply. On success the
/// ReadyForQuery that answers the Sync is still in flight; the driver must
/// consume it before the next exchange.
pub struct PrepareStateMachine<'a> {
    state: PrepareState,
    name: &'a str,
    query: &'a str,
}

impl<'a> PrepareStateMachine<'a> {
    /// Create a prepare state machine; all parameter types are inferred.
    pub fn new(name: &'a str, query: &'a str) -> Self {
        Self {
            state: PrepareState::SendingParse,
            name,
            query,
        }
    }

    /// Get the current state.
    pub fn state(&self) -> PrepareState {
        self.state
    }

    /// The prepared statement, once ParseComplete has arrived.
    pub fn prepared_statement(&self) -> Option<PreparedStatement> {
        (self.state == PrepareState::Done).then(|| PreparedStatement {
            name: self.name.to_string(),
            query: self.query.to_string(),
        })
    }
}

impl StateMachine for PrepareStateMachine<'_> {
    fn start(&mut self, buf: &mut Vec<u8>) -> Result<Action> {
        write_parse(buf, self.name, self.query, &[])?;
        write_sync(buf)?;
        self.state = PrepareState::AwaitingParseComplete;
        Ok(Action::WriteAndReadMessage)
    }

    fn step(&mut self, msg: BackendMessage) -> Result<Action> {
        if self.state != PrepareState::AwaitingParseComplete {
            return Err(Error::Protocol(format!(
                "Unexpected message in state {:?}",
                self.state
            )));
        }

        self.state = PrepareState::Failed;
        match msg {
            BackendMessage::ParseComplete => {
                self.state = PrepareState::Done;
                Ok(Action::Finished)
            }
            BackendMessage::ErrorResponse(fields) => Err(Error::Server(fields)),
            other => Err(Error::Unexpected {
                phase: Phase::Prepare,
                tag: other.type_byte(),
            }),
        }
    }
}
