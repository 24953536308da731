//! Startup negotiation state machine.

use crate::error::{Error, Phase, Result};
use crate::protocol::backend::BackendMessage;
use crate::protocol::frontend::write_startup_with_version;
use crate::session::Session;

use super::StateMachine;
use super::action::Action;

/// Startup state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupState {
    SendingStartup,
    AwaitingResponse,
    Ready,
    Failed,
}

/// Startup state machine.
///
/// Sends the untagged startup packet and then accepts AuthenticationOk,
/// ParameterStatus and BackendKeyData until ReadyForQuery. There is no bound
/// on how many messages precede ReadyForQuery.
pub struct StartupStateMachine<'s, 'p> {
    state: StartupState,
    session: &'s mut Session,
    protocol_version: i32,
    params: &'p [(&'p str, &'p str)],
}

impl<'s, 'p> StartupStateMachine<'s, 'p> {
    /// Create a startup state machine recording into `session`.
    pub fn new(
        session: &'s mut Session,
        protocol_version: i32,
        params: &'p [(&'p str, &'p str)],
    ) -> Self {
        Self {
            state: StartupState::SendingStartup,
            session,
            protocol_version,
            params,
        }
    }

    /// Get the current state.
    pub fn state(&self) -> StartupState {
        self.state
    }

    fn fail(&mut self, error: Error) -> Result<Action> {
        self.state = StartupState::Failed;
        Err(error)
    }
}

impl StateMachine for StartupStateMachine<'_, '_> {
    fn start(&mut self, buf: &mut Vec<u8>) -> Result<Action> {
        write_startup_with_version(buf, self.protocol_version, self.params)?;
        self.state = StartupState::AwaitingResponse;
        Ok(Action::WriteAndReadMessage)
    }

    fn step(&mut self, msg: BackendMessage) -> Result<Action> {
        if self.state != StartupState::AwaitingResponse {
            return Err(Error::Protocol(format!(
                "Unexpected message in state {:?}",
                self.state
            )));
        }

        match msg {
            BackendMessage::ErrorResponse(fields) => self.fail(Error::Server(fields)),
            BackendMessage::AuthenticationOk => Ok(Action::ReadMessage),
            BackendMessage::ParameterStatus { name, value } => {
                tracing::debug!("parameter {} = {}", name, value);
                self.session.settings.set(name, value);
                Ok(Action::ReadMessage)
            }
            BackendMessage::BackendKeyData { pid, secret } => {
                self.session.pid = pid;
                self.session.secret = secret;
                Ok(Action::ReadMessage)
            }
            BackendMessage::ReadyForQuery(status) => {
                self.session.transaction_status = status;
                self.state = StartupState::Ready;
                Ok(Action::Finished)
            }
            other @ BackendMessage::ParseComplete => self.fail(Error::Unexpected {
                phase: Phase::Startup,
                tag: other.type_byte(),
            }),
        }
    }
}
