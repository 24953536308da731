//! Asynchronous connection driver.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, WriteHalf};
use tokio::net::TcpStream;

use crate::error::{Error, Phase, Result};
use crate::opts::Opts;
use crate::protocol::backend::BackendMessage;
use crate::protocol::frontend::write_terminate;
use crate::protocol::types::TransactionStatus;
use crate::scanner::Scanner;
use crate::session::Session;
use crate::settings::Settings;
use crate::state::{Action, PrepareStateMachine, PreparedStatement, StartupStateMachine, StateMachine};

/// Write half of the transport plus the background reader.
///
/// The driver only writes; the scanner task only reads.
struct Transport<S> {
    writer: WriteHalf<S>,
    scanner: Scanner,
    write_buffer: Vec<u8>,
}

impl<S: AsyncWrite> Transport<S> {
    /// Write the whole buffer, flush, and reset it.
    async fn flush_buffer(&mut self) -> Result<()> {
        self.writer.write_all(&self.write_buffer).await?;
        self.writer.flush().await?;
        self.write_buffer.clear();
        Ok(())
    }

    /// Drive a state machine to completion.
    async fn drive<M: StateMachine>(&mut self, state_machine: &mut M) -> Result<()> {
        self.write_buffer.clear();
        let mut action = state_machine.start(&mut self.write_buffer)?;
        loop {
            match action {
                Action::WriteAndReadMessage => {
                    self.flush_buffer().await?;
                    action = state_machine.step(self.scanner.recv().await?)?;
                }
                Action::ReadMessage => {
                    action = state_machine.step(self.scanner.recv().await?)?;
                }
                Action::Finished => return Ok(()),
            }
        }
    }
}

/// A client connection.
///
/// Generic over any bidirectional byte stream. Construction splits the stream:
/// the read half goes to a background [`Scanner`] task, the write half stays
/// here. Every failed exchange leaves the connection broken.
pub struct Conn<S> {
    transport: Transport<S>,
    session: Session,
    protocol_version: i32,
    started: bool,
    ready_pending: bool,
    is_broken: bool,
}

impl Conn<TcpStream> {
    /// Connect over TCP and run the startup exchange with `opts.startup_params()`.
    pub async fn connect<O: TryInto<Opts>>(opts: O) -> Result<Self>
    where
        Error: From<O::Error>,
    {
        let opts = opts.try_into()?;
        if opts.host.is_empty() {
            return Err(Error::InvalidUsage("host is empty".into()));
        }

        let tcp = TcpStream::connect((opts.host.as_str(), opts.port)).await?;
        tcp.set_nodelay(true)?;

        let mut conn = Self::new(tcp, &opts);
        conn.startup(&opts.startup_params()).await?;
        Ok(conn)
    }
}

impl<S> Conn<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Wrap an already-open stream without sending anything.
    ///
    /// Must be called within a Tokio runtime: the scanner task is spawned here.
    pub fn new(stream: S, opts: &Opts) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        let scanner = Scanner::spawn(reader, opts.channel_capacity, opts.max_message_len);
        Self {
            transport: Transport {
                writer,
                scanner,
                write_buffer: Vec::with_capacity(1024),
            },
            session: Session::default(),
            protocol_version: opts.protocol_version,
            started: false,
            ready_pending: false,
            is_broken: false,
        }
    }

    /// Run the startup exchange.
    ///
    /// Sends the protocol version and `params`, then records ParameterStatus
    /// and BackendKeyData until ReadyForQuery.
    pub async fn startup(&mut self, params: &[(&str, &str)]) -> Result<()> {
        self.check_usable()?;
        if self.started {
            return Err(Error::InvalidUsage("startup already completed".into()));
        }
        let result = self.startup_inner(params).await;
        self.track(&result);
        result?;

        self.started = true;
        tracing::debug!(
            pid = self.session.pid,
            params = self.session.settings.len(),
            "startup complete"
        );
        Ok(())
    }

    async fn startup_inner(&mut self, params: &[(&str, &str)]) -> Result<()> {
        let mut state_machine =
            StartupStateMachine::new(&mut self.session, self.protocol_version, params);
        self.transport.drive(&mut state_machine).await
    }

    /// Prepare a named statement, letting the server infer all parameter types.
    ///
    /// Sends Parse and Sync, then expects ParseComplete. A server error is
    /// returned as [`Error::Server`] with the server's message unchanged.
    pub async fn parse(&mut self, name: &str, query: &str) -> Result<PreparedStatement> {
        self.check_usable()?;
        let result = self.parse_inner(name, query).await;
        self.track(&result);
        result
    }

    async fn parse_inner(&mut self, name: &str, query: &str) -> Result<PreparedStatement> {
        if self.ready_pending {
            self.consume_ready().await?;
        }

        let mut state_machine = PrepareStateMachine::new(name, query);
        self.transport.drive(&mut state_machine).await?;
        let stmt = state_machine
            .prepared_statement()
            .ok_or_else(|| Error::Protocol("No prepared statement".into()))?;

        self.ready_pending = true;
        tracing::debug!("prepared statement {:?}", stmt.name);
        Ok(stmt)
    }

    /// Consume the ReadyForQuery answering the previous Sync.
    async fn consume_ready(&mut self) -> Result<()> {
        match self.transport.scanner.recv().await? {
            BackendMessage::ReadyForQuery(status) => {
                self.session.transaction_status = status;
                self.ready_pending = false;
                Ok(())
            }
            BackendMessage::ErrorResponse(fields) => Err(Error::Server(fields)),
            other => Err(Error::Unexpected {
                phase: Phase::Prepare,
                tag: other.type_byte(),
            }),
        }
    }

    /// Close the connection gracefully.
    ///
    /// Sends Terminate and shuts down the write half. The scanner task is
    /// aborted when the connection is dropped.
    pub async fn close(mut self) -> Result<()> {
        self.transport.write_buffer.clear();
        write_terminate(&mut self.transport.write_buffer)?;
        self.transport.flush_buffer().await?;
        self.transport.writer.shutdown().await?;
        Ok(())
    }

    fn check_usable(&self) -> Result<()> {
        if self.is_broken {
            Err(Error::ConnectionBroken)
        } else {
            Ok(())
        }
    }

    fn track<T>(&mut self, result: &Result<T>) {
        if let Err(e) = result
            && e.is_connection_broken()
        {
            self.is_broken = true;
        }
    }
}

impl<S> Conn<S> {
    /// Server-reported runtime parameters.
    pub fn settings(&self) -> &Settings {
        &self.session.settings
    }

    /// Backend process id (0 before BackendKeyData arrives).
    pub fn pid(&self) -> u32 {
        self.session.pid
    }

    /// Cancellation secret (0 before BackendKeyData arrives).
    pub fn secret(&self) -> u32 {
        self.session.secret
    }

    /// Transaction status from the last ReadyForQuery.
    pub fn transaction_status(&self) -> TransactionStatus {
        self.session.transaction_status
    }

    /// Check if the connection is broken.
    pub fn is_broken(&self) -> bool {
        self.is_broken
    }
}
