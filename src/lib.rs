//! Client core of the PostgreSQL frontend/backend protocol.
//!
//! # Features
//!
//! - **Framing**: length-prefixed frames decoded from any `AsyncRead`, tolerant of split reads
//! - **Background scanning**: a spawned task parses frames and hands them over a bounded channel
//! - **Sans-I/O state machines**: startup negotiation and statement preparation are plain state machines
//!
//! # Example
//!
//! ```no_run
//! use zero_pq::Conn;
//!
//! # async fn run() -> zero_pq::Result<()> {
//! let mut conn = Conn::connect("postgres://postgres@localhost/postgres").await?;
//! println!("server_version = {}", conn.settings().value("server_version"));
//!
//! let stmt = conn.parse("stmt1", "SELECT $1::int").await?;
//! println!("prepared {}", stmt.name);
//!
//! conn.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod conn;
pub mod error;
pub mod opts;
pub mod protocol;
pub mod scanner;
pub mod session;
pub mod settings;
pub mod state;

pub use conn::Conn;
pub use error::{Error, ErrorFields, Phase, Result};
pub use opts::Opts;
pub use protocol::types::{Oid, TransactionStatus};
pub use settings::Settings;
pub use state::PreparedStatement;
