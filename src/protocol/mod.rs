//! PostgreSQL wire protocol implementation.
//!
//! # Structure
//!
//! - `codec`: Low-level encoding/decoding primitives
//! - `frame`: Frame decoding over an async byte stream
//! - `backend`: Server → Client messages (parsing)
//! - `frontend`: Client → Server messages (encoding)
//! - `types`: Common protocol types (Oid, TransactionStatus)

pub mod backend;
pub mod codec;
pub mod frame;
pub mod frontend;
pub mod types;

pub use backend::{BackendMessage, RawMessage};
pub use frame::FrameReader;
pub use frontend::FrontendMessage;
pub use types::{Oid, TransactionStatus};
