//! Error types for zero-pq.

use thiserror::Error;

/// Result type for zero-pq operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Fields of an ErrorResponse sent by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorFields {
    /// Severity: ERROR, FATAL, PANIC (localized)
    pub severity: Option<String>,
    /// Non-localized severity
    pub severity_non_localized: Option<String>,
    /// SQLSTATE error code (5 characters)
    pub code: Option<String>,
    /// Primary human-readable message
    pub message: Option<String>,
    /// Detailed error explanation
    pub detail: Option<String>,
    /// Suggestion for fixing the error
    pub hint: Option<String>,
    /// Cursor position in query string (1-based)
    pub position: Option<u32>,
    /// Position in internal query
    pub internal_position: Option<u32>,
    /// Failed internal command text
    pub internal_query: Option<String>,
    /// Context/stack trace
    pub where_: Option<String>,
    /// Schema name
    pub schema: Option<String>,
    /// Table name
    pub table: Option<String>,
    /// Column name
    pub column: Option<String>,
    /// Data type name
    pub data_type: Option<String>,
    /// Constraint name
    pub constraint: Option<String>,
    /// Source file name
    pub file: Option<String>,
    /// Source line number
    pub line: Option<u32>,
    /// Source routine name
    pub routine: Option<String>,
}

impl ErrorFields {
    /// The primary message, or an empty string if the server sent none.
    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or_default()
    }
}

impl std::fmt::Display for ErrorFields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(severity) = &self.severity {
            write!(f, "{}: ", severity)?;
        }
        f.write_str(self.message())?;
        if let Some(code) = &self.code {
            write!(f, " (SQLSTATE {})", code)?;
        }
        if let Some(detail) = &self.detail {
            write!(f, "\nDETAIL: {}", detail)?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\nHINT: {}", hint)?;
        }
        Ok(())
    }
}

/// Protocol phase an unexpected message arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Startup negotiation
    Startup,
    /// Parse/Sync exchange
    Prepare,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Startup => f.write_str("startup"),
            Phase::Prepare => f.write_str("prepare"),
        }
    }
}

/// Error type for zero-pq.
#[derive(Debug, Error)]
pub enum Error {
    /// Server error response
    #[error("PostgreSQL error: {0}")]
    Server(Box<ErrorFields>),

    /// Framing or decode error (malformed frame, unknown tag, bad payload)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A well-formed message arrived in a phase that does not expect it
    #[error("unknown startup response ('{}') during {phase}", tag_char(.tag))]
    Unexpected {
        /// Phase the message arrived in
        phase: Phase,
        /// Message type byte
        tag: u8,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Server stream ended while a reply was expected
    #[error("Connection closed by server")]
    ConnectionClosed,

    /// Connection is broken and cannot be reused
    #[error("Connection is broken")]
    ConnectionBroken,

    /// Invalid usage (bad options, malformed URL)
    #[error("Invalid usage: {0}")]
    InvalidUsage(String),

    /// Unsupported feature
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl Error {
    /// Returns true if the error indicates the connection is broken and cannot be reused.
    ///
    /// Startup and prepare exchanges abort on any failure, so only usage
    /// errors leave the connection intact.
    pub fn is_connection_broken(&self) -> bool {
        !matches!(self, Error::InvalidUsage(_))
    }

    /// Get the SQLSTATE code if this is a server error.
    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            Error::Server(fields) => fields.code.as_deref(),
            _ => None,
        }
    }

    /// Get the server-reported message if this is a server error.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Error::Server(fields) => fields.message.as_deref(),
            _ => None,
        }
    }
}

fn tag_char(tag: &u8) -> char {
    char::from(*tag)
}

impl<Src: std::fmt::Debug, Dst: std::fmt::Debug + ?Sized>
    From<zerocopy::error::CastError<Src, Dst>> for Error
{
    fn from(err: zerocopy::error::CastError<Src, Dst>) -> Self {
        Error::Protocol(format!("zerocopy cast error: {err:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_display_keeps_message() {
        let err = Error::Server(Box::new(ErrorFields {
            severity: Some("ERROR".into()),
            code: Some("42601".into()),
            message: Some("syntax error".into()),
            ..Default::default()
        }));
        assert_eq!(
            err.to_string(),
            "PostgreSQL error: ERROR: syntax error (SQLSTATE 42601)"
        );
        assert_eq!(err.sqlstate(), Some("42601"));
        assert_eq!(err.server_message(), Some("syntax error"));
    }

    #[test]
    fn unexpected_names_phase_and_tag() {
        let err = Error::Unexpected {
            phase: Phase::Prepare,
            tag: b'Z',
        };
        assert_eq!(err.to_string(), "unknown startup response ('Z') during prepare");
        assert!(err.is_connection_broken());
    }

    #[test]
    fn usage_errors_keep_connection() {
        assert!(!Error::InvalidUsage("x".into()).is_connection_broken());
        assert!(Error::ConnectionClosed.is_connection_broken());
    }
}
