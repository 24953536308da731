//! Extended query protocol messages.

use crate::error::{Error, Result};
use crate::protocol::codec::MessageBuilder;
use crate::protocol::types::Oid;

/// Write a Parse message to create a prepared statement.
///
/// - `name`: Statement name (empty string for unnamed statement)
/// - `query`: SQL query with $1, $2, ... placeholders
/// - `param_oids`: Parameter type OIDs (empty = let server infer all)
///
/// Fails with [`Error::InvalidUsage`] if `name` or `query` contains a NUL
/// byte or there are more type OIDs than the count field can hold.
pub fn write_parse(
    buf: &mut Vec<u8>,
    name: &str,
    query: &str,
    param_oids: &[Oid],
) -> Result<()> {
    let count = i16::try_from(param_oids.len()).map_err(|_e| {
        Error::InvalidUsage(format!("too many parameter types: {}", param_oids.len()))
    })?;

    let mut msg = MessageBuilder::new(buf, super::msg_type::PARSE);
    msg.write_cstr(name)?;
    msg.write_cstr(query)?;
    msg.write_i16(count);
    for &oid in param_oids {
        msg.write_i32(oid as i32);
    }
    msg.finish()
}

/// Write a Sync message.
///
/// Ends an extended query sequence; the server answers everything sent so
/// far and then sends ReadyForQuery.
pub fn write_sync(buf: &mut Vec<u8>) -> Result<()> {
    MessageBuilder::new(buf, super::msg_type::SYNC).finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::backend::RawMessage;
    use crate::protocol::frontend::FrontendMessage;

    #[test]
    fn test_parse_layout() {
        let mut buf = Vec::new();
        write_parse(&mut buf, "stmt1", "SELECT 1", &[]).unwrap();

        assert_eq!(buf[0], b'P');
        let len = i32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]);
        assert_eq!(len as usize, buf.len() - 1);
        assert_eq!(&buf[5..], b"stmt1\0SELECT 1\0\0\0");
    }

    #[test]
    fn test_parse_with_type_hints() {
        let mut buf = Vec::new();
        write_parse(&mut buf, "", "SELECT $1", &[23]).unwrap();

        let decoded = FrontendMessage::parse(RawMessage::new(buf[0], &buf[5..])).unwrap();
        assert_eq!(
            decoded,
            FrontendMessage::Parse {
                name: String::new(),
                query: "SELECT $1".into(),
                param_oids: vec![23],
            }
        );
    }

    #[test]
    fn test_sync() {
        let mut buf = Vec::new();
        write_sync(&mut buf).unwrap();

        assert_eq!(buf.len(), 5);
        assert_eq!(buf[0], b'S');
        assert_eq!(&buf[1..5], &4_i32.to_be_bytes());
    }

    #[test]
    fn test_parse_rejects_nul_in_name_or_query() {
        let mut buf = Vec::new();
        assert!(matches!(
            write_parse(&mut buf, "a\0b", "SELECT 1", &[]),
            Err(Error::InvalidUsage(_))
        ));
        assert!(matches!(
            write_parse(&mut buf, "stmt", "SELECT 1\0", &[]),
            Err(Error::InvalidUsage(_))
        ));
    }

    #[test]
    fn test_parse_rejects_too_many_param_types() {
        let mut buf = Vec::new();
        let oids = vec![23; 40_000];
        let err = write_parse(&mut buf, "", "SELECT 1", &oids).unwrap_err();
        assert_eq!(err.to_string(), "Invalid usage: too many parameter types: 40000");
        assert!(buf.is_empty());

        write_parse(&mut buf, "", "SELECT 1", &oids[..32_767]).unwrap();
    }
}
