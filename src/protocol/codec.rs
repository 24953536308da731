//! Wire encoding and decoding primitives.
//!
//! All integers are big-endian (network byte order). Readers take a slice and
//! return the decoded value together with the unread remainder, so a message
//! parser threads the remainder through and finishes with [`expect_end`].

use zerocopy::FromBytes;
use zerocopy::byteorder::big_endian::{I16 as I16BE, I32 as I32BE};

use crate::error::{Error, Result};

/// Size of the length prefix of every frame.
pub const LENGTH_SIZE: usize = 4;

/// Read 1-byte unsigned integer.
#[inline]
pub fn read_u8(data: &[u8]) -> Result<(u8, &[u8])> {
    match data.split_first() {
        Some((&byte, rest)) => Ok((byte, rest)),
        None => Err(Error::Protocol("read_u8: empty buffer".into())),
    }
}

/// Read 2-byte big-endian signed integer.
#[inline]
pub fn read_i16(data: &[u8]) -> Result<(i16, &[u8])> {
    let (value, rest) = I16BE::read_from_prefix(data).map_err(|_e| {
        Error::Protocol(format!("read_i16: buffer too short: {} < 2", data.len()))
    })?;
    Ok((value.get(), rest))
}

/// Read 4-byte big-endian signed integer.
#[inline]
pub fn read_i32(data: &[u8]) -> Result<(i32, &[u8])> {
    let (value, rest) = I32BE::read_from_prefix(data).map_err(|_e| {
        Error::Protocol(format!("read_i32: buffer too short: {} < 4", data.len()))
    })?;
    Ok((value.get(), rest))
}

/// Read null-terminated string bytes (without the terminator).
#[inline]
pub fn read_cstring(data: &[u8]) -> Result<(&[u8], &[u8])> {
    match memchr::memchr(0, data) {
        Some(pos) => Ok((&data[..pos], &data[pos + 1..])),
        None => Err(Error::Protocol(
            "read_cstring: no null terminator found".into(),
        )),
    }
}

/// Read null-terminated string as &str.
#[inline]
pub fn read_cstr(data: &[u8]) -> Result<(&str, &[u8])> {
    let (bytes, rest) = read_cstring(data)?;
    let s = simdutf8::compat::from_utf8(bytes)
        .map_err(|e| Error::Protocol(format!("read_cstr: invalid UTF-8: {e}")))?;
    Ok((s, rest))
}

/// Require that a message payload was consumed completely.
#[inline]
pub fn expect_end(rest: &[u8], message: &str) -> Result<()> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(Error::Protocol(format!(
            "{message}: {} trailing bytes",
            rest.len()
        )))
    }
}

/// Write 1-byte unsigned integer.
#[inline]
pub fn write_u8(out: &mut Vec<u8>, value: u8) {
    out.push(value);
}

/// Write 2-byte big-endian signed integer.
#[inline]
pub fn write_i16(out: &mut Vec<u8>, value: i16) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Write 4-byte big-endian signed integer.
#[inline]
pub fn write_i32(out: &mut Vec<u8>, value: i32) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Write null-terminated string from &str.
///
/// A NUL inside `s` would end the string early on the wire, so it is rejected
/// with [`Error::InvalidUsage`] and nothing is written.
#[inline]
pub fn write_cstr(out: &mut Vec<u8>, s: &str) -> Result<()> {
    if let Some(pos) = memchr::memchr(0, s.as_bytes()) {
        return Err(Error::InvalidUsage(format!(
            "string contains a NUL byte at offset {pos}"
        )));
    }
    out.extend_from_slice(s.as_bytes());
    out.push(0);
    Ok(())
}

/// Message builder that back-fills the length field.
///
/// On error the buffer is left holding a partial message; callers discard it.
///
/// Frame layout:
/// - Type byte (1 byte, absent for startup) - NOT included in length
/// - Length (4 bytes) - includes itself
/// - Payload (Length - 4 bytes)
pub struct MessageBuilder<'a> {
    buf: &'a mut Vec<u8>,
    start: usize,
}

impl<'a> MessageBuilder<'a> {
    /// Start building a message with a type byte.
    pub fn new(buf: &'a mut Vec<u8>, type_byte: u8) -> Self {
        buf.push(type_byte);
        Self::new_startup(buf)
    }

    /// Start building a startup message (no type byte).
    pub fn new_startup(buf: &'a mut Vec<u8>) -> Self {
        let start = buf.len();
        buf.extend_from_slice(&[0; LENGTH_SIZE]);
        Self { buf, start }
    }

    /// Write a u8.
    pub fn write_u8(&mut self, value: u8) {
        write_u8(self.buf, value);
    }

    /// Write an i16.
    pub fn write_i16(&mut self, value: i16) {
        write_i16(self.buf, value);
    }

    /// Write an i32.
    pub fn write_i32(&mut self, value: i32) {
        write_i32(self.buf, value);
    }

    /// Write null-terminated string.
    pub fn write_cstr(&mut self, s: &str) -> Result<()> {
        write_cstr(self.buf, s)
    }

    /// Finish building the message and fill in the length field.
    ///
    /// Fails if the message does not fit the 32-bit length field.
    pub fn finish(self) -> Result<()> {
        let written = self.buf.len() - self.start;
        let len = i32::try_from(written)
            .map_err(|_e| Error::InvalidUsage(format!("message too large: {written} bytes")))?;
        self.buf[self.start..self.start + LENGTH_SIZE].copy_from_slice(&len.to_be_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readers_return_remainder() {
        let data = [0x00, 0x01, 0x00, 0x00, 0x00, 0x7b, b'h', b'i', 0, 0xff];
        let (a, rest) = read_i16(&data).unwrap();
        let (b, rest) = read_i32(rest).unwrap();
        let (s, rest) = read_cstr(rest).unwrap();
        let (c, rest) = read_u8(rest).unwrap();
        assert_eq!((a, b, s, c), (1, 123, "hi", 0xff));
        assert!(expect_end(rest, "test").is_ok());
    }

    #[test]
    fn short_reads_fail() {
        assert!(read_i32(&[0, 0, 1]).is_err());
        assert!(read_i16(&[0]).is_err());
        assert!(read_u8(&[]).is_err());
        assert!(read_cstr(b"no terminator").is_err());
        assert!(read_cstr(&[0xc3, 0x28, 0]).is_err());
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let err = expect_end(&[1, 2], "ParseComplete").unwrap_err();
        assert_eq!(err.to_string(), "Protocol error: ParseComplete: 2 trailing bytes");
    }

    #[test]
    fn builder_counts_length_from_length_field() {
        let mut buf = Vec::new();
        let mut msg = MessageBuilder::new(&mut buf, b'Q');
        msg.write_cstr("SELECT 1").unwrap();
        msg.finish().unwrap();
        assert_eq!(buf[0], b'Q');
        assert_eq!(&buf[1..5], &13_i32.to_be_bytes());
        assert_eq!(&buf[5..], b"SELECT 1\0");
    }

    #[test]
    fn interior_nul_is_rejected() {
        let mut buf = Vec::new();
        let err = write_cstr(&mut buf, "a\0b").unwrap_err();
        assert!(matches!(err, Error::InvalidUsage(_)));
        assert_eq!(err.to_string(), "Invalid usage: string contains a NUL byte at offset 1");
        assert!(buf.is_empty());

        write_cstr(&mut buf, "").unwrap();
        assert_eq!(buf, [0]);
    }
}
