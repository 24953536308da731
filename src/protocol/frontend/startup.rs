//! Startup and termination messages.

use crate::error::Result;
use crate::protocol::codec::MessageBuilder;

/// Protocol version 3.0 (0x00030000)
pub const PROTOCOL_VERSION_3_0: i32 = 196608;

/// Write a StartupMessage for protocol 3.0.
///
/// Parameters is a list of (name, value) pairs, e.g. "user", "database",
/// "application_name".
pub fn write_startup(buf: &mut Vec<u8>, params: &[(&str, &str)]) -> Result<()> {
    write_startup_with_version(buf, PROTOCOL_VERSION_3_0, params)
}

/// Write a StartupMessage with a specific protocol version.
///
/// Fails if a parameter name or value contains a NUL byte.
pub fn write_startup_with_version(
    buf: &mut Vec<u8>,
    version: i32,
    params: &[(&str, &str)],
) -> Result<()> {
    let mut msg = MessageBuilder::new_startup(buf);
    msg.write_i32(version);

    for (name, value) in params {
        msg.write_cstr(name)?;
        msg.write_cstr(value)?;
    }

    // Terminator
    msg.write_u8(0);
    msg.finish()
}

/// Write a Terminate message.
///
/// Sent to cleanly close the connection.
pub fn write_terminate(buf: &mut Vec<u8>) -> Result<()> {
    MessageBuilder::new(buf, super::msg_type::TERMINATE).finish()
}
