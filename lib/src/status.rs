//! Varnish CLI response status codes.

use crate::Error;

pub const SYNTAX: u16 = 100;
pub const UNKNOWN: u16 = 101;
pub const UNIMPLEMENTED: u16 = 102;
pub const TOO_FEW: u16 = 104;
pub const TOO_MANY: u16 = 105;
pub const PARAM: u16 = 106;
pub const AUTH: u16 = 107;
pub const OK: u16 = 200;
/// The body was truncated by the server.
pub const TRUNCATED: u16 = 201;
pub const CANT: u16 = 300;
pub const COMMS: u16 = 400;
pub const CLOSE: u16 = 500;

/// Maps a response status code onto the error taxonomy. `size` is the body
/// length and only matters for truncated responses.
///
/// # Errors
///
/// Returns the status error for every code other than [`OK`].
pub fn check(code: u16, size: usize) -> Result<(), Error> {
    let err = match code {
        OK => return Ok(()),
        SYNTAX => Error::Syntax,
        UNKNOWN => Error::Unknown,
        UNIMPLEMENTED => Error::Unimplemented,
        TOO_FEW => Error::TooFew,
        TOO_MANY => Error::TooMany,
        PARAM => Error::Param,
        AUTH => Error::Auth,
        TRUNCATED => Error::Truncated(size),
        CANT => Error::Cannot,
        COMMS => Error::Comms,
        CLOSE => Error::Closed,
        other => Error::UnexpectedStatus(other),
    };
    Err(err)
}
