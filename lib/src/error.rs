use std::{error::Error as StdError, fmt, io};

use crate::framing::HEADER_LEN;

/// Every failure a [`Connection`](crate::Connection) can surface.
///
/// Status variants map one to one onto the codes in [`status`](crate::status);
/// the remaining variants cover transport, framing, handshake and envelope
/// failures.
#[derive(Debug)]
pub enum Error {
    /// Transport failure, including expired deadlines (`TimedOut`) and short
    /// body reads (`UnexpectedEof`).
    Io(io::Error),
    /// The connection was closed locally.
    ConnectionClosed,
    /// An earlier I/O or framing error left the stream in an undefined state.
    Poisoned,
    /// The 13-byte response header was malformed; carries the bytes received.
    InvalidResponseHeader(Vec<u8>),
    /// The server rejected the authentication reply.
    HandshakeFailed,
    /// The authentication challenge was shorter than 32 bytes.
    HandshakeChallengeTooShort(usize),
    /// The server answered the handshake with an unexpected status code.
    UnexpectedHandshakeStatus(u16),
    Syntax,
    Unknown,
    Unimplemented,
    TooFew,
    TooMany,
    Param,
    Auth,
    /// The response was truncated to the given number of bytes.
    Truncated(usize),
    Cannot,
    Comms,
    /// The server is closing the connection.
    Closed,
    UnexpectedStatus(u16),
    InvalidJsonResponse(serde_json::Error),
}

impl Error {
    /// The raw status code behind a status error, if any.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        use crate::status;

        let code = match self {
            Error::Syntax => status::SYNTAX,
            Error::Unknown => status::UNKNOWN,
            Error::Unimplemented => status::UNIMPLEMENTED,
            Error::TooFew => status::TOO_FEW,
            Error::TooMany => status::TOO_MANY,
            Error::Param => status::PARAM,
            Error::Auth => status::AUTH,
            Error::Truncated(_) => status::TRUNCATED,
            Error::Cannot => status::CANT,
            Error::Comms => status::COMMS,
            Error::Closed => status::CLOSE,
            Error::UnexpectedStatus(code) | Error::UnexpectedHandshakeStatus(code) => *code,
            _ => return None,
        };
        Some(code)
    }

    #[must_use]
    pub const fn truncated_size(&self) -> Option<usize> {
        match self {
            Error::Truncated(size) => Some(*size),
            _ => None,
        }
    }

    #[must_use]
    pub fn raw_header(&self) -> Option<&[u8]> {
        match self {
            Error::InvalidResponseHeader(raw) => Some(raw),
            _ => None,
        }
    }

    /// Whether the stream can no longer be trusted after this error.
    pub(crate) const fn poisons(&self) -> bool {
        matches!(self, Error::Io(_) | Error::InvalidResponseHeader(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::ConnectionClosed => f.write_str("connection closed"),
            Error::Poisoned => {
                f.write_str("connection unusable after an earlier transport error")
            }
            Error::InvalidResponseHeader(raw) => write!(
                f,
                "invalid response header {:?} ({} of {} bytes)",
                String::from_utf8_lossy(raw),
                raw.len(),
                HEADER_LEN
            ),
            Error::HandshakeFailed => f.write_str("handshake failed"),
            Error::HandshakeChallengeTooShort(len) => {
                write!(f, "handshake challenge too short (len: {})", len)
            }
            Error::UnexpectedHandshakeStatus(code) => {
                write!(f, "unexpected handshake status code {}", code)
            }
            Error::Syntax => f.write_str("syntax error"),
            Error::Unknown => f.write_str("unknown command"),
            Error::Unimplemented => f.write_str("unimplemented command"),
            Error::TooFew => f.write_str("too few arguments"),
            Error::TooMany => f.write_str("too many arguments"),
            Error::Param => f.write_str("parameter error"),
            Error::Auth => f.write_str("authentication required"),
            Error::Truncated(size) => write!(f, "response truncated after {} bytes", size),
            Error::Cannot => f.write_str("cannot comply"),
            Error::Comms => f.write_str("communication error"),
            Error::Closed => f.write_str("remote is closing the connection"),
            Error::UnexpectedStatus(code) => write!(f, "unexpected status code {}", code),
            Error::InvalidJsonResponse(err) => write!(f, "invalid JSON response: {}", err),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::InvalidJsonResponse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        Error::Io(value)
    }
}

fn chain_contains(err: &(dyn StdError + 'static), matches: impl Fn(&Error) -> bool) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if err.downcast_ref::<Error>().is_some_and(&matches) {
            return true;
        }
        current = err.source();
    }
    false
}

macro_rules! predicates {
    ($($(#[$meta:meta])* $name:ident => $pattern:pat,)+) => {
        $(
            $(#[$meta])*
            #[must_use]
            pub fn $name(err: &(dyn StdError + 'static)) -> bool {
                chain_contains(err, |err| matches!(err, $pattern))
            }
        )+
    };
}

predicates! {
    /// Reports whether err's chain contains a syntax error (100).
    is_syntax => Error::Syntax,
    /// Reports whether err's chain contains an unknown command error (101).
    is_unknown => Error::Unknown,
    /// Reports whether err's chain contains an unimplemented command error (102).
    is_unimplemented => Error::Unimplemented,
    /// Reports whether err's chain contains a too-few-arguments error (104).
    is_too_few => Error::TooFew,
    /// Reports whether err's chain contains a too-many-arguments error (105).
    is_too_many => Error::TooMany,
    /// Reports whether err's chain contains a parameter error (106).
    is_param => Error::Param,
    /// Reports whether err's chain contains a truncated response (201).
    is_truncated => Error::Truncated(_),
    /// Reports whether err's chain contains a cannot-comply error (300).
    is_cannot => Error::Cannot,
    /// Reports whether err's chain contains a communication error (400).
    is_comms => Error::Comms,
    /// Reports whether err's chain contains a remote close (500).
    is_closed => Error::Closed,
    /// Reports whether err's chain contains a status code outside the known set.
    is_unexpected_status => Error::UnexpectedStatus(_),
    /// Reports whether err's chain contains a rejected authentication reply.
    is_handshake_failed => Error::HandshakeFailed,
    /// Reports whether err's chain contains a too short authentication challenge.
    is_handshake_challenge_too_short => Error::HandshakeChallengeTooShort(_),
    /// Reports whether err's chain contains an unexpected handshake status code.
    is_unexpected_handshake_status => Error::UnexpectedHandshakeStatus(_),
    /// Reports whether err's chain contains a malformed response header.
    is_invalid_response_header => Error::InvalidResponseHeader(_),
    /// Reports whether err's chain contains a malformed JSON envelope.
    is_invalid_json_response => Error::InvalidJsonResponse(_),
    /// Reports whether err's chain contains a locally closed connection.
    is_connection_closed => Error::ConnectionClosed,
    /// Reports whether err's chain contains a poisoned connection.
    is_poisoned => Error::Poisoned,
}
