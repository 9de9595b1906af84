use tracing::debug;
use zeroize::Zeroize;

use crate::{
    Error,
    auth::{self, CHALLENGE_LEN, REPLY_LEN},
    connection::Transport,
    status,
};

const AUTH_PREFIX: &[u8] = b"auth ";

/// Consumes the greeting and, when challenged, authenticates with the
/// configured secret.
pub(crate) async fn handshake(transport: &mut Transport) -> Result<(), Error> {
    let (code, size) = transport.read_response().await?;
    debug!("greeting status {} ({} bytes)", code, size);
    match code {
        status::OK => return Ok(()),
        status::AUTH => {}
        other => return Err(Error::UnexpectedHandshakeStatus(other)),
    }

    let Some(challenge) = transport.inbound.first_chunk::<CHALLENGE_LEN>() else {
        return Err(Error::HandshakeChallengeTooShort(size));
    };

    let mut reply = [0u8; REPLY_LEN];
    auth::solve(&mut reply, transport.config.secret(), challenge);

    let out = &mut transport.outbound;
    out.clear();
    out.reserve(AUTH_PREFIX.len() + REPLY_LEN + 1);
    out.extend_from_slice(AUTH_PREFIX);
    out.extend_from_slice(&reply);
    out.push(b'\n');
    reply.zeroize();
    transport.flush().await?;

    let (code, _) = transport.read_response().await?;
    debug!("authentication status {}", code);
    match code {
        status::OK => Ok(()),
        status::CLOSE => Err(Error::HandshakeFailed),
        other => Err(Error::UnexpectedHandshakeStatus(other)),
    }
}
