//! Challenge/response authentication.
//!
//! The reply to a 107 challenge is the lowercase hex SHA-256 of
//! `challenge || '\n' || secret || challenge || '\n'`.

use sha2::{Digest, Sha256};
use zeroize::Zeroize;

/// Length of the challenge prefix of a 107 response body.
pub const CHALLENGE_LEN: usize = 32;

/// Length of the hex encoded reply.
pub const REPLY_LEN: usize = 2 * CHALLENGE_LEN;

/// Writes the hex solution for `secret` and `challenge` into `dst`.
pub fn solve(dst: &mut [u8; REPLY_LEN], secret: &[u8], challenge: &[u8; CHALLENGE_LEN]) {
    let mut hasher = Sha256::new();
    hasher.update(challenge);
    hasher.update(b"\n");
    hasher.update(secret);
    hasher.update(challenge);
    hasher.update(b"\n");

    let mut digest: [u8; CHALLENGE_LEN] = hasher.finalize().into();
    // Lengths match by construction.
    let _ = hex::encode_to_slice(&digest, dst);
    digest.zeroize();
}
