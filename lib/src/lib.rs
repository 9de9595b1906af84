//! Client for the Varnish Cache administrative socket (VASC).
//!
//! A [`Connection`] wraps a TCP or Unix stream, authenticates against the
//! greeting challenge when the instance asks for it, and then executes one
//! command at a time:
//!
//! ```no_run
//! # async fn run() -> Result<(), vasc::Error> {
//! use std::time::Duration;
//!
//! use vasc::{Config, Connection, Network};
//!
//! let config = Config::new()
//!     .with_secret_file("/etc/varnish/secret")?
//!     .with_read_timeout(Duration::from_secs(2))
//!     .with_write_timeout(Duration::from_secs(2));
//! let conn = Connection::dial(Network::Tcp, "127.0.0.1:6082", config).await?;
//!
//! let mut body = Vec::new();
//! let code = conn.execute(&mut body, "help", &["\"banner\""]).await?;
//! assert_eq!(code, vasc::status::OK);
//!
//! conn.close().await
//! # }
//! ```

mod auth;
mod commands;
mod config;
mod connection;
mod error;
mod framing;
mod handshake;
mod json;
pub mod scope;
pub mod status;

pub use auth::{CHALLENGE_LEN, REPLY_LEN, solve as solve_challenge};
pub use commands::{Backend, Pids};
pub use config::Config;
pub use connection::{Connection, DEFAULT_DIAL_TIMEOUT, Network, ParseNetworkError, Stream};
pub use error::{
    Error, is_cannot, is_closed, is_comms, is_connection_closed, is_handshake_challenge_too_short,
    is_handshake_failed, is_invalid_json_response, is_invalid_response_header, is_param,
    is_poisoned, is_syntax, is_too_few, is_too_many, is_truncated, is_unexpected_handshake_status,
    is_unexpected_status, is_unimplemented, is_unknown,
};
pub use framing::{HEADER_LEN, MAX_BODY_LEN, encode_header, encode_request, parse_header};
pub use json::{Envelope, parse_json_response};
