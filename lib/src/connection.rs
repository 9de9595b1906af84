use std::{
    error::Error as StdError, fmt, future::Future, io, mem, str::FromStr, time::Duration,
};

use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
    sync::{Mutex, OnceCell, watch},
    time::{Instant, timeout, timeout_at},
};
use tracing::{debug, info, warn};
use zeroize::{Zeroize, Zeroizing};

use crate::{
    Config, Error,
    framing::{HEADER_LEN, encode_request, parse_header, read_full},
    handshake::handshake,
    status,
};

/// Connect timeout used by [`Connection::dial`].
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(30);

/// Byte streams a [`Connection`] can run on.
pub trait Stream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> Stream for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    Tcp,
    #[cfg(unix)]
    Unix,
}

impl Network {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Network::Tcp => "tcp",
            #[cfg(unix)]
            Network::Unix => "unix",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseNetworkError(String);

impl fmt::Display for ParseNetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported network '{}'", self.0)
    }
}

impl StdError for ParseNetworkError {}

impl FromStr for Network {
    type Err = ParseNetworkError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "tcp" | "tcp4" | "tcp6" => Ok(Network::Tcp),
            #[cfg(unix)]
            "unix" => Ok(Network::Unix),
            other => Err(ParseNetworkError(other.to_owned())),
        }
    }
}

/// A client connection to a Varnish administrative socket.
///
/// All methods take `&self`; share a connection between tasks through an
/// `Arc`. Requests are serialized: a request is only written once the
/// previous response has been read in full.
pub struct Connection {
    transport: Mutex<Transport>,
    shutdown: watch::Sender<bool>,
    close_result: OnceCell<Result<(), (io::ErrorKind, String)>>,
}

impl Connection {
    /// Runs the handshake on an already connected stream.
    ///
    /// On failure the stream is dropped, which closes it.
    ///
    /// # Errors
    ///
    /// Returns the transport, framing or handshake error that aborted the
    /// handshake.
    pub async fn wrap<S>(stream: S, config: Config) -> Result<Self, Error>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (shutdown, closing) = watch::channel(false);
        let mut transport = Transport {
            stream: Some(Box::new(stream)),
            config,
            inbound: Vec::new(),
            outbound: Zeroizing::new(Vec::new()),
            header: [0u8; HEADER_LEN],
            closing,
            poisoned: false,
        };
        handshake(&mut transport).await?;

        Ok(Self {
            transport: Mutex::new(transport),
            shutdown,
            close_result: OnceCell::new(),
        })
    }

    /// Shorthand for [`Connection::dial_timeout`] with
    /// [`DEFAULT_DIAL_TIMEOUT`].
    ///
    /// # Errors
    ///
    /// See [`Connection::dial_timeout`].
    pub async fn dial(network: Network, address: &str, config: Config) -> Result<Self, Error> {
        Self::dial_timeout(network, address, config, DEFAULT_DIAL_TIMEOUT).await
    }

    /// Connects to `address` within `connect_timeout` (zero waits forever)
    /// and runs the handshake.
    ///
    /// # Errors
    ///
    /// Returns connect failures as [`Error::Io`] and otherwise whatever
    /// [`Connection::wrap`] returns.
    pub async fn dial_timeout(
        network: Network,
        address: &str,
        config: Config,
        connect_timeout: Duration,
    ) -> Result<Self, Error> {
        debug!("dialing {} {}", network, address);
        match network {
            Network::Tcp => {
                let stream = connect(connect_timeout, TcpStream::connect(address)).await?;
                stream.set_nodelay(true)?;
                Self::wrap(stream, config).await
            }
            #[cfg(unix)]
            Network::Unix => {
                let stream =
                    connect(connect_timeout, tokio::net::UnixStream::connect(address)).await?;
                Self::wrap(stream, config).await
            }
        }
    }

    /// Executes `command` with `args`, appends the response body to `dst` and
    /// returns the status code.
    ///
    /// Arguments are sent verbatim, separated by single spaces.
    ///
    /// # Errors
    ///
    /// Non-200 codes map onto the status variants of [`Error`]; the body is
    /// appended to `dst` regardless and the raw code is available through
    /// [`Error::status_code`]. Transport and framing errors poison the
    /// connection.
    pub async fn execute<A: AsRef<str>>(
        &self,
        dst: &mut Vec<u8>,
        command: &str,
        args: &[A],
    ) -> Result<u16, Error> {
        let mut transport = self.transport.lock().await;
        let (code, size) = transport.roundtrip(command, args).await?;
        debug!("{} returned status {} ({} bytes)", command, code, size);

        dst.extend_from_slice(&transport.inbound);
        status::check(code, size)?;
        Ok(code)
    }

    /// Like [`Connection::execute`], collecting the body into a fresh buffer.
    ///
    /// # Errors
    ///
    /// See [`Connection::execute`].
    pub async fn request<A: AsRef<str>>(&self, command: &str, args: &[A]) -> Result<Vec<u8>, Error> {
        let mut body = Vec::new();
        self.execute(&mut body, command, args).await?;
        Ok(body)
    }

    /// Closes the connection. Only the first call touches the stream; every
    /// call returns its outcome. A request blocked on I/O is woken up and
    /// fails with [`Error::ConnectionClosed`].
    ///
    /// # Errors
    ///
    /// Returns the error from shutting the stream down.
    pub async fn close(&self) -> Result<(), Error> {
        let outcome = self
            .close_result
            .get_or_init(|| async {
                self.shutdown.send_replace(true);

                let mut transport = self.transport.lock().await;
                let result = match transport.stream.take() {
                    Some(mut stream) => stream.shutdown().await,
                    None => Ok(()),
                };
                transport.inbound.clear();
                info!("connection closed");
                result.map_err(|err| (err.kind(), err.to_string()))
            })
            .await;

        outcome
            .clone()
            .map_err(|(kind, message)| Error::Io(io::Error::new(kind, message)))
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.shutdown.borrow()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// The state guarded by the connection mutex.
pub(crate) struct Transport {
    stream: Option<Box<dyn Stream>>,
    pub(crate) config: Config,
    pub(crate) inbound: Vec<u8>,
    pub(crate) outbound: Zeroizing<Vec<u8>>,
    header: [u8; HEADER_LEN],
    closing: watch::Receiver<bool>,
    poisoned: bool,
}

impl Transport {
    async fn roundtrip<A: AsRef<str>>(
        &mut self,
        command: &str,
        args: &[A],
    ) -> Result<(u16, usize), Error> {
        if *self.closing.borrow() || self.stream.is_none() {
            return Err(Error::ConnectionClosed);
        }
        if self.poisoned {
            return Err(Error::Poisoned);
        }

        debug!("executing {}", command);
        self.outbound.zeroize();
        encode_request(&mut self.outbound, command, args);

        // Stays set if this future is dropped between the write and the end
        // of the response.
        self.poisoned = true;
        let result = match self.flush().await {
            Ok(()) => self.read_response().await,
            Err(err) => Err(err),
        };

        match &result {
            Err(err) if err.poisons() => warn!("connection poisoned by {}: {}", command, err),
            _ => self.poisoned = false,
        }
        result
    }

    /// Writes the outbound buffer under the write deadline. The buffer is
    /// moved out first and zeroed when the write ends, including when this
    /// future is dropped mid-write.
    pub(crate) async fn flush(&mut self) -> Result<(), Error> {
        let Transport {
            stream,
            config,
            outbound,
            closing,
            ..
        } = self;

        let pending = mem::take(outbound);
        let Some(stream) = stream.as_mut() else {
            return Err(Error::ConnectionClosed);
        };

        deadline(closing, config.write_timeout(), "write", async {
            stream.write_all(pending.as_slice()).await?;
            stream.flush().await
        })
        .await
    }

    /// Reads one response frame into the inbound buffer and returns its
    /// status code and body length.
    pub(crate) async fn read_response(&mut self) -> Result<(u16, usize), Error> {
        let Transport {
            stream,
            config,
            inbound,
            header,
            closing,
            ..
        } = self;

        inbound.clear();
        let Some(stream) = stream.as_mut() else {
            return Err(Error::ConnectionClosed);
        };

        let read = deadline(
            closing,
            config.read_timeout(),
            "read",
            read_full(stream, &mut header[..]),
        )
        .await?;
        if read < HEADER_LEN {
            return Err(Error::InvalidResponseHeader(header[..read].to_vec()));
        }

        let (code, size) = parse_header(header)?;
        inbound.resize(size, 0);
        deadline(
            closing,
            config.read_timeout(),
            "read",
            stream.read_exact(&mut inbound[..]),
        )
        .await?;

        Ok((code, size))
    }
}

/// Runs `op` with an absolute deadline of `now + limit` (none when `limit` is
/// zero), aborting early once the connection starts closing.
async fn deadline<T, F>(
    closing: &mut watch::Receiver<bool>,
    limit: Duration,
    name: &'static str,
    op: F,
) -> Result<T, Error>
where
    F: Future<Output = io::Result<T>>,
{
    let armed = async {
        if limit.is_zero() {
            return op.await;
        }
        timeout_at(Instant::now() + limit, op)
            .await
            .unwrap_or_else(|_| {
                Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("{} deadline of {:?} exceeded", name, limit),
                ))
            })
    };

    tokio::select! {
        result = armed => result.map_err(Error::Io),
        _ = closing.wait_for(|closed| *closed) => Err(Error::ConnectionClosed),
    }
}

async fn connect<T>(
    limit: Duration,
    connecting: impl Future<Output = io::Result<T>>,
) -> io::Result<T> {
    if limit.is_zero() {
        return connecting.await;
    }
    timeout(limit, connecting).await.unwrap_or_else(|_| {
        Err(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("connect timed out after {:?}", limit),
        ))
    })
}
