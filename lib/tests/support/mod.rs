#![allow(dead_code)]

use std::{error::Error, net::SocketAddr};

use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};

pub const BANNER: &str = "-----------------------------\n\
Varnish Cache CLI 1.0\n\
-----------------------------\n\
Linux,5.4.0-84-generic,x86_64,-junix,-smalloc,-sdefault,-hcritbit\n\
varnish-6.6.1 revision e6a8c860944c4f6a7e1af9f40674ea78bbdcdc66\n\
\n\
Type 'help' for command list.\n\
Type 'quit' to close CLI session.\n\
\n";

pub enum Step {
    Send(Vec<u8>),
    Expect(Vec<u8>),
}

pub fn send(bytes: impl AsRef<[u8]>) -> Step {
    Step::Send(bytes.as_ref().to_vec())
}

pub fn expect(bytes: impl AsRef<[u8]>) -> Step {
    Step::Expect(bytes.as_ref().to_vec())
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// A response frame with a canonical header.
pub fn frame(code: u16, body: impl AsRef<[u8]>) -> Vec<u8> {
    let body = body.as_ref();
    let mut out = vasc::encode_header(code, body.len())
        .expect("frame fits the header")
        .to_vec();
    out.extend_from_slice(body);
    out
}

/// A response frame with the left-justified header varnishd writes.
pub fn varnishd_frame(code: u16, body: impl AsRef<[u8]>) -> Vec<u8> {
    let body = body.as_ref();
    let mut out = format!("{:<3} {:<8}\n", code, body.len()).into_bytes();
    out.extend_from_slice(body);
    out
}

/// The 107 greeting varnishd sends for `challenge`.
pub fn challenge_frame(challenge: &[u8; vasc::CHALLENGE_LEN]) -> Vec<u8> {
    let mut body = challenge.to_vec();
    body.extend_from_slice(b"\n\nAuthentication required.\n");
    varnishd_frame(107, body)
}

pub fn auth_line(secret: &[u8], challenge: &[u8; vasc::CHALLENGE_LEN]) -> Vec<u8> {
    let mut reply = [0u8; vasc::REPLY_LEN];
    vasc::solve_challenge(&mut reply, secret, challenge);
    let mut line = b"auth ".to_vec();
    line.extend_from_slice(&reply);
    line.push(b'\n');
    line
}

/// Accepts one connection and plays `steps` against it. The task hands the
/// stream back so the socket stays open until the test drops it.
pub async fn scripted(
    steps: Vec<Step>,
) -> Result<(SocketAddr, JoinHandle<Result<TcpStream, String>>), Box<dyn Error>> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let task = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.map_err(|err| err.to_string())?;
        for step in steps {
            match step {
                Step::Send(bytes) => stream
                    .write_all(&bytes)
                    .await
                    .map_err(|err| err.to_string())?,
                Step::Expect(expected) => {
                    let mut got = vec![0u8; expected.len()];
                    stream
                        .read_exact(&mut got)
                        .await
                        .map_err(|err| err.to_string())?;
                    if got != expected {
                        return Err(format!(
                            "expected {:?}, got {:?}",
                            String::from_utf8_lossy(&expected),
                            String::from_utf8_lossy(&got)
                        ));
                    }
                }
            }
        }
        Ok(stream)
    });
    Ok((addr, task))
}

/// Greets without authentication, then answers every `echo <n>` request with
/// a 200 frame whose body is `<n>`. Resolves to the request lines once the
/// client hangs up; any malformed line fails the task.
pub async fn echo_server()
-> Result<(SocketAddr, JoinHandle<Result<Vec<String>, String>>), Box<dyn Error>> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let task = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.map_err(|err| err.to_string())?;
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);
        writer
            .write_all(&frame(200, BANNER))
            .await
            .map_err(|err| err.to_string())?;

        let mut lines = Vec::new();
        loop {
            let mut line = String::new();
            let n = reader
                .read_line(&mut line)
                .await
                .map_err(|err| err.to_string())?;
            if n == 0 {
                return Ok(lines);
            }

            let Some(value) = line
                .strip_prefix("echo ")
                .and_then(|rest| rest.strip_suffix('\n'))
                .filter(|value| !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()))
            else {
                return Err(format!("malformed request {:?}", line));
            };

            writer
                .write_all(&frame(200, value))
                .await
                .map_err(|err| err.to_string())?;
            lines.push(line);
        }
    });
    Ok((addr, task))
}
