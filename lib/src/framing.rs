//! Wire framing: `DDD SSSSSSSS\n` response headers and `cmd arg...\n`
//! requests.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::Error;

/// Length of a response header, terminating newline included.
pub const HEADER_LEN: usize = 13;

const CODE_FIELD: std::ops::Range<usize> = 0..3;
const SIZE_FIELD: std::ops::Range<usize> = 4..12;

/// Largest body length the size field can express.
pub const MAX_BODY_LEN: usize = 99_999_999;

/// Parses a response header into its status code and body length.
///
/// Numeric fields may be padded with spaces (varnishd left-justifies both)
/// or zeros.
///
/// # Errors
///
/// Returns [`Error::InvalidResponseHeader`] carrying the raw bytes when the
/// separators are misplaced or a field holds anything but padded digits.
pub fn parse_header(raw: &[u8; HEADER_LEN]) -> Result<(u16, usize), Error> {
    let invalid = || Error::InvalidResponseHeader(raw.to_vec());

    if raw[3] != b' ' || raw[HEADER_LEN - 1] != b'\n' {
        return Err(invalid());
    }

    let code = parse_field(&raw[CODE_FIELD], false)
        .and_then(|code| u16::try_from(code).ok())
        .ok_or_else(invalid)?;
    let size = parse_field(&raw[SIZE_FIELD], true).ok_or_else(invalid)?;
    Ok((code, size))
}

fn parse_field(field: &[u8], leading_padding: bool) -> Option<usize> {
    let start = if leading_padding {
        field.iter().take_while(|&&b| b == b' ').count()
    } else {
        0
    };
    let digits = field[start..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits == 0 || !field[start + digits..].iter().all(|&b| b == b' ') {
        return None;
    }

    Some(
        field[start..start + digits]
            .iter()
            .fold(0, |acc, &b| acc * 10 + usize::from(b - b'0')),
    )
}

/// Encodes a response header in its canonical zero-padded form.
///
/// Returns `None` when `code` or `size` do not fit their fields.
#[must_use]
pub fn encode_header(code: u16, size: usize) -> Option<[u8; HEADER_LEN]> {
    if code > 999 || size > MAX_BODY_LEN {
        return None;
    }

    let text = format!("{:03} {:08}\n", code, size);
    let mut header = [0u8; HEADER_LEN];
    header.copy_from_slice(text.as_bytes());
    Some(header)
}

/// Appends `command` and `args`, space separated and newline terminated, to
/// `out`. Arguments are written verbatim; quoting is up to the caller.
pub fn encode_request<A: AsRef<str>>(out: &mut Vec<u8>, command: &str, args: &[A]) {
    out.extend_from_slice(command.as_bytes());
    for arg in args {
        out.push(b' ');
        out.extend_from_slice(arg.as_ref().as_bytes());
    }
    out.push(b'\n');
}

/// Reads until `buf` is full or the reader hits EOF, returning the number of
/// bytes read.
pub(crate) async fn read_full<R>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{HEADER_LEN, MAX_BODY_LEN, encode_header, encode_request, parse_header, read_full};
    use crate::Error;

    fn header(text: &str) -> [u8; HEADER_LEN] {
        text.as_bytes().try_into().expect("13-byte header")
    }

    #[test]
    fn parses_zero_padded_header() {
        assert_eq!(parse_header(&header("200 00000286\n")).ok(), Some((200, 286)));
    }

    #[test]
    fn parses_varnishd_left_justified_header() {
        assert_eq!(parse_header(&header("107 59      \n")).ok(), Some((107, 59)));
        assert_eq!(parse_header(&header("200 0       \n")).ok(), Some((200, 0)));
    }

    #[test]
    fn parses_right_justified_header() {
        assert_eq!(parse_header(&header("300       12\n")).ok(), Some((300, 12)));
    }

    #[test]
    fn short_code_field_is_terminated_by_space() {
        assert_eq!(parse_header(&header("20  00000001\n")).ok(), Some((20, 1)));
    }

    #[test]
    fn rejects_malformed_headers() {
        for text in [
            "abc 000000000",
            "200-00000000\n",
            "200 00000000 ",
            "200 0000000a\n",
            "200         \n",
            " 20 00000000\n",
            "2 0 00000000\n",
            "200 12 34   \n",
            "+20 00000001\n",
            "200 -0000001\n",
        ] {
            match parse_header(&header(text)) {
                Err(Error::InvalidResponseHeader(raw)) => assert_eq!(raw, text.as_bytes()),
                other => panic!("{text:?}: expected invalid header, got {other:?}"),
            }
        }
    }

    #[test]
    fn encode_header_rejects_out_of_range_values() {
        assert!(encode_header(1000, 0).is_none());
        assert!(encode_header(200, MAX_BODY_LEN + 1).is_none());
        assert_eq!(
            encode_header(201, 7).as_ref().map(|h| &h[..]),
            Some(&b"201 00000007\n"[..])
        );
    }

    #[test]
    fn encodes_requests_verbatim() {
        let mut out = Vec::new();
        encode_request(&mut out, "help", &["\"banner\""]);
        encode_request::<&str>(&mut out, "ping", &[]);
        encode_request(&mut out, "backend.list", &["-j", "-p"]);
        assert_eq!(out, b"help \"banner\"\nping\nbackend.list -j -p\n");
    }

    #[tokio::test]
    async fn read_full_stops_at_eof() {
        let mut reader: &[u8] = b"200 0";
        let mut buf = [0u8; HEADER_LEN];
        let n = read_full(&mut reader, &mut buf).await.expect("read");
        assert_eq!(&buf[..n], b"200 0");
    }

    proptest! {
        #[test]
        fn parse_inverts_encode(code in 0u16..=999, size in 0usize..=MAX_BODY_LEN) {
            let raw = encode_header(code, size).expect("in range");
            prop_assert_eq!(parse_header(&raw).ok(), Some((code, size)));
        }

        #[test]
        fn canonical_headers_reencode_identically(raw in "[0-9]{3} [0-9]{8}\n") {
            let raw = header(&raw);
            let (code, size) = parse_header(&raw).expect("valid header");
            prop_assert_eq!(encode_header(code, size), Some(raw));
        }
    }
}
