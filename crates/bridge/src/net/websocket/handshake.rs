use std::io::{self, Read};
use std::time::{Duration, Instant};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha1::{Digest, Sha1};
use thiserror::Error;

use crate::net::is_timeout;

/// Fixed GUID appended to the client key (RFC 6455 section 1.3).
pub const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";
pub const MAX_HANDSHAKE_BYTES: usize = 8 * 1024;

pub const BAD_REQUEST: &[u8] =
    b"HTTP/1.1 400 Bad Request\r\nConnection: close\r\nContent-Length: 0\r\n\r\n";

#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("request exceeds {0} bytes")]
    TooLarge(usize),
    #[error("handshake timed out")]
    Timeout,
    #[error("connection closed during handshake")]
    Closed,
    #[error("malformed request line")]
    BadRequestLine,
    #[error("method {0} not allowed")]
    Method(String),
    #[error("unsupported protocol {0}")]
    Protocol(String),
    #[error("malformed header line")]
    BadHeader,
    #[error("missing Upgrade: websocket header")]
    MissingUpgrade,
    #[error("missing Connection: Upgrade header")]
    MissingConnectionUpgrade,
    #[error("missing Sec-WebSocket-Key header")]
    MissingKey,
    #[error("Sec-WebSocket-Key does not decode to 16 bytes")]
    InvalidKey,
    #[error("unsupported Sec-WebSocket-Version {0}")]
    Version(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeRequest {
    pub path: String,
    pub key: String,
    pub headers: Vec<(String, String)>,
}

impl HandshakeRequest {
    /// Case-insensitive header lookup; returns the first match.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// base64(SHA-1(key ++ GUID)).
pub fn accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WEBSOCKET_GUID.as_bytes());
    STANDARD.encode(hasher.finalize())
}

/// Offset just past the blank line ending the request head, if present.
pub fn request_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

pub fn parse_request(head: &[u8]) -> Result<HandshakeRequest, HandshakeError> {
    let text = std::str::from_utf8(head).map_err(|_| HandshakeError::BadRequestLine)?;
    let mut lines = text.split("\r\n");

    let request_line = lines.next().ok_or(HandshakeError::BadRequestLine)?;
    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(path), Some(protocol), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(HandshakeError::BadRequestLine);
    };
    if method != "GET" {
        return Err(HandshakeError::Method(method.to_owned()));
    }
    if protocol != "HTTP/1.1" {
        return Err(HandshakeError::Protocol(protocol.to_owned()));
    }

    let mut headers = Vec::new();
    for line in lines.take_while(|l| !l.is_empty()) {
        let (name, value) = line.split_once(':').ok_or(HandshakeError::BadHeader)?;
        headers.push((name.trim().to_owned(), value.trim().to_owned()));
    }

    let mut request = HandshakeRequest {
        path: path.to_owned(),
        key: String::new(),
        headers,
    };

    let upgrade = request.header("Upgrade").unwrap_or_default();
    if !has_token(upgrade, "websocket") {
        return Err(HandshakeError::MissingUpgrade);
    }
    let connection = request.header("Connection").unwrap_or_default();
    if !has_token(connection, "upgrade") {
        return Err(HandshakeError::MissingConnectionUpgrade);
    }
    if let Some(version) = request.header("Sec-WebSocket-Version") {
        if version != "13" {
            return Err(HandshakeError::Version(version.to_owned()));
        }
    }
    let key = request
        .header("Sec-WebSocket-Key")
        .ok_or(HandshakeError::MissingKey)?
        .to_owned();
    match STANDARD.decode(&key) {
        Ok(raw) if raw.len() == 16 => {}
        _ => return Err(HandshakeError::InvalidKey),
    }
    request.key = key;
    Ok(request)
}

fn has_token(value: &str, token: &str) -> bool {
    value.split(',').any(|t| t.trim().eq_ignore_ascii_case(token))
}

pub fn response(request: &HandshakeRequest) -> String {
    format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {}\r\n\r\n",
        accept_key(&request.key)
    )
}

/// Reads the request head within `timeout`. Bytes received after the head
/// (an eager first frame) are returned alongside the request.
pub fn read_request<R: Read>(
    stream: &mut R,
    timeout: Duration,
) -> Result<(HandshakeRequest, Vec<u8>), HandshakeError> {
    let deadline = Instant::now() + timeout;
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];

    loop {
        if let Some(end) = request_end(&buf) {
            let request = parse_request(&buf[..end])?;
            return Ok((request, buf[end..].to_vec()));
        }
        if buf.len() > MAX_HANDSHAKE_BYTES {
            return Err(HandshakeError::TooLarge(MAX_HANDSHAKE_BYTES));
        }
        if Instant::now() >= deadline {
            return Err(HandshakeError::Timeout);
        }
        match stream.read(&mut chunk) {
            Ok(0) => return Err(HandshakeError::Closed),
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(e) if is_timeout(&e) => {}
            Err(e) => return Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &[u8] = b"GET /chat HTTP/1.1\r\n\
        Host: server.example.com\r\n\
        Upgrade: websocket\r\n\
        Connection: Upgrade\r\n\
        Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
        Sec-WebSocket-Version: 13\r\n\r\n";

    #[test]
    fn rfc_6455_accept_vector() {
        assert_eq!(
            accept_key("dGhlIHNhbXBsZSBub25jZQ=="),
            "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
        );
    }

    #[test]
    fn parses_sample_request() {
        let request = parse_request(SAMPLE).unwrap();
        assert_eq!(request.path, "/chat");
        assert_eq!(request.key, "dGhlIHNhbXBsZSBub25jZQ==");
        assert_eq!(request.header("host"), Some("server.example.com"));

        let response = response(&request);
        assert!(response.starts_with("HTTP/1.1 101 Switching Protocols\r\n"));
        assert!(response.contains("Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n"));
        assert!(response.ends_with("\r\n\r\n"));
    }

    #[test]
    fn rejects_bad_requests() {
        let cases: [(&[u8], fn(&HandshakeError) -> bool); 6] = [
            (
                b"POST / HTTP/1.1\r\nUpgrade: websocket\r\n\r\n",
                |e| matches!(e, HandshakeError::Method(_)),
            ),
            (
                b"GET / HTTP/1.0\r\nUpgrade: websocket\r\n\r\n",
                |e| matches!(e, HandshakeError::Protocol(_)),
            ),
            (
                b"GET / HTTP/1.1\r\nSec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\r\n",
                |e| matches!(e, HandshakeError::MissingUpgrade),
            ),
            (
                b"GET / HTTP/1.1\r\nUpgrade: websocket\r\n\
                  Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\r\n",
                |e| matches!(e, HandshakeError::MissingConnectionUpgrade),
            ),
            (
                b"GET / HTTP/1.1\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\r\n",
                |e| matches!(e, HandshakeError::MissingKey),
            ),
            (
                b"GET / HTTP/1.1\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\
                  Sec-WebSocket-Key: c2hvcnQ=\r\n\r\n",
                |e| matches!(e, HandshakeError::InvalidKey),
            ),
        ];
        for (request, expected) in cases {
            let err = parse_request(request).unwrap_err();
            assert!(expected(&err), "{:?}", err);
        }
    }

    #[test]
    fn upgrade_token_is_case_insensitive() {
        let request = b"GET / HTTP/1.1\r\nupgrade: WebSocket\r\n\
            connection: keep-alive, upgrade\r\n\
            sec-websocket-key: dGhlIHNhbXBsZSBub25jZQ==\r\n\r\n";
        assert!(parse_request(request).is_ok());
    }

    #[test]
    fn read_request_keeps_trailing_bytes() {
        let mut input = SAMPLE.to_vec();
        input.extend_from_slice(&[0x81, 0x80]);
        let mut reader = &input[..];
        let (request, rest) = read_request(&mut reader, Duration::from_secs(1)).unwrap();
        assert_eq!(request.path, "/chat");
        assert_eq!(rest, vec![0x81, 0x80]);
    }

    #[test]
    fn oversized_request_is_rejected() {
        let mut input = b"GET / HTTP/1.1\r\nX-Pad: ".to_vec();
        input.extend(std::iter::repeat_n(b'a', MAX_HANDSHAKE_BYTES + 10));
        let mut reader = &input[..];
        assert!(matches!(
            read_request(&mut reader, Duration::from_secs(1)),
            Err(HandshakeError::TooLarge(_))
        ));
    }
}
