//! HTTP Upgrade handshake (RFC 6455 §4.2).

use crate::error::HandshakeError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha1::{Digest, Sha1};

/// GUID appended to the client key before hashing.
pub const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Token that marks a request as a WebSocket upgrade.
const UPGRADE_TOKEN: &str = "Upgrade: websocket";

const KEY_HEADER: &str = "Sec-WebSocket-Key";

/// End of the request head.
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// A parsed upgrade request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    /// Trimmed value of the `Sec-WebSocket-Key` header
    pub key: String,
}

impl Handshake {
    /// `Sec-WebSocket-Accept` value answering this request.
    pub fn accept_key(&self) -> String {
        derive_accept_key(&self.key)
    }
}

/// Compute the `Sec-WebSocket-Accept` value for a client key.
pub fn derive_accept_key(client_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(client_key.as_bytes());
    hasher.update(WEBSOCKET_GUID.as_bytes());
    STANDARD.encode(hasher.finalize())
}

/// Parse a raw upgrade request and extract the client key.
///
/// # Errors
///
/// - [`HandshakeError::NotText`] if the bytes are not UTF-8
/// - [`HandshakeError::NotUpgrade`] without the literal `Upgrade: websocket`
/// - [`HandshakeError::MissingKey`] if no non-empty key header line exists
pub fn parse_handshake(request: &[u8]) -> Result<Handshake, HandshakeError> {
    let text = std::str::from_utf8(request).map_err(|_| HandshakeError::NotText)?;

    if !text.contains(UPGRADE_TOKEN) {
        return Err(HandshakeError::NotUpgrade);
    }

    let key = text
        .split("\r\n")
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case(KEY_HEADER))
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
        .ok_or(HandshakeError::MissingKey)?;

    Ok(Handshake {
        key: key.to_string(),
    })
}

/// Render the `101 Switching Protocols` response.
pub fn build_handshake_response(accept_key: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {}\r\n\
         \r\n",
        accept_key
    )
    .into_bytes()
}

/// Whether `buf` holds a complete request head.
pub fn is_request_complete(buf: &[u8]) -> bool {
    buf.windows(HEADER_TERMINATOR.len())
        .any(|window| window == HEADER_TERMINATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_KEY: &str = "dGhlIHNhbXBsZSBub25jZQ==";

    fn upgrade_request(extra: &str) -> String {
        format!(
            "GET /chat HTTP/1.1\r\n\
             Host: localhost:8001\r\n\
             {extra}\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Key: {SAMPLE_KEY}\r\n\
             Sec-WebSocket-Version: 13\r\n\
             \r\n"
        )
    }

    #[test]
    fn test_accept_key_rfc_vector() {
        assert_eq!(derive_accept_key(SAMPLE_KEY), "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
    }

    #[test]
    fn test_accept_key_is_deterministic() {
        assert_eq!(derive_accept_key("abc"), derive_accept_key("abc"));
        assert_ne!(derive_accept_key("abc"), derive_accept_key("abd"));
    }

    #[test]
    fn test_parse_extracts_key() {
        let handshake = parse_handshake(upgrade_request("").as_bytes()).unwrap();
        assert_eq!(handshake.key, SAMPLE_KEY);
        assert_eq!(handshake.accept_key(), "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
    }

    #[test]
    fn test_parse_ignores_surrounding_headers() {
        let extra = "User-Agent: Mozilla/5.0\r\nOrigin: http://localhost:8000\r\nSec-WebSocket-Extensions: permessage-deflate\r\n";
        let handshake = parse_handshake(upgrade_request(extra).as_bytes()).unwrap();
        assert_eq!(handshake.key, SAMPLE_KEY);
    }

    #[test]
    fn test_parse_trims_key_whitespace() {
        let request = "GET / HTTP/1.1\r\nUpgrade: websocket\r\nSec-WebSocket-Key:    abc==  \r\n\r\n";
        assert_eq!(parse_handshake(request.as_bytes()).unwrap().key, "abc==");
    }

    #[test]
    fn test_parse_rejects_plain_http() {
        let request = "GET /index.html HTTP/1.1\r\nHost: localhost\r\n\r\n";
        assert_eq!(
            parse_handshake(request.as_bytes()),
            Err(HandshakeError::NotUpgrade)
        );
    }

    #[test]
    fn test_parse_rejects_missing_key() {
        let request = "GET / HTTP/1.1\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\r\n";
        assert_eq!(
            parse_handshake(request.as_bytes()),
            Err(HandshakeError::MissingKey)
        );

        let request = "GET / HTTP/1.1\r\nUpgrade: websocket\r\nSec-WebSocket-Key:   \r\n\r\n";
        assert_eq!(
            parse_handshake(request.as_bytes()),
            Err(HandshakeError::MissingKey)
        );
    }

    #[test]
    fn test_parse_rejects_binary_garbage() {
        assert_eq!(
            parse_handshake(&[0xff, 0xfe, 0x00]),
            Err(HandshakeError::NotText)
        );
    }

    #[test]
    fn test_response_layout() {
        let response = String::from_utf8(build_handshake_response("KEY=")).unwrap();
        assert_eq!(
            response,
            "HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Accept: KEY=\r\n\r\n"
        );
    }

    #[test]
    fn test_request_completeness() {
        assert!(!is_request_complete(b"GET / HTTP/1.1\r\nUpgrade: websocket\r\n"));
        assert!(is_request_complete(upgrade_request("").as_bytes()));
    }
}
