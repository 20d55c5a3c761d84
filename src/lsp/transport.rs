//! LSP transport framing (`Content-Length` delimited JSON-RPC payloads).
//!
//! Reading is blocking and handles exactly one message per call. Writing
//! always declares a UTF-8 charset.

use std::io::{self, BufRead, Write};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Content type emitted on every outgoing message
pub const CONTENT_TYPE: &str = "application/vscode-jsonrpc; charset=utf-8";

/// Largest payload accepted from the client
pub const MAX_CONTENT_LENGTH: usize = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("connection closed by client")]
    ConnectionClosed,
    #[error("missing Content-Length header")]
    MissingContentLength,
    #[error("invalid Content-Length header: {0:?}")]
    InvalidContentLength(String),
    #[error("unsupported charset: {0:?}")]
    UnsupportedCharset(String),
    #[error("payload is not valid {charset}")]
    InvalidEncoding { charset: Charset },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl TransportError {
    /// Whether the read loop can carry on after this error.
    ///
    /// Only a payload that failed to parse as JSON leaves the stream
    /// positioned at the next header.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TransportError::InvalidJson(_))
    }
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Charsets accepted in the `Content-Type` header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Charset {
    #[default]
    Utf8,
    Ascii,
}

impl Charset {
    pub fn parse(value: &str) -> TransportResult<Self> {
        let name = value.trim().trim_matches('"').to_ascii_lowercase();
        match name.as_str() {
            "utf-8" | "utf8" => Ok(Charset::Utf8),
            "ascii" | "us-ascii" => Ok(Charset::Ascii),
            _ => Err(TransportError::UnsupportedCharset(value.trim().to_string())),
        }
    }

    fn decode(self, bytes: Vec<u8>) -> TransportResult<String> {
        if self == Charset::Ascii && !bytes.is_ascii() {
            return Err(TransportError::InvalidEncoding { charset: self });
        }
        String::from_utf8(bytes).map_err(|_| TransportError::InvalidEncoding { charset: self })
    }
}

impl std::fmt::Display for Charset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Charset::Utf8 => f.write_str("utf-8"),
            Charset::Ascii => f.write_str("ascii"),
        }
    }
}

/// Parsed header block of one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub content_length: usize,
    pub charset: Charset,
}

/// Read the header block up to and including the blank separator line.
pub fn read_header<R: BufRead>(reader: &mut R) -> TransportResult<Header> {
    let mut content_length = None;
    let mut charset = Charset::default();
    let mut first = true;

    loop {
        let mut line = String::new();
        let bytes = reader.read_line(&mut line)?;
        if bytes == 0 {
            if first {
                return Err(TransportError::ConnectionClosed);
            }
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }
        first = false;

        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            break;
        }

        let Some((name, value)) = trimmed.split_once(':') else {
            log::debug!("ignoring malformed header line {trimmed:?}");
            continue;
        };
        if name.trim().eq_ignore_ascii_case("Content-Length") {
            let value = value.trim();
            let parsed = value
                .parse::<usize>()
                .ok()
                .filter(|length| *length <= MAX_CONTENT_LENGTH)
                .ok_or_else(|| TransportError::InvalidContentLength(value.to_string()))?;
            content_length = Some(parsed);
        } else if name.trim().eq_ignore_ascii_case("Content-Type") {
            if let Some(param) = value
                .split(';')
                .map(str::trim)
                .find_map(|param| param.strip_prefix("charset="))
            {
                charset = Charset::parse(param)?;
            }
        } else {
            log::debug!("ignoring unknown header {name:?}");
        }
    }

    let content_length = content_length.ok_or(TransportError::MissingContentLength)?;
    Ok(Header {
        content_length,
        charset,
    })
}

/// Read one framed message and return its decoded text payload.
pub fn read_payload<R: BufRead>(reader: &mut R) -> TransportResult<String> {
    let header = read_header(reader)?;
    let mut body = vec![0_u8; header.content_length];
    reader.read_exact(&mut body)?;
    header.charset.decode(body)
}

/// Read one framed message and parse it as JSON.
pub fn read_message<R: BufRead>(reader: &mut R) -> TransportResult<Value> {
    let payload = read_payload(reader)?;
    log::trace!("<- {payload}");
    Ok(serde_json::from_str(&payload)?)
}

/// Frame a JSON body into the exact bytes sent over the wire.
pub fn encode_message<T: Serialize>(payload: &T) -> TransportResult<Vec<u8>> {
    let body = serde_json::to_vec(payload)?;
    let mut framed = format!(
        "Content-Length: {}\r\nContent-Type: {}\r\n\r\n",
        body.len(),
        CONTENT_TYPE
    )
    .into_bytes();
    framed.extend_from_slice(&body);
    Ok(framed)
}

pub fn write_message<W: Write, T: Serialize>(writer: &mut W, payload: &T) -> TransportResult<()> {
    let framed = encode_message(payload)?;
    if log::log_enabled!(log::Level::Trace) {
        log::trace!("-> {}", String::from_utf8_lossy(&framed));
    }
    writer.write_all(&framed)?;
    writer.flush()?;
    Ok(())
}
