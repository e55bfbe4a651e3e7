//! One-line TCP protocol.
//!
//! A client connects, sends `resource/filename[ arg ...]` terminated by `\n`,
//! and reads the generated text until the server closes the connection. A
//! request that produces nothing gets no bytes at all. There is no framing and
//! no error channel.

mod client;
mod server;

use thiserror::Error;

use crate::domain::error::DomainError;
use crate::domain::keys::HandlerKey;

pub use client::LineClient;
pub use server::LineServer;

/// Default cap on the length of a request line, newline included.
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("connection closed before a full request line was received")]
    Incomplete,
    #[error("request line exceeds {limit} bytes")]
    TooLong { limit: usize },
    #[error("request line is not valid UTF-8: {0}")]
    Decode(#[from] std::string::FromUtf8Error),
    #[error(transparent)]
    Malformed(#[from] DomainError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A parsed request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub key: HandlerKey,
    pub args: Vec<String>,
}

impl Request {
    pub fn new(key: HandlerKey, args: Vec<String>) -> Self {
        Self { key, args }
    }

    /// The request as sent on the wire, newline included.
    pub fn to_line(&self) -> String {
        let mut line = self.key.cache_key();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line.push('\n');
        line
    }
}

/// Parse one request line.
///
/// A trailing `\n` (optionally preceded by `\r`) is ignored. The command runs
/// up to the first space and must be `resource/filename`; the remainder is
/// split on spaces with empty tokens dropped.
pub fn parse_request(line: &str) -> Result<Request, DomainError> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);

    let (command, trailing) = line.split_once(' ').unwrap_or((line, ""));
    let key = HandlerKey::parse(command)?;
    let args = trailing
        .split(' ')
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect();
    Ok(Request { key, args })
}
