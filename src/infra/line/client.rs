use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::{ProtocolError, Request};

/// Sends single requests to a running daemon.
#[derive(Debug, Clone)]
pub struct LineClient {
    addr: String,
    timeout: Duration,
}

impl LineClient {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Send `request` and return everything the server writes before closing.
    /// An empty response is a valid answer.
    pub async fn send(&self, request: &Request) -> Result<Vec<u8>, ProtocolError> {
        self.send_line(&request.to_line()).await
    }

    /// Send a raw line as-is. The caller supplies the terminating newline.
    pub async fn send_line(&self, line: &str) -> Result<Vec<u8>, ProtocolError> {
        let exchange = async {
            let mut stream = TcpStream::connect(&self.addr).await?;
            stream.write_all(line.as_bytes()).await?;
            stream.flush().await?;

            let mut response = Vec::new();
            stream.read_to_end(&mut response).await?;
            Ok::<_, ProtocolError>(response)
        };

        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| {
                ProtocolError::Io(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("no response from {} within {:?}", self.addr, self.timeout),
                ))
            })?
    }
}
