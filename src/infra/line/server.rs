use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::application::events::{EventKind, EventSink, GenerationEvent};
use crate::application::generate::ConfigGenerator;
use crate::infra::error::InfraError;

use super::{DEFAULT_MAX_REQUEST_BYTES, ProtocolError, parse_request};

const TARGET: &str = "confgend::line";

/// Accepts connections and answers one request on each.
pub struct LineServer {
    generator: Arc<ConfigGenerator>,
    events: Arc<dyn EventSink>,
    max_request_bytes: usize,
    grace: Duration,
}

impl LineServer {
    pub fn new(generator: Arc<ConfigGenerator>, events: Arc<dyn EventSink>) -> Self {
        Self {
            generator,
            events,
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
            grace: Duration::from_secs(10),
        }
    }

    pub fn with_max_request_bytes(mut self, max_request_bytes: usize) -> Self {
        self.max_request_bytes = max_request_bytes;
        self
    }

    /// How long in-flight connections may run after shutdown is requested.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub async fn bind(addr: SocketAddr) -> Result<TcpListener, InfraError> {
        TcpListener::bind(addr)
            .await
            .map_err(|err| InfraError::bind(addr, err))
    }

    /// Serve until `shutdown` resolves, then drain in-flight connections.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), InfraError>
    where
        F: Future<Output = ()>,
    {
        let local_addr = listener.local_addr()?;
        info!(target = TARGET, addr = %local_addr, "line server listening");

        let this = Arc::new(self);
        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            while connections.try_join_next().is_some() {}

            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let server = Arc::clone(&this);
                            connections.spawn(async move {
                                server.handle(stream, peer).await;
                            });
                        }
                        Err(err) => {
                            error!(target = TARGET, error = %err, "failed to accept connection");
                        }
                    }
                }
                _ = &mut shutdown => {
                    info!(
                        target = TARGET,
                        in_flight = connections.len(),
                        "shutdown requested, no longer accepting connections"
                    );
                    break;
                }
            }
        }
        drop(listener);

        let drained = tokio::time::timeout(this.grace, async {
            while connections.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(
                target = TARGET,
                aborted = connections.len(),
                grace_ms = this.grace.as_millis() as u64,
                "grace period elapsed, aborting in-flight connections"
            );
            connections.abort_all();
        }
        Ok(())
    }

    async fn handle(&self, mut stream: TcpStream, peer: SocketAddr) {
        match self.exchange(&mut stream).await {
            Ok(written) => {
                debug!(target = TARGET, peer = %peer, bytes = written, "request served");
            }
            Err(ProtocolError::Decode(err)) => {
                self.events.record(
                    &GenerationEvent::unkeyed(EventKind::DecodeFailed).with_cause(err.to_string()),
                );
            }
            Err(ProtocolError::Malformed(err)) => {
                self.events.record(
                    &GenerationEvent::unkeyed(EventKind::MalformedRequest)
                        .with_cause(err.to_string()),
                );
            }
            Err(ProtocolError::TooLong { limit }) => {
                self.events.record(
                    &GenerationEvent::unkeyed(EventKind::MalformedRequest)
                        .with_cause(format!("request line exceeds {limit} bytes")),
                );
            }
            Err(err) => {
                debug!(target = TARGET, peer = %peer, error = %err, "connection dropped");
            }
        }
        let _ = stream.shutdown().await;
    }

    /// Read one request line, answer it, and return the number of bytes sent.
    async fn exchange(&self, stream: &mut TcpStream) -> Result<usize, ProtocolError> {
        let (reader, mut writer) = stream.split();
        let limit = self.max_request_bytes;
        let mut reader = BufReader::new(reader.take(limit as u64));

        let mut line = Vec::new();
        reader.read_until(b'\n', &mut line).await?;
        if line.last() != Some(&b'\n') {
            if line.len() >= limit {
                return Err(ProtocolError::TooLong { limit });
            }
            return Err(ProtocolError::Incomplete);
        }

        let line = String::from_utf8(line)?;
        let request = parse_request(&line)?;
        let Some(content) = self.generator.generate(&request.key, &request.args).await else {
            return Ok(0);
        };

        writer.write_all(content.as_bytes()).await?;
        writer.flush().await?;
        Ok(content.len())
    }
}
