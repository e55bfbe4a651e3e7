use std::error::Error as StdError;

use thiserror::Error;

use crate::config::LoadError;
use crate::domain::error::DomainError;
use crate::infra::error::InfraError;
use crate::infra::line::ProtocolError;

/// Flattened view of an error and its source chain, for logging.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self { source, messages }
    }

    /// Messages joined outermost first.
    pub fn chain(&self) -> String {
        self.messages.join(": ")
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("failed to load configuration")]
    Config(#[from] LoadError),
    #[error("request to {addr} failed")]
    Request {
        addr: String,
        #[source]
        source: ProtocolError,
    },
}

impl AppError {
    pub fn request(addr: impl Into<String>, source: ProtocolError) -> Self {
        Self::Request {
            addr: addr.into(),
            source,
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport::from_error("application::error::AppError", self)
    }
}
