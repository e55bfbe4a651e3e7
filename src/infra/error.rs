use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to bind {addr}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to connect to the database")]
    Connect(#[source] sqlx::Error),
    #[error("failed to read fixtures from {}", path.display())]
    Fixtures {
        path: PathBuf,
        #[source]
        source: FixturesError,
    },
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
}

/// Why an offline fixtures document could not be used.
#[derive(Debug, Error)]
pub enum FixturesError {
    #[error(transparent)]
    Read(#[from] std::io::Error),
    #[error("invalid fixtures document")]
    Parse(#[from] serde_json::Error),
}

impl InfraError {
    pub fn bind(addr: impl ToString, source: std::io::Error) -> Self {
        Self::Bind {
            addr: addr.to_string(),
            source,
        }
    }

    pub fn fixtures(path: impl Into<PathBuf>, source: impl Into<FixturesError>) -> Self {
        Self::Fixtures {
            path: path.into(),
            source: source.into(),
        }
    }
}
