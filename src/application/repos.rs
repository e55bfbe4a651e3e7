//! Repository traits describing the read-only data scope.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{
    InfosRecord, MohClassRecord, QueueMemberRecord, QueueRecord, VoicemailRecord,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Opens read-only scopes against the configuration database.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Open a scope in which no mutation can be committed.
    ///
    /// Callers must hand the session back through [`ReadSession::release`];
    /// a session that is dropped instead is rolled back by the backend.
    async fn read_only(&self) -> Result<Box<dyn ReadSession>, RepoError>;
}

/// Queries available to generators inside a read-only scope.
#[async_trait]
pub trait ReadSession: Send {
    async fn infos(&mut self) -> Result<InfosRecord, RepoError>;

    async fn voicemails(&mut self) -> Result<Vec<VoicemailRecord>, RepoError>;

    async fn queues(&mut self) -> Result<Vec<QueueRecord>, RepoError>;

    async fn queue_members(&mut self) -> Result<Vec<QueueMemberRecord>, RepoError>;

    async fn moh_classes(&mut self) -> Result<Vec<MohClassRecord>, RepoError>;

    /// Close the scope, discarding anything the session might have changed.
    async fn release(self: Box<Self>) -> Result<(), RepoError>;
}
