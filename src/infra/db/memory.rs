use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::Deserialize;

use crate::application::repos::{DataSource, ReadSession, RepoError};
use crate::domain::entities::{
    InfosRecord, MohClassRecord, QueueMemberRecord, QueueRecord, VoicemailRecord,
};

/// Rows served by a [`MemoryDataSource`].
///
/// Offline deployments can load them from a JSON document whose top-level keys
/// mirror the field names; missing keys mean no rows.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Fixtures {
    pub infos: Option<InfosRecord>,
    pub voicemails: Vec<VoicemailRecord>,
    pub queues: Vec<QueueRecord>,
    pub queue_members: Vec<QueueMemberRecord>,
    pub moh_classes: Vec<MohClassRecord>,
}

impl Fixtures {
    pub fn from_json(document: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(document)
    }
}

#[derive(Debug, Default)]
struct ScopeStats {
    opened: AtomicUsize,
    released: AtomicUsize,
    fail_open: AtomicBool,
    fail_release: AtomicBool,
}

/// Fixture-backed data source.
///
/// Used when no database is configured and throughout the tests, which rely on
/// its scope counters to check that every opened scope is handed back.
#[derive(Debug, Clone, Default)]
pub struct MemoryDataSource {
    fixtures: Arc<Fixtures>,
    stats: Arc<ScopeStats>,
}

impl MemoryDataSource {
    pub fn new(fixtures: Fixtures) -> Self {
        Self {
            fixtures: Arc::new(fixtures),
            stats: Arc::default(),
        }
    }

    pub fn opened(&self) -> usize {
        self.stats.opened.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.stats.released.load(Ordering::SeqCst)
    }

    /// Make subsequent `read_only` calls fail.
    pub fn fail_open(&self, fail: bool) {
        self.stats.fail_open.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent `release` calls fail. The scope still counts as released.
    pub fn fail_release(&self, fail: bool) {
        self.stats.fail_release.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl DataSource for MemoryDataSource {
    async fn read_only(&self) -> Result<Box<dyn ReadSession>, RepoError> {
        if self.stats.fail_open.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("read-only scope unavailable"));
        }
        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySession {
            fixtures: Arc::clone(&self.fixtures),
            stats: Arc::clone(&self.stats),
        }))
    }
}

struct MemorySession {
    fixtures: Arc<Fixtures>,
    stats: Arc<ScopeStats>,
}

#[async_trait]
impl ReadSession for MemorySession {
    async fn infos(&mut self) -> Result<InfosRecord, RepoError> {
        self.fixtures.infos.clone().ok_or(RepoError::NotFound)
    }

    async fn voicemails(&mut self) -> Result<Vec<VoicemailRecord>, RepoError> {
        Ok(self.fixtures.voicemails.clone())
    }

    async fn queues(&mut self) -> Result<Vec<QueueRecord>, RepoError> {
        Ok(self.fixtures.queues.clone())
    }

    async fn queue_members(&mut self) -> Result<Vec<QueueMemberRecord>, RepoError> {
        Ok(self.fixtures.queue_members.clone())
    }

    async fn moh_classes(&mut self) -> Result<Vec<MohClassRecord>, RepoError> {
        Ok(self.fixtures.moh_classes.clone())
    }

    async fn release(self: Box<Self>) -> Result<(), RepoError> {
        self.stats.released.fetch_add(1, Ordering::SeqCst);
        if self.stats.fail_release.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("rollback failed"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scopes_are_counted() {
        let source = MemoryDataSource::default();
        let session = source.read_only().await.expect("session");
        assert_eq!((source.opened(), source.released()), (1, 0));

        session.release().await.expect("released");
        assert_eq!((source.opened(), source.released()), (1, 1));
    }

    #[tokio::test]
    async fn missing_infos_row_is_not_found() {
        let source = MemoryDataSource::default();
        let mut session = source.read_only().await.expect("session");
        assert!(matches!(session.infos().await, Err(RepoError::NotFound)));
        session.release().await.expect("released");
    }

    #[tokio::test]
    async fn fixtures_load_from_json() {
        let fixtures = Fixtures::from_json(
            r#"{
                "infos": { "uuid": "abc" },
                "queues": [ { "name": "support", "options": [["strategy", "ringall"]] } ]
            }"#,
        )
        .expect("fixtures");
        let source = MemoryDataSource::new(fixtures);
        let mut session = source.read_only().await.expect("session");

        assert_eq!(session.infos().await.expect("infos").uuid, "abc");
        let queues = session.queues().await.expect("queues");
        assert_eq!(queues[0].options, vec![("strategy".to_string(), "ringall".to_string())]);
        assert!(session.voicemails().await.expect("voicemails").is_empty());
        session.release().await.expect("released");
    }

    #[test]
    fn malformed_fixtures_are_rejected() {
        assert!(Fixtures::from_json(r#"{ "infos": 3 }"#).is_err());
    }

    #[tokio::test]
    async fn injected_failures() {
        let source = MemoryDataSource::default();
        source.fail_open(true);
        assert!(source.read_only().await.is_err());
        assert_eq!(source.opened(), 0);

        source.fail_open(false);
        source.fail_release(true);
        let session = source.read_only().await.expect("session");
        assert!(session.release().await.is_err());
        assert_eq!(source.released(), 1);
    }
}
