//! Data sources backing the read-only generation scope.

mod memory;
mod util;

pub use memory::{Fixtures, MemoryDataSource};
pub use util::map_sqlx_error;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{
    Postgres, Transaction,
    postgres::{PgPool, PgPoolOptions},
    query, query_as,
};

use crate::application::repos::{DataSource, ReadSession, RepoError};
use crate::domain::entities::{
    InfosRecord, MohClassRecord, QueueMemberRecord, QueueRecord, VoicemailRecord,
};

#[derive(Clone)]
pub struct PostgresDataSource {
    pool: Arc<PgPool>,
}

impl PostgresDataSource {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }
}

#[async_trait]
impl DataSource for PostgresDataSource {
    async fn read_only(&self) -> Result<Box<dyn ReadSession>, RepoError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        query("SET TRANSACTION READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Box::new(PostgresSession { tx }))
    }
}

/// Read-only transaction. Dropping it without [`ReadSession::release`] rolls
/// back as well.
struct PostgresSession {
    tx: Transaction<'static, Postgres>,
}

#[derive(sqlx::FromRow)]
struct InfosRow {
    uuid: String,
}

#[derive(sqlx::FromRow)]
struct VoicemailRow {
    context: String,
    mailbox: String,
    password: String,
    fullname: String,
    email: Option<String>,
    pager: Option<String>,
    options: Vec<String>,
}

impl From<VoicemailRow> for VoicemailRecord {
    fn from(row: VoicemailRow) -> Self {
        Self {
            context: row.context,
            mailbox: row.mailbox,
            password: row.password,
            fullname: row.fullname,
            email: row.email.filter(|email| !email.is_empty()),
            pager: row.pager.filter(|pager| !pager.is_empty()),
            options: split_options(row.options),
        }
    }
}

#[derive(sqlx::FromRow)]
struct QueueRow {
    name: String,
    options: Vec<String>,
}

#[derive(sqlx::FromRow)]
struct QueueMemberRow {
    queue_name: String,
    interface: String,
    penalty: i32,
    position: i32,
}

#[derive(sqlx::FromRow)]
struct MohClassRow {
    name: String,
    mode: String,
    directory: Option<String>,
    application: Option<String>,
    sort: Option<String>,
}

/// `key=value` array entries as pairs; entries without `=` get an empty value.
fn split_options(options: Vec<String>) -> Vec<(String, String)> {
    options
        .into_iter()
        .map(|entry| match entry.split_once('=') {
            Some((key, value)) => (key.trim().to_string(), value.trim().to_string()),
            None => (entry.trim().to_string(), String::new()),
        })
        .collect()
}

#[async_trait]
impl ReadSession for PostgresSession {
    async fn infos(&mut self) -> Result<InfosRecord, RepoError> {
        let row = query_as::<_, InfosRow>("SELECT uuid FROM infos LIMIT 1")
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        let row = row.ok_or(RepoError::NotFound)?;
        Ok(InfosRecord { uuid: row.uuid })
    }

    async fn voicemails(&mut self) -> Result<Vec<VoicemailRecord>, RepoError> {
        let rows = query_as::<_, VoicemailRow>(
            r#"
            SELECT context,
                   mailbox,
                   password,
                   fullname,
                   email,
                   pager,
                   options
            FROM voicemail
            WHERE commented = 0
            ORDER BY context, mailbox
            "#,
        )
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(VoicemailRecord::from).collect())
    }

    async fn queues(&mut self) -> Result<Vec<QueueRecord>, RepoError> {
        let rows = query_as::<_, QueueRow>(
            r#"
            SELECT name, options
            FROM queue
            WHERE commented = 0
            ORDER BY name
            "#,
        )
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows
            .into_iter()
            .map(|row| QueueRecord {
                name: row.name,
                options: split_options(row.options),
            })
            .collect())
    }

    async fn queue_members(&mut self) -> Result<Vec<QueueMemberRecord>, RepoError> {
        let rows = query_as::<_, QueueMemberRow>(
            r#"
            SELECT queue_name, interface, penalty, position
            FROM queuemember
            WHERE commented = 0
            ORDER BY queue_name, position
            "#,
        )
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows
            .into_iter()
            .map(|row| QueueMemberRecord {
                queue_name: row.queue_name,
                interface: row.interface,
                penalty: row.penalty,
                position: row.position,
            })
            .collect())
    }

    async fn moh_classes(&mut self) -> Result<Vec<MohClassRecord>, RepoError> {
        let rows = query_as::<_, MohClassRow>(
            r#"
            SELECT name, mode, directory, application, sort
            FROM moh
            ORDER BY name
            "#,
        )
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows
            .into_iter()
            .map(|row| MohClassRecord {
                name: row.name,
                mode: row.mode,
                directory: row.directory,
                application: row.application,
                sort: row.sort,
            })
            .collect())
    }

    async fn release(self: Box<Self>) -> Result<(), RepoError> {
        self.tx.rollback().await.map_err(map_sqlx_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_are_split_on_first_equals() {
        let options = split_options(vec![
            "attach=yes".to_string(),
            "tz = eu=central".to_string(),
            "delete".to_string(),
        ]);
        assert_eq!(
            options,
            vec![
                ("attach".to_string(), "yes".to_string()),
                ("tz".to_string(), "eu=central".to_string()),
                ("delete".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn blank_contact_fields_become_none() {
        let record = VoicemailRecord::from(VoicemailRow {
            context: "default".to_string(),
            mailbox: "1001".to_string(),
            password: "1234".to_string(),
            fullname: "Alice".to_string(),
            email: Some(String::new()),
            pager: None,
            options: Vec::new(),
        });
        assert_eq!(record.email, None);
        assert_eq!(record.pager, None);
    }
}
