//! Records read from the telephony configuration database.
//!
//! Only the columns the built-in generators render are mirrored here.

use serde::{Deserialize, Serialize};

/// Server-wide identity row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfosRecord {
    pub uuid: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoicemailRecord {
    pub context: String,
    pub mailbox: String,
    pub password: String,
    pub fullname: String,
    pub email: Option<String>,
    pub pager: Option<String>,
    /// Per-mailbox options, rendered as `key=value` pairs joined with `|`.
    #[serde(default)]
    pub options: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueRecord {
    pub name: String,
    #[serde(default)]
    pub options: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueMemberRecord {
    pub queue_name: String,
    pub interface: String,
    pub penalty: i32,
    pub position: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MohClassRecord {
    pub name: String,
    pub mode: String,
    pub directory: Option<String>,
    pub application: Option<String>,
    pub sort: Option<String>,
}
