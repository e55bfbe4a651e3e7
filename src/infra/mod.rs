//! Infrastructure adapters and runtime bootstrap.

pub mod db;
pub mod error;
pub mod line;
pub mod telemetry;
pub mod templates;
