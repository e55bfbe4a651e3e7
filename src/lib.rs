//! confgend: renders PBX configuration files on request.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
