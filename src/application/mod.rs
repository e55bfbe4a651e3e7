//! Application services: the generation pipeline and its collaborators.

pub mod builder;
pub mod error;
pub mod events;
pub mod frontends;
pub mod generate;
pub mod handler;
pub mod plugins;
pub mod repos;
pub mod resolve;
