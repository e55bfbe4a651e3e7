//! Generation handler contract.
//!
//! A handler produces the complete text of one configuration artifact. It is
//! bound to its `(resource, filename)` pair when resolved; the only inputs it
//! receives at run time are the read-only data session and the request
//! arguments, both carried by [`GenerationContext`].

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use thiserror::Error;

use crate::application::repos::{ReadSession, RepoError};
use crate::domain::keys::HandlerKey;
use crate::infra::templates::TemplateError;

pub type HandlerResult = Result<Option<String>, HandlerError>;

/// Shared handle to a resolved handler.
pub type ResolvedHandler = Arc<dyn Handler>;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("template rendering failed: {0}")]
    Template(String),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl HandlerError {
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData(message.into())
    }
}

impl From<askama::Error> for HandlerError {
    fn from(err: askama::Error) -> Self {
        Self::Template(err.to_string())
    }
}

impl From<TemplateError> for HandlerError {
    fn from(err: TemplateError) -> Self {
        Self::Template(err.to_string())
    }
}

#[async_trait]
pub trait Handler: Send + Sync {
    /// Produce the artifact text. `Ok(None)` and `Ok(Some(""))` both mean
    /// nothing was produced.
    async fn generate(&self, ctx: &mut GenerationContext) -> HandlerResult;
}

/// Run-time inputs of a single generation.
pub struct GenerationContext {
    key: HandlerKey,
    args: Vec<String>,
    session: Box<dyn ReadSession>,
}

impl GenerationContext {
    pub fn new(key: HandlerKey, args: Vec<String>, session: Box<dyn ReadSession>) -> Self {
        Self { key, args, session }
    }

    pub fn key(&self) -> &HandlerKey {
        &self.key
    }

    /// Request arguments other than the control tokens.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn session(&mut self) -> &mut dyn ReadSession {
        self.session.as_mut()
    }

    pub fn into_session(self) -> Box<dyn ReadSession> {
        self.session
    }
}

/// Signature of a frontend method.
pub type MethodFn = for<'a> fn(&'a mut GenerationContext) -> BoxFuture<'a, HandlerResult>;

/// Handler backed by a plain function, used for frontend method tables.
pub struct MethodHandler {
    method: MethodFn,
}

impl MethodHandler {
    pub fn new(method: MethodFn) -> Self {
        Self { method }
    }
}

#[async_trait]
impl Handler for MethodHandler {
    async fn generate(&self, ctx: &mut GenerationContext) -> HandlerResult {
        (self.method)(ctx).await
    }
}

/// Handler backed by a synchronous closure over the request arguments.
pub struct FnHandler<F> {
    func: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&[String]) -> HandlerResult + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> Handler for FnHandler<F>
where
    F: Fn(&[String]) -> HandlerResult + Send + Sync,
{
    async fn generate(&self, ctx: &mut GenerationContext) -> HandlerResult {
        (self.func)(ctx.args())
    }
}
