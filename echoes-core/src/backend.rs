//! Text-generation backend seam.
//!
//! The generators talk to a [`ChatBackend`] rather than a concrete HTTP
//! client so that scripted backends can stand in during tests.

use async_trait::async_trait;
use openrouter::{OpenRouter, Request, Response};

/// A chat-completion capable backend.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, request: Request) -> Result<Response, openrouter::Error>;
}

#[async_trait]
impl ChatBackend for OpenRouter {
    async fn complete(&self, request: Request) -> Result<Response, openrouter::Error> {
        OpenRouter::complete(self, request).await
    }
}

/// Stand-in for a backend whose credentials were never configured.
///
/// Every call fails with [`openrouter::Error::NoApiKey`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Unconfigured;

#[async_trait]
impl ChatBackend for Unconfigured {
    async fn complete(&self, _request: Request) -> Result<Response, openrouter::Error> {
        Err(openrouter::Error::NoApiKey)
    }
}
