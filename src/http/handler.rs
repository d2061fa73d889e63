//! The request handler boundary.
//!
//! A handler turns one parsed [`Request`] into one [`Response`]. Errors and
//! panics never escape to the connection: the server coerces both into a 500
//! with the standard JSON error body.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::http::request::Request;
use crate::http::response::Response;

/// Error type a handler may return instead of a response.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn handle(&self, request: Request) -> Result<Response, HandlerError>;
}

#[async_trait]
impl<H> Handler for Arc<H>
where
    H: Handler + ?Sized,
{
    async fn handle(&self, request: Request) -> Result<Response, HandlerError> {
        (**self).handle(request).await
    }
}

/// Adapter turning an async closure into a [`Handler`].
pub struct HandlerFn<F> {
    f: F,
}

/// Build a handler from `f`.
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, HandlerError>> + Send + 'static,
{
    HandlerFn { f }
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, HandlerError>> + Send + 'static,
{
    async fn handle(&self, request: Request) -> Result<Response, HandlerError> {
        (self.f)(request).await
    }
}

/// Runs HEAD requests through the inner handler as GET.
///
/// The resulting body is left in place so `Content-Length` reports the GET
/// size; the writer drops the body because the request on the wire was HEAD.
pub struct HeadAsGet<H> {
    inner: H,
}

impl<H> HeadAsGet<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<H: Handler> Handler for HeadAsGet<H> {
    async fn handle(&self, request: Request) -> Result<Response, HandlerError> {
        if request.is_head() {
            self.inner.handle(request.with_method("GET")).await
        } else {
            self.inner.handle(request).await
        }
    }
}
