//! Permission-enforcement middleware.
//!
//! Sits behind [`AuthLayer`](crate::middleware::auth::AuthLayer) and gates
//! each request through `PolicyEngine::enforce(subject, path, method)`.

use crate::error::GateError;
use crate::middleware::auth::CurrentUser;
use crate::policy::PolicyEngine;
use axum::{
    body::Body,
    extract::Request,
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::warn;

/// Layer wrapping services with policy enforcement.
#[derive(Clone)]
pub struct EnforceLayer {
    engine: Arc<PolicyEngine>,
}

impl EnforceLayer {
    pub fn new(engine: Arc<PolicyEngine>) -> Self {
        Self { engine }
    }
}

impl<S> Layer<S> for EnforceLayer {
    type Service = EnforceService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        EnforceService {
            inner,
            engine: self.engine.clone(),
        }
    }
}

#[derive(Clone)]
pub struct EnforceService<S> {
    inner: S,
    engine: Arc<PolicyEngine>,
}

impl<S> Service<Request<Body>> for EnforceService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let engine = self.engine.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            // Identity must have been injected by the auth middleware.
            let user = match request.extensions().get::<CurrentUser>() {
                Some(user) => user.clone(),
                None => return Ok(GateError::invalid_token().into_response()),
            };

            let path = request.uri().path();
            let method = request.method().as_str();

            if !engine.enforce(user.id(), path, method) {
                warn!(subject = %user.id(), path = %path, method = %method, "request denied");
                return Ok(GateError::no_permission().into_response());
            }

            inner.call(request).await
        })
    }
}
