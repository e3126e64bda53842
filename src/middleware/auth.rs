//! Bearer-token authentication middleware.
//!
//! Validates the `Authorization: Bearer` token on every request and injects
//! the verified identity into request extensions as [`CurrentUser`]. Paths
//! on the skip list (login, health) pass through unauthenticated.

use crate::auth::JwtAuth;
use crate::error::GateError;
use axum::{
    body::Body,
    extract::{FromRequestParts, Request},
    http::{header, request::Parts},
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::debug;

// ═══════════════════════════════════════════════════════════════════════════════
// Current User (extracted in handlers)
// ═══════════════════════════════════════════════════════════════════════════════

/// The authenticated subject id, injected by [`AuthLayer`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub String);

impl CurrentUser {
    pub fn id(&self) -> &str {
        &self.0
    }
}

/// Axum extractor for `CurrentUser`.
#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| GateError::invalid_token().into_response())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tower Layer
// ═══════════════════════════════════════════════════════════════════════════════

/// Layer wrapping services with bearer-token authentication.
#[derive(Clone)]
pub struct AuthLayer {
    auth: Arc<JwtAuth>,
    skip_prefixes: Arc<Vec<String>>,
}

impl AuthLayer {
    pub fn new(auth: Arc<JwtAuth>) -> Self {
        Self {
            auth,
            skip_prefixes: Arc::new(Vec::new()),
        }
    }

    /// Paths whose prefix matches any entry bypass authentication.
    pub fn skip_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.skip_prefixes = Arc::new(prefixes);
        self
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            inner,
            auth: self.auth.clone(),
            skip_prefixes: self.skip_prefixes.clone(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tower Service
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct AuthService<S> {
    inner: S,
    auth: Arc<JwtAuth>,
    skip_prefixes: Arc<Vec<String>>,
}

impl<S> Service<Request<Body>> for AuthService<S>
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

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        let auth = self.auth.clone();
        let skip_prefixes = self.skip_prefixes.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let path = request.uri().path().to_string();
            if skip_prefixes.iter().any(|prefix| path.starts_with(prefix)) {
                return inner.call(request).await;
            }

            let token = match bearer_token(&request) {
                Some(token) => token,
                None => {
                    debug!(path = %path, "missing bearer token");
                    return Ok(GateError::invalid_token().into_response());
                }
            };

            match auth.parse_user_id(&token).await {
                Ok(user_id) => {
                    request.extensions_mut().insert(CurrentUser(user_id));
                    inner.call(request).await
                }
                Err(error) => Ok(error.into_response()),
            }
        })
    }
}

fn bearer_token(request: &Request<Body>) -> Option<String> {
    let value = request.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request as HttpRequest;

    fn request_with_auth(value: Option<&str>) -> Request<Body> {
        let mut builder = HttpRequest::builder().uri("/api/v1/users");
        if let Some(value) = value {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_bearer_token_extraction() {
        let request = request_with_auth(Some("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&request).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_bearer_token_missing_or_malformed() {
        assert!(bearer_token(&request_with_auth(None)).is_none());
        assert!(bearer_token(&request_with_auth(Some("Basic xyz"))).is_none());
        assert!(bearer_token(&request_with_auth(Some("Bearer "))).is_none());
    }
}
