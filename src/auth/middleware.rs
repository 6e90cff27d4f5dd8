//! # Authentication Middleware
//!
//! This module contains the authentication gateway that runs once per inbound request.
//! It never rejects a request itself: it either binds a `Principal` to the request
//! extensions or leaves the request anonymous, and then always hands the request to the
//! next stage. Rejecting anonymous access to protected routes is the access policy's job.
//!
//! Per-request flow:
//! - public path → skip
//! - no `Authorization: Bearer ...` header → skip
//! - token fails verification, or carries an empty subject or role → skip
//! - principal already bound → keep the existing one
//! - otherwise → bind `Principal { identity_id, role, authority }`
//!
//! ## Rust Concepts Used
//!
//! - `tower::Layer` / `tower::Service` to wrap any inner service
//! - `Pin<Box<dyn Future>>` for the boxed response future
//! - `http::Extensions` as the request-scoped principal slot

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, Extensions, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::debug;

use crate::auth::policy::AccessPolicy;
use crate::auth::token::{TokenCodec, TokenError};
use crate::core::types::Principal;

/// What a single gateway pass did with a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayOutcome {
    /// Path is public; no token inspection happened
    Exempt,
    /// No bearer credentials on the request
    MissingCredentials,
    /// Credentials present but not trusted
    Unverified,
    /// A principal was already bound; nothing changed
    AlreadyAuthenticated,
    /// A new principal was bound
    Attached,
}

/// Authentication gateway that handles token extraction and principal binding
#[derive(Debug, Clone)]
pub struct AuthenticationGateway {
    codec: Arc<TokenCodec>,
    policy: Arc<AccessPolicy>,
    scheme: String,
}

impl AuthenticationGateway {
    pub fn new(codec: Arc<TokenCodec>, policy: Arc<AccessPolicy>) -> Self {
        Self {
            codec,
            policy,
            scheme: "Bearer".to_string(),
        }
    }

    /// Use a different authorization scheme word
    pub fn with_scheme<S: Into<String>>(mut self, scheme: S) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Extract the bearer token from request headers
    ///
    /// The scheme is matched case-insensitively and every whitespace character is removed
    /// from the remaining value.
    pub fn extract_token(&self, headers: &HeaderMap) -> Option<String> {
        let header_value = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())?;

        let scheme = header_value.get(..self.scheme.len())?;
        if !scheme.eq_ignore_ascii_case(&self.scheme) {
            return None;
        }

        let rest = &header_value[self.scheme.len()..];
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }

        Some(rest.chars().filter(|c| !c.is_whitespace()).collect())
    }

    /// Turn a token into a principal
    ///
    /// `Ok(None)` means the token parsed but does not identify anyone usable.
    fn verify_token(&self, token: &str) -> Result<Option<Principal>, TokenError> {
        let claims = self.codec.parse_claims(token)?;

        if claims.sub.is_empty() || claims.role.is_empty() {
            return Ok(None);
        }

        if !self.codec.validate(token, &claims.sub) {
            return Ok(None);
        }

        Ok(Some(Principal::new(claims.sub, claims.role)))
    }

    /// Run one gateway pass over a request's path, headers and extensions
    pub fn process(&self, path: &str, headers: &HeaderMap, extensions: &mut Extensions) -> GatewayOutcome {
        if self.policy.is_public(path) {
            return GatewayOutcome::Exempt;
        }

        let Some(token) = self.extract_token(headers) else {
            debug!(path = %path, "No bearer credentials");
            return GatewayOutcome::MissingCredentials;
        };

        let principal = match self.verify_token(&token) {
            Ok(Some(principal)) => principal,
            Ok(None) => {
                debug!(path = %path, "Token carries no usable identity");
                return GatewayOutcome::Unverified;
            }
            Err(err) => {
                // Parse details stay here; the caller just continues anonymously.
                debug!(path = %path, reason = %err, "Token rejected");
                return GatewayOutcome::Unverified;
            }
        };

        if extensions.get::<Principal>().is_some() {
            return GatewayOutcome::AlreadyAuthenticated;
        }

        debug!(identity_id = %principal.identity_id, authority = %principal.authority, "Principal bound");
        extensions.insert(principal);
        GatewayOutcome::Attached
    }

    /// Run the gateway over a full request
    pub fn authenticate(&self, request: Request) -> (Request, GatewayOutcome) {
        let (mut parts, body) = request.into_parts();
        let outcome = self.process(parts.uri.path(), &parts.headers, &mut parts.extensions);
        (Request::from_parts(parts, body), outcome)
    }
}

/// Axum `from_fn_with_state` form of the gateway, for routers assembled by hand
pub async fn authenticate_request(
    State(gateway): State<Arc<AuthenticationGateway>>,
    request: Request,
    next: Next,
) -> Response {
    let (request, _) = gateway.authenticate(request);
    next.run(request).await
}

/// Tower layer installing the authentication gateway
#[derive(Clone)]
pub struct AuthLayer {
    gateway: Arc<AuthenticationGateway>,
}

impl AuthLayer {
    pub fn new(gateway: Arc<AuthenticationGateway>) -> Self {
        Self { gateway }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            inner,
            gateway: self.gateway.clone(),
        }
    }
}

/// Tower service running the gateway before the inner service
#[derive(Clone)]
pub struct AuthService<S> {
    inner: S,
    gateway: Arc<AuthenticationGateway>,
}

impl<S> Service<Request> for AuthService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let (request, _) = self.gateway.authenticate(request);

        // Take the service that was driven to readiness and leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move { inner.call(request).await })
    }
}

/// Utility functions for reading the bound principal from requests
pub mod utils {
    use axum::extract::Request;

    use crate::core::types::Principal;

    pub fn get_principal(request: &Request) -> Option<&Principal> {
        request.extensions().get::<Principal>()
    }

    pub fn is_authenticated(request: &Request) -> bool {
        get_principal(request).is_some()
    }

    pub fn has_authority(request: &Request, authority: &str) -> bool {
        get_principal(request)
            .map(|principal| principal.has_authority(authority))
            .unwrap_or(false)
    }
}
