//! # Access Policy
//!
//! Static table classifying routes as public or protected. It is built once at startup
//! from the configured public routes and never changes afterwards.
//!
//! Pattern syntax:
//! - `/api/login` matches that exact path
//! - `/uploads/**` matches `/uploads` and everything below it
//! - `/public/*` matches exactly one segment below `/public/`
//!
//! Anything not matched by a rule requires a bound principal.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

use crate::auth::middleware::utils::get_principal;
use crate::core::config::{AccessConfig, DEFAULT_PUBLIC_ROUTES};
use crate::core::error::{ClubError, ClubResult};
use crate::core::types::Principal;

/// Compiled route pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutePattern {
    Exact(String),
    /// `/base/**`
    Subtree(String),
    /// `/base/*`
    Segment(String),
}

impl RoutePattern {
    pub fn parse(pattern: &str) -> ClubResult<Self> {
        if !pattern.starts_with('/') {
            return Err(ClubError::config(format!(
                "Route pattern '{}' must start with '/'",
                pattern
            )));
        }

        if let Some(base) = pattern.strip_suffix("/**") {
            Ok(Self::Subtree(base.to_string()))
        } else if let Some(base) = pattern.strip_suffix("/*") {
            Ok(Self::Segment(base.to_string()))
        } else if pattern.contains('*') {
            Err(ClubError::config(format!(
                "Wildcards are only supported as a trailing '/*' or '/**' in '{}'",
                pattern
            )))
        } else {
            Ok(Self::Exact(pattern.to_string()))
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(exact) => path == exact,
            Self::Subtree(base) => {
                path == base
                    || path
                        .strip_prefix(base.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
            Self::Segment(base) => path
                .strip_prefix(base.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
                .is_some_and(|segment| !segment.is_empty() && !segment.contains('/')),
        }
    }
}

/// One entry of the access table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRule {
    pub pattern: RoutePattern,
    pub requires_auth: bool,
}

/// Route classification consulted before any handler runs
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    rules: Vec<AccessRule>,
}

impl AccessPolicy {
    /// Build a policy from explicit rules; the first matching rule wins
    pub fn from_rules(rules: Vec<AccessRule>) -> Self {
        Self { rules }
    }

    /// Build a policy where the given patterns are public and everything else is protected
    pub fn from_public_routes<I, S>(routes: I) -> ClubResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = routes
            .into_iter()
            .map(|route| {
                Ok(AccessRule {
                    pattern: RoutePattern::parse(route.as_ref())?,
                    requires_auth: false,
                })
            })
            .collect::<ClubResult<Vec<_>>>()?;

        Ok(Self::from_rules(rules))
    }

    pub fn from_config(config: &AccessConfig) -> ClubResult<Self> {
        Self::from_public_routes(&config.public_routes)
    }

    pub fn requires_auth(&self, path: &str) -> bool {
        self.rules
            .iter()
            .find(|rule| rule.pattern.matches(path))
            .map_or(true, |rule| rule.requires_auth)
    }

    pub fn is_public(&self, path: &str) -> bool {
        !self.requires_auth(path)
    }

    /// Reject protected paths that have no bound principal
    pub fn check(&self, path: &str, principal: Option<&Principal>) -> ClubResult<()> {
        if principal.is_none() && self.requires_auth(path) {
            return Err(ClubError::unauthenticated(path));
        }
        Ok(())
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        let rules = DEFAULT_PUBLIC_ROUTES
            .iter()
            .filter_map(|route| RoutePattern::parse(route).ok())
            .map(|pattern| AccessRule {
                pattern,
                requires_auth: false,
            })
            .collect();
        Self::from_rules(rules)
    }
}

/// Axum middleware enforcing the access policy
///
/// Must run inside the authentication gateway so the principal is already bound.
pub async fn enforce_access_policy(
    State(policy): State<Arc<AccessPolicy>>,
    request: Request,
    next: Next,
) -> Result<Response, ClubError> {
    let path = request.uri().path();

    if let Err(err) = policy.check(path, get_principal(&request)) {
        warn!(path = %path, method = %request.method(), "Rejected unauthenticated request");
        return Err(err);
    }

    Ok(next.run(request).await)
}
