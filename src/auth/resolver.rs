//! # Identity Resolver
//!
//! Login requests carry a bare identifier and password with no claimed role. The
//! resolver decides which identity kind they belong to by probing the coach, player and
//! parent stores in that order and taking the first store whose record matches.
//!
//! The order matters: the three id spaces are not guaranteed disjoint, so an id present
//! in two stores always resolves to the higher-priority role (coach > player > parent).
//!
//! A store failure stops the probe immediately and surfaces as
//! `ClubError::ResolverUnavailable`, which is distinct from the
//! `ClubError::InvalidCredentials` returned when every store cleanly misses.

use std::sync::Arc;
use tracing::{debug, error, info};

use crate::auth::token::TokenCodec;
use crate::core::error::{ClubError, ClubResult};
use crate::core::types::{LoginResponse, Role};
use crate::identity::{Identity, IdentityStore, IdentityStores};

/// Outcome of a successful login resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginResult {
    pub role: Role,
    pub identity_id: String,
    pub token: String,
    /// Present only for players assigned to a team
    pub team_id: Option<String>,
}

impl From<LoginResult> for LoginResponse {
    fn from(result: LoginResult) -> Self {
        Self {
            role: result.role.as_str().to_string(),
            identity_id: result.identity_id,
            token: result.token,
            team_id: result.team_id,
        }
    }
}

/// Resolves login attempts and push-token registrations across the identity stores
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    stores: IdentityStores,
    codec: Arc<TokenCodec>,
}

impl IdentityResolver {
    pub fn new(stores: IdentityStores, codec: Arc<TokenCodec>) -> Self {
        Self { stores, codec }
    }

    /// Resolve an identifier/password pair and issue a token for the matched identity
    pub async fn resolve(&self, identifier: &str, password: &str) -> ClubResult<LoginResult> {
        let identity = self.find_matching(identifier, password).await?;

        let team_id = match identity.role {
            Role::Player => identity.team_id.clone(),
            _ => None,
        };

        let token = self
            .codec
            .generate(&identity.id, identity.role.as_str())
            .map_err(|e| ClubError::internal(format!("Failed to issue token: {}", e)))?;

        info!(identity_id = %identity.id, role = %identity.role, "Login resolved");

        Ok(LoginResult {
            role: identity.role,
            identity_id: identity.id,
            token,
            team_id,
        })
    }

    /// Record a push-notification token on the first store holding `identity_id`
    ///
    /// Returns the role of the store that was updated.
    pub async fn attach_push_token(&self, identity_id: &str, push_token: &str) -> ClubResult<Role> {
        for store in self.stores.in_priority_order() {
            let Some(mut identity) = lookup(store.as_ref(), identity_id).await? else {
                continue;
            };

            identity.push_token = Some(push_token.to_string());
            store.save(identity).await.map_err(|e| {
                error!(store = %store.role(), error = %e, "Failed to save push token");
                ClubError::resolver_unavailable(store.role().as_str(), &e)
            })?;

            info!(identity_id = %identity_id, role = %store.role(), "Push token attached");
            return Ok(store.role());
        }

        debug!(identity_id = %identity_id, "Push token attach found no identity");
        Err(ClubError::identity_not_found(identity_id))
    }

    /// First-match-wins probe in coach, player, parent order
    async fn find_matching(&self, identifier: &str, password: &str) -> ClubResult<Identity> {
        for store in self.stores.in_priority_order() {
            match lookup(store.as_ref(), identifier).await? {
                Some(mut identity) if identity.password_matches(password) => {
                    // The store decides the role, not the record.
                    identity.role = store.role();
                    return Ok(identity);
                }
                Some(_) => debug!(store = %store.role(), "Identifier found but password differs"),
                None => {}
            }
        }

        debug!("Login identifier matched no identity store");
        Err(ClubError::InvalidCredentials)
    }
}

async fn lookup(store: &dyn IdentityStore, id: &str) -> ClubResult<Option<Identity>> {
    store.find_by_id(id).await.map_err(|e| {
        error!(store = %store.role(), error = %e, "Identity store lookup failed");
        ClubError::resolver_unavailable(store.role().as_str(), &e)
    })
}
