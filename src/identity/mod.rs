//! # Identity Stores
//!
//! The three per-role identity collections (coach, player, parent) are consumed through
//! the `IdentityStore` port. The stores do not share a user table and their id spaces may
//! overlap, which is why login resolution probes them in a fixed order.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::error::{ClubError, ClubResult};
use crate::core::types::Role;

pub mod memory;

pub use memory::InMemoryIdentityStore;

/// Identity record as held by a store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    /// Stored and compared as plain text
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Current team; only meaningful for players
    #[serde(default)]
    pub team_id: Option<String>,
    /// Device token for push notifications
    #[serde(default)]
    pub push_token: Option<String>,
}

impl Identity {
    pub fn new<I: Into<String>, P: Into<String>>(id: I, password: P, role: Role) -> Self {
        Self {
            id: id.into(),
            password: password.into(),
            role,
            name: None,
            email: None,
            team_id: None,
            push_token: None,
        }
    }

    pub fn with_team<T: Into<String>>(mut self, team_id: T) -> Self {
        self.team_id = Some(team_id.into());
        self
    }

    /// Plain equality against the stored password
    pub fn password_matches(&self, password: &str) -> bool {
        self.password == password
    }
}

/// Lookup port for one identity kind
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Role of every identity held by this store
    fn role(&self) -> Role;

    /// Look up an identity; a miss is `Ok(None)`, not an error
    async fn find_by_id(&self, id: &str) -> ClubResult<Option<Identity>>;

    /// Insert or replace an identity
    async fn save(&self, identity: Identity) -> ClubResult<()>;

    /// Insert an identity only if its id is not taken yet
    ///
    /// Fails with `ClubError::IdentityExists` on a collision. The default falls back to
    /// lookup-then-save; stores that can insert atomically should override it.
    async fn create(&self, identity: Identity) -> ClubResult<()> {
        if self.find_by_id(&identity.id).await?.is_some() {
            return Err(ClubError::IdentityExists {
                identity_id: identity.id,
            });
        }
        self.save(identity).await
    }
}

/// The three role stores, addressable by role and iterable in resolution order
#[derive(Clone)]
pub struct IdentityStores {
    pub coaches: Arc<dyn IdentityStore>,
    pub players: Arc<dyn IdentityStore>,
    pub parents: Arc<dyn IdentityStore>,
}

impl IdentityStores {
    pub fn new(
        coaches: Arc<dyn IdentityStore>,
        players: Arc<dyn IdentityStore>,
        parents: Arc<dyn IdentityStore>,
    ) -> Self {
        Self {
            coaches,
            players,
            parents,
        }
    }

    /// Fresh, empty in-memory stores
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryIdentityStore::new(Role::Coach)),
            Arc::new(InMemoryIdentityStore::new(Role::Player)),
            Arc::new(InMemoryIdentityStore::new(Role::Parent)),
        )
    }

    pub fn for_role(&self, role: Role) -> &Arc<dyn IdentityStore> {
        match role {
            Role::Coach => &self.coaches,
            Role::Player => &self.players,
            Role::Parent => &self.parents,
        }
    }

    /// Stores in resolution priority order: coach, player, parent
    pub fn in_priority_order(&self) -> [&Arc<dyn IdentityStore>; 3] {
        Role::PRIORITY.map(|role| self.for_role(role))
    }
}

impl std::fmt::Debug for IdentityStores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityStores")
            .field("coaches", &self.coaches.role())
            .field("players", &self.players.role())
            .field("parents", &self.parents.role())
            .finish()
    }
}
