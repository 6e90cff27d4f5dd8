//! In-memory identity store backed by `DashMap`.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{Identity, IdentityStore};
use crate::core::error::{ClubError, ClubResult};
use crate::core::types::Role;

/// Identity store that lives for the lifetime of the process
#[derive(Debug)]
pub struct InMemoryIdentityStore {
    role: Role,
    identities: DashMap<String, Identity>,
}

impl InMemoryIdentityStore {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            identities: DashMap::new(),
        }
    }

    /// Build a store pre-populated with identities
    pub fn with_identities<I>(role: Role, identities: I) -> ClubResult<Self>
    where
        I: IntoIterator<Item = Identity>,
    {
        let store = Self::new(role);
        for identity in identities {
            store.insert(identity)?;
        }
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    fn check_role(&self, identity: &Identity) -> ClubResult<()> {
        if identity.role != self.role {
            return Err(ClubError::validation(
                "role",
                format!("{} store cannot hold a {} identity", self.role, identity.role),
            ));
        }
        Ok(())
    }

    fn insert(&self, identity: Identity) -> ClubResult<()> {
        self.check_role(&identity)?;
        self.identities.insert(identity.id.clone(), identity);
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    fn role(&self) -> Role {
        self.role
    }

    async fn find_by_id(&self, id: &str) -> ClubResult<Option<Identity>> {
        Ok(self.identities.get(id).map(|entry| entry.value().clone()))
    }

    async fn save(&self, identity: Identity) -> ClubResult<()> {
        self.insert(identity)
    }

    async fn create(&self, identity: Identity) -> ClubResult<()> {
        self.check_role(&identity)?;
        // The entry guard holds the shard lock, so check and insert are one step.
        match self.identities.entry(identity.id.clone()) {
            Entry::Occupied(_) => Err(ClubError::IdentityExists {
                identity_id: identity.id,
            }),
            Entry::Vacant(slot) => {
                slot.insert(identity);
                Ok(())
            }
        }
    }
}
