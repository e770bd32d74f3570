//! Subjects (users and user groups).

use crate::Client;
use crate::entity::{Entity, UpdateCheck};
use crate::error::Result;
use crate::kind::ResourceKind;
use reconcile::{DesiredState, Document, Outcome};

/// Prefix of digests the platform stores.
const HASH_PREFIX: &str = "$2a$";

/// A platform subject.
#[derive(Debug, Clone)]
pub struct Subject<'c> {
    entity: Entity<'c>,
}

impl<'c> Subject<'c> {
    pub fn new(client: &'c Client, name: &str) -> Self {
        Self {
            entity: Entity::new(client, ResourceKind::Subject, Some(name), vec![]),
        }
    }

    pub fn entity(&self) -> &Entity<'c> {
        &self.entity
    }

    pub fn entity_mut(&mut self) -> &mut Entity<'c> {
        &mut self.entity
    }

    /// Replace a plaintext digest matching the stored hash with that hash.
    fn with_stored_digest(&mut self, desired: &DesiredState) -> Result<DesiredState> {
        let Some(plain) = desired.text("digest").filter(|d| !d.starts_with(HASH_PREFIX)) else {
            return Ok(desired.clone());
        };
        let stored = self.entity.read()?.field("digest").unwrap_or_default().to_string();
        if stored.is_empty() || !self.entity.client().hasher().verify(&plain, &stored) {
            return Ok(desired.clone());
        }
        log::debug!("{}: password unchanged, keeping stored digest", self.entity);
        Ok(desired.clone().set("digest", stored))
    }

    pub fn create(&mut self, desired: &DesiredState) -> Result<&Document> {
        self.entity.create(desired)
    }

    pub fn is_update_needed(&mut self, desired: &DesiredState) -> Result<UpdateCheck> {
        let desired = self.with_stored_digest(desired)?;
        self.entity.is_update_needed(&desired)
    }

    pub fn update(&mut self, desired: &DesiredState) -> Result<Outcome> {
        let desired = self.with_stored_digest(desired)?;
        self.entity.update(&desired)
    }

    pub fn delete(&mut self) -> Result<()> {
        self.entity.delete()
    }
}
