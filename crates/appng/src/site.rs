//! Sites and the platform singleton.

use crate::Client;
use crate::backend::Method;
use crate::entity::{Entity, Parent};
use crate::error::Result;
use crate::kind::ResourceKind;

/// A site.
#[derive(Debug, Clone)]
pub struct Site<'c> {
    entity: Entity<'c>,
}

impl<'c> Site<'c> {
    pub fn new(client: &'c Client, name: &str) -> Self {
        Self {
            entity: Entity::new(client, ResourceKind::Site, Some(name), vec![]),
        }
    }

    pub fn entity(&self) -> &Entity<'c> {
        &self.entity
    }

    pub fn entity_mut(&mut self) -> &mut Entity<'c> {
        &mut self.entity
    }

    /// Reload the site. Returns false when it does not exist.
    pub fn reload(&mut self) -> Result<bool> {
        if !self.entity.exists()? {
            log::warn!("Not reloading {}, it does not exist", self.entity);
            return Ok(false);
        }
        let path = self.entity.address().join("reload");
        self.entity.client().send(Method::Put, &path, None)?;
        log::info!("Reloaded {}", self.entity);
        Ok(true)
    }
}

/// The platform. It cannot be read, created or deleted, only reloaded and
/// used as the parent of platform properties.
#[derive(Debug, Clone, Copy)]
pub struct Platform<'c> {
    client: &'c Client,
}

impl<'c> Platform<'c> {
    pub fn new(client: &'c Client) -> Self {
        Self { client }
    }

    pub fn entity(&self) -> Entity<'c> {
        self.client.entity(ResourceKind::Platform, None, vec![])
    }

    /// Parent reference for resources below the platform.
    pub fn parent(&self) -> Parent {
        Parent::platform()
    }

    pub fn reload(&self) -> Result<()> {
        let path = self.entity().address().join("reload");
        self.client.send(Method::Post, &path, None)?;
        log::info!("Reloaded platform");
        Ok(())
    }
}
