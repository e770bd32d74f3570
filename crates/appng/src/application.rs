//! Applications and their site assignments.
//!
//! An application is assigned to a site by posting its document below the
//! site. Deleting an application that is still assigned anywhere is refused
//! before any request is made.

use crate::Client;
use crate::backend::Method;
use crate::entity::{Entity, Parent, address_of};
use crate::error::{Error, Result};
use crate::kind::ResourceKind;
use reconcile::{Address, Document, Outcome};

/// Sites the application is assigned to.
pub(crate) fn assigned_sites(client: &Client, application: &str) -> Result<Vec<String>> {
    let mut assigned = Vec::new();
    for site in client.collection(ResourceKind::Site, vec![]).names()? {
        if is_assigned_to(client, application, &site)? {
            assigned.push(site);
        }
    }
    Ok(assigned)
}

/// Fail when the application is assigned to any site.
pub(crate) fn ensure_unassigned(client: &Client, application: &str) -> Result<()> {
    let sites = assigned_sites(client, application)?;
    if sites.is_empty() {
        return Ok(());
    }
    Err(Error::rule(format!(
        "application({application}) is still assigned to site(s) {}, deassign it first",
        sites.join(", ")
    )))
}

fn site_address(application: &str, site: &str) -> Address {
    address_of(&[Parent::site(site)], ResourceKind::Application, Some(application))
}

fn is_assigned_to(client: &Client, application: &str, site: &str) -> Result<bool> {
    match client.fetch(site_address(application, site).own()) {
        Ok(_) => Ok(true),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e),
    }
}

/// An installed application.
#[derive(Debug, Clone)]
pub struct Application<'c> {
    entity: Entity<'c>,
}

impl<'c> Application<'c> {
    pub fn new(client: &'c Client, name: &str) -> Self {
        Self {
            entity: Entity::new(client, ResourceKind::Application, Some(name), vec![]),
        }
    }

    pub fn entity(&self) -> &Entity<'c> {
        &self.entity
    }

    pub fn entity_mut(&mut self) -> &mut Entity<'c> {
        &mut self.entity
    }

    pub fn name(&self) -> &str {
        self.entity.name().unwrap_or_default()
    }

    fn client(&self) -> &'c Client {
        self.entity.client()
    }

    fn require_installed(&mut self) -> Result<()> {
        if self.entity.exists()? {
            Ok(())
        } else {
            Err(Error::rule(format!("{} is not installed", self.entity)))
        }
    }

    fn require_site(&self, site: &str) -> Result<()> {
        let mut entity = self.client().entity(ResourceKind::Site, Some(site), vec![]);
        if entity.exists()? {
            Ok(())
        } else {
            Err(Error::rule(format!("site({site}) does not exist")))
        }
    }

    /// Whether the application is assigned to `site`.
    pub fn is_assigned(&self, site: &str) -> Result<bool> {
        is_assigned_to(self.client(), self.name(), site)
    }

    /// Every site the application is assigned to.
    pub fn assigned_sites(&self) -> Result<Vec<String>> {
        assigned_sites(self.client(), self.name())
    }

    /// Assign the application to a site.
    ///
    /// The application and the site must exist and the application must not
    /// be assigned yet.
    pub fn assign(&mut self, site: &str) -> Result<Document> {
        self.require_installed()?;
        self.require_site(site)?;
        if self.is_assigned(site)? {
            return Err(Error::rule(format!(
                "{} is already assigned to site({site})",
                self.entity
            )));
        }
        let document = self.entity.read()?.clone();
        let address = site_address(self.name(), site);
        let response = self
            .client()
            .send(Method::Post, address.ancestor(), Some(&document))?;
        log::info!("Assigned {} to site({site})", self.entity);
        Ok(response.unwrap_or(document))
    }

    /// Remove the application from a site.
    pub fn deassign(&mut self, site: &str) -> Result<()> {
        self.require_installed()?;
        self.require_site(site)?;
        if !self.is_assigned(site)? {
            return Err(Error::rule(format!(
                "{} is not assigned to site({site})",
                self.entity
            )));
        }
        let address = site_address(self.name(), site);
        self.client().send(Method::Delete, address.own(), None)?;
        log::info!("Deassigned {} from site({site})", self.entity);
        Ok(())
    }

    /// Remove the application from every site and return those sites.
    pub fn deassign_all(&mut self) -> Result<Vec<String>> {
        self.require_installed()?;
        let sites = self.assigned_sites()?;
        for site in &sites {
            let address = site_address(self.name(), site);
            self.client().send(Method::Delete, address.own(), None)?;
            log::info!("Deassigned {} from site({site})", self.entity);
        }
        Ok(sites)
    }

    pub fn update(&mut self, desired: &reconcile::DesiredState) -> Result<Outcome> {
        self.entity.update(desired)
    }

    /// Delete the application. Refused while it is assigned to a site.
    pub fn delete(&mut self) -> Result<()> {
        self.entity.delete()
    }
}
