//! Cross-site grants of a site-application.
//!
//! `/site/{s}/application/{a}/grants` holds one `<grant site="…">` entry per
//! site with a boolean text, stating whether that site may use the
//! application of site `s`.

use crate::Client;
use crate::entity::{Entity, Parent};
use crate::error::{Error, Result};
use crate::kind::ResourceKind;
use reconcile::{Document, Outcome};

fn is_true(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case("true")
}

/// Grants of one application on one site.
#[derive(Debug, Clone)]
pub struct Grants<'c> {
    entity: Entity<'c>,
}

impl<'c> Grants<'c> {
    pub fn new(client: &'c Client, site: &str, application: &str) -> Self {
        let parents = vec![Parent::site(site), Parent::application(application)];
        Self {
            entity: Entity::new(client, ResourceKind::Grants, None, parents),
        }
    }

    pub fn entity(&self) -> &Entity<'c> {
        &self.entity
    }

    pub fn entity_mut(&mut self) -> &mut Entity<'c> {
        &mut self.entity
    }

    /// Every grant as `(site, granted)`, in document order.
    pub fn read(&mut self) -> Result<Vec<(String, bool)>> {
        let document = self.entity.read()?;
        Ok(document
            .root
            .children_named("grant")
            .filter_map(|g| g.attribute("site").map(|s| (s.to_string(), is_true(&g.text))))
            .collect())
    }

    /// Whether `site` is granted, `None` when it has no entry.
    pub fn get(&mut self, site: &str) -> Result<Option<bool>> {
        Ok(self
            .read()?
            .into_iter()
            .find(|(s, _)| s == site)
            .map(|(_, granted)| granted))
    }

    /// The document with `desired` applied, and whether anything changed.
    fn apply(&mut self, desired: &[(&str, bool)]) -> Result<(Document, bool)> {
        let mut document = self.entity.read()?.clone();
        let mut changed = false;
        for (site, granted) in desired {
            let entry = document
                .root
                .children
                .iter_mut()
                .find(|g| g.name == "grant" && g.attribute("site") == Some(*site))
                .ok_or_else(|| {
                    Error::rule(format!("site({site}) is not a grant target of {}", self.entity))
                })?;
            if is_true(&entry.text) != *granted {
                log::debug!("grant {site}: {} -> {granted}", entry.text);
                entry.text = granted.to_string();
                changed = true;
            }
        }
        Ok((document, changed))
    }

    /// Whether applying `desired` would change any grant.
    pub fn is_update_needed(&mut self, desired: &[(&str, bool)]) -> Result<bool> {
        Ok(self.apply(desired)?.1)
    }

    /// Set the given grants, leaving every other entry alone.
    pub fn update(&mut self, desired: &[(&str, bool)]) -> Result<Outcome> {
        let (document, changed) = self.apply(desired)?;
        if !changed {
            log::warn!("No update needed for {}", self.entity);
            return Ok(Outcome::NoChange);
        }
        self.entity.push(&document)?;
        log::info!("Updated {}", self.entity);
        Ok(Outcome::Modified)
    }

    /// Set one grant.
    pub fn update_grant(&mut self, site: &str, granted: bool) -> Result<Outcome> {
        self.update(&[(site, granted)])
    }
}
