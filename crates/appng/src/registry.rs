//! Type tag to constructor registry.
//!
//! Front ends name resource types as strings (`site`, `properties`, …). The
//! registry maps each tag to its [`ResourceKind`] and a constructor, so that
//! dispatch works on a [`Resource`] without matching on tags itself.

use crate::application::Application;
use crate::database::Database;
use crate::entity::{Entity, Parent, UpdateCheck};
use crate::error::{Error, Result};
use crate::grants::Grants;
use crate::kind::{Operation, ResourceKind};
use crate::package::{Package, PackageQuery};
use crate::site::{Platform, Site};
use crate::subject::Subject;
use crate::Client;
use reconcile::{DesiredState, Document, Outcome};

/// Builds a resource of a kind from its name and parents.
pub type Constructor =
    for<'c> fn(&'c Client, ResourceKind, Option<&str>, &[Parent]) -> Result<Resource<'c>>;

/// One registered resource type.
#[derive(Debug, Clone, Copy)]
pub struct Registration {
    pub kind: ResourceKind,
    pub construct: Constructor,
}

static REGISTRY: [Registration; 12] = [
    Registration { kind: ResourceKind::Platform, construct: platform },
    Registration { kind: ResourceKind::Site, construct: site },
    Registration { kind: ResourceKind::Repository, construct: generic },
    Registration { kind: ResourceKind::Property, construct: generic },
    Registration { kind: ResourceKind::Application, construct: application },
    Registration { kind: ResourceKind::Package, construct: package },
    Registration { kind: ResourceKind::Subject, construct: subject },
    Registration { kind: ResourceKind::Group, construct: generic },
    Registration { kind: ResourceKind::Role, construct: generic },
    Registration { kind: ResourceKind::Permission, construct: generic },
    Registration { kind: ResourceKind::Database, construct: database },
    Registration { kind: ResourceKind::Grants, construct: grants },
];

/// Find the registration for a singular or plural tag, ignoring case.
pub fn lookup(tag: &str) -> Option<&'static Registration> {
    let kind = ResourceKind::from_tag(tag)?;
    REGISTRY.iter().find(|r| r.kind == kind)
}

/// Every registration, in declaration order.
pub fn registrations() -> &'static [Registration] {
    &REGISTRY
}

/// Construct a resource by tag.
pub fn construct<'c>(
    client: &'c Client,
    tag: &str,
    name: Option<&str>,
    parents: &[Parent],
) -> Result<Resource<'c>> {
    let registration =
        lookup(tag).ok_or_else(|| Error::rule(format!("unknown resource type '{tag}'")))?;
    (registration.construct)(client, registration.kind, name, parents)
}

fn required<'a>(kind: ResourceKind, name: Option<&'a str>) -> Result<&'a str> {
    name.filter(|n| !n.is_empty())
        .ok_or_else(|| Error::rule(format!("a {kind} name is required")))
}

/// Name of the parent of `kind`, required for site-application resources.
fn parent<'a>(parents: &'a [Parent], kind: ResourceKind, of: ResourceKind) -> Result<&'a str> {
    parents
        .iter()
        .find(|p| p.kind == kind)
        .and_then(|p| p.name.as_deref())
        .ok_or_else(|| Error::rule(format!("{of} needs a {kind}")))
}

fn platform<'c>(
    client: &'c Client,
    _: ResourceKind,
    _: Option<&str>,
    _: &[Parent],
) -> Result<Resource<'c>> {
    Ok(Resource::Platform(client.platform()))
}

fn site<'c>(
    client: &'c Client,
    _: ResourceKind,
    name: Option<&str>,
    _: &[Parent],
) -> Result<Resource<'c>> {
    Ok(Resource::Site(client.site(required(ResourceKind::Site, name)?)))
}

/// Below a site the application is its assignment to that site.
fn application<'c>(
    client: &'c Client,
    kind: ResourceKind,
    name: Option<&str>,
    parents: &[Parent],
) -> Result<Resource<'c>> {
    let name = required(kind, name)?;
    match parent(parents, ResourceKind::Site, kind) {
        Ok(site) => Ok(Resource::Other(client.entity(
            kind,
            Some(name),
            vec![Parent::site(site)],
        ))),
        Err(_) => Ok(Resource::Application(client.application(name))),
    }
}

fn package<'c>(
    client: &'c Client,
    _: ResourceKind,
    name: Option<&str>,
    parents: &[Parent],
) -> Result<Resource<'c>> {
    let name = required(ResourceKind::Package, name)?;
    let repository = parent(parents, ResourceKind::Repository, ResourceKind::Package).ok();
    Ok(Resource::Package(client.package(name, repository)))
}

fn subject<'c>(
    client: &'c Client,
    _: ResourceKind,
    name: Option<&str>,
    _: &[Parent],
) -> Result<Resource<'c>> {
    Ok(Resource::Subject(client.subject(required(ResourceKind::Subject, name)?)))
}

fn database<'c>(
    client: &'c Client,
    _: ResourceKind,
    _: Option<&str>,
    parents: &[Parent],
) -> Result<Resource<'c>> {
    let site = parent(parents, ResourceKind::Site, ResourceKind::Database)?;
    let application = parent(parents, ResourceKind::Application, ResourceKind::Database)?;
    Ok(Resource::Database(client.database(site, application)))
}

fn grants<'c>(
    client: &'c Client,
    _: ResourceKind,
    _: Option<&str>,
    parents: &[Parent],
) -> Result<Resource<'c>> {
    let site = parent(parents, ResourceKind::Site, ResourceKind::Grants)?;
    let application = parent(parents, ResourceKind::Application, ResourceKind::Grants)?;
    Ok(Resource::Grants(client.grants(site, application)))
}

/// Kinds without rules of their own go straight to the entity engine.
fn generic<'c>(
    client: &'c Client,
    kind: ResourceKind,
    name: Option<&str>,
    parents: &[Parent],
) -> Result<Resource<'c>> {
    Ok(Resource::Other(client.entity(kind, name, parents.to_vec())))
}

/// A constructed resource of any kind.
#[derive(Debug, Clone)]
pub enum Resource<'c> {
    Platform(Platform<'c>),
    Site(Site<'c>),
    Application(Application<'c>),
    Package(Package<'c>),
    Subject(Subject<'c>),
    Database(Database<'c>),
    Grants(Grants<'c>),
    /// Kinds served by the generic engine alone.
    Other(Entity<'c>),
}

impl<'c> Resource<'c> {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Platform(_) => ResourceKind::Platform,
            Self::Package(_) => ResourceKind::Package,
            Self::Site(r) => r.entity().kind(),
            Self::Application(r) => r.entity().kind(),
            Self::Subject(r) => r.entity().kind(),
            Self::Database(r) => r.entity().kind(),
            Self::Grants(r) => r.entity().kind(),
            Self::Other(e) => e.kind(),
        }
    }

    /// The generic entity behind this resource, if it has one.
    pub fn entity_mut(&mut self) -> Option<&mut Entity<'c>> {
        match self {
            Self::Platform(_) | Self::Package(_) => None,
            Self::Site(r) => Some(r.entity_mut()),
            Self::Application(r) => Some(r.entity_mut()),
            Self::Subject(r) => Some(r.entity_mut()),
            Self::Database(r) => Some(r.entity_mut()),
            Self::Grants(r) => Some(r.entity_mut()),
            Self::Other(e) => Some(e),
        }
    }

    fn unavailable(&self, operation: Operation) -> Error {
        Error::NotAvailable {
            operation: operation.as_str(),
            resource: self.kind().to_string(),
        }
    }

    fn require_entity(&mut self, operation: Operation) -> Result<&mut Entity<'c>> {
        let error = self.unavailable(operation);
        self.entity_mut().ok_or(error)
    }

    /// The current document. For packages, the installed variant.
    pub fn read(&mut self) -> Result<Document> {
        if let Self::Package(package) = self {
            return Ok(package.read_installed()?.document);
        }
        Ok(self.require_entity(Operation::Read)?.read()?.clone())
    }

    pub fn exists(&mut self) -> Result<bool> {
        if let Self::Package(package) = self {
            return package.exists(&PackageQuery::new());
        }
        self.require_entity(Operation::Exists)?.exists()
    }

    pub fn create(&mut self, desired: &DesiredState) -> Result<Document> {
        if let Self::Subject(subject) = self {
            return subject.create(desired).cloned();
        }
        Ok(self.require_entity(Operation::Create)?.create(desired)?.clone())
    }

    /// Compare `desired` with the remote state.
    ///
    /// Packages and grants have their own comparison and are not covered.
    pub fn check(&mut self, desired: &DesiredState) -> Result<UpdateCheck> {
        match self {
            Self::Subject(subject) => subject.is_update_needed(desired),
            Self::Package(_) | Self::Grants(_) | Self::Database(_) => {
                Err(self.unavailable(Operation::Update))
            }
            _ => self.require_entity(Operation::Update)?.is_update_needed(desired),
        }
    }

    pub fn update(&mut self, desired: &DesiredState) -> Result<Outcome> {
        match self {
            Self::Subject(subject) => subject.update(desired),
            Self::Package(package) => {
                let mut query = PackageQuery::new();
                query.version = desired.text("version");
                query.timestamp = desired.text("timestamp");
                package.update(&query)
            }
            Self::Grants(_) | Self::Database(_) => Err(self.unavailable(Operation::Update)),
            _ => self.require_entity(Operation::Update)?.update(desired),
        }
    }

    pub fn delete(&mut self) -> Result<()> {
        self.require_entity(Operation::Delete)?.delete()
    }
}
