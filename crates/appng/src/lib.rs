//! # appng
//!
//! Client for the appNGizer REST endpoint of an appNG platform.
//!
//! Resources form a hierarchy below the service root (sites, repositories,
//! applications, subjects, groups, properties, roles, permissions, packages,
//! databases and grants). Every operation follows the same pattern: read the
//! current document, merge the desired state into it, skip the request when
//! nothing changed, validate, send.
//!
//! - **Client**: owns the transport [`Backend`], the document [`Validator`]
//!   and the [`PasswordHasher`]
//! - **Entity**: generic read/exists/create/update/delete for one resource
//! - **Collection**: listing and lookup of siblings, package variant search
//! - **Specializations**: [`Application`], [`Package`], [`Grants`],
//!   [`Database`], [`Subject`], [`Site`] and [`Platform`] add their own rules
//! - **Registry**: builds a [`Resource`] from a type tag
//!
//! ## Example
//!
//! ```
//! use appng::{Client, DesiredState, MockBackend, Outcome};
//!
//! let client = Client::with_backend(Box::new(MockBackend::new()));
//!
//! let mut site = client.site("s1");
//! let desired = DesiredState::new()
//!     .set("host", "s1.local")
//!     .set("domain", "http://s1.local")
//!     .set("active", true)
//!     .set("createRepositoryPath", false);
//!
//! site.entity_mut().create(&desired).unwrap();
//! assert_eq!(site.entity_mut().update(&desired).unwrap(), Outcome::NoChange);
//! ```

pub mod application;
pub mod backend;
pub mod collection;
pub mod database;
pub mod entity;
pub mod error;
pub mod grants;
pub mod hash;
pub mod kind;
pub mod package;
pub mod registry;
pub mod site;
pub mod subject;

pub use application::Application;
pub use backend::{Backend, HttpBackend, HttpOptions, Method, MockBackend};
pub use collection::{Collection, PackageMatch};
pub use database::{Database, DatabaseSpec};
pub use entity::{Entity, Parent, UpdateCheck};
pub use error::{Error, ErrorCategory, Result};
pub use grants::Grants;
pub use hash::{BcryptHasher, PasswordHasher};
pub use kind::{Operation, ResourceKind};
pub use package::{Package, PackageQuery};
pub use registry::Resource;
pub use site::{Platform, Site};
pub use subject::Subject;

pub use reconcile::{
    Address, Change, DesiredState, Document, Element, Outcome, SchemaValidator, Validator, Value,
    Version,
};

/// Connection to one appNGizer endpoint.
pub struct Client {
    backend: Box<dyn Backend>,
    validator: Box<dyn Validator>,
    hasher: Box<dyn PasswordHasher>,
}

impl Client {
    /// Connect over HTTP and authenticate with the platform's shared secret.
    pub fn connect(url: &str, secret: &str, options: &HttpOptions) -> Result<Self> {
        let backend = HttpBackend::connect(url, secret, options)?;
        Ok(Self::with_backend(Box::new(backend)))
    }

    /// Create a client with a custom backend (useful for testing).
    #[must_use]
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self {
            backend,
            validator: Box::new(SchemaValidator),
            hasher: Box::new(BcryptHasher::new()),
        }
    }

    /// Replace the document validator.
    #[must_use]
    pub fn with_validator(mut self, validator: Box<dyn Validator>) -> Self {
        self.validator = validator;
        self
    }

    /// Replace the password hasher.
    #[must_use]
    pub fn with_hasher(mut self, hasher: Box<dyn PasswordHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn hasher(&self) -> &dyn PasswordHasher {
        self.hasher.as_ref()
    }

    // =========================================================================
    // Resources
    // =========================================================================

    /// A resource of any kind below the given parents.
    pub fn entity(&self, kind: ResourceKind, name: Option<&str>, parents: Vec<Parent>) -> Entity<'_> {
        Entity::new(self, kind, name, parents)
    }

    /// All resources of a kind below the given parents.
    pub fn collection(&self, kind: ResourceKind, parents: Vec<Parent>) -> Collection<'_> {
        Collection::new(self, kind, parents)
    }

    pub fn platform(&self) -> Platform<'_> {
        Platform::new(self)
    }

    pub fn site(&self, name: &str) -> Site<'_> {
        Site::new(self, name)
    }

    pub fn application(&self, name: &str) -> Application<'_> {
        Application::new(self, name)
    }

    /// A package, searched in one repository or in all of them.
    pub fn package(&self, name: &str, repository: Option<&str>) -> Package<'_> {
        Package::new(self, name, repository)
    }

    pub fn subject(&self, name: &str) -> Subject<'_> {
        Subject::new(self, name)
    }

    pub fn grants(&self, site: &str, application: &str) -> Grants<'_> {
        Grants::new(self, site, application)
    }

    pub fn database(&self, site: &str, application: &str) -> Database<'_> {
        Database::new(self, site, application)
    }

    // =========================================================================
    // Transport
    // =========================================================================

    /// GET a document. An empty body is an error.
    pub(crate) fn fetch(&self, path: &str) -> Result<Document> {
        let body = self
            .backend
            .request(Method::Get, path, None)?
            .ok_or_else(|| Error::http(format!("empty response from {path}"), None))?;
        Ok(Document::parse(&body)?)
    }

    /// Send a mutating request and parse the response body, if any.
    pub(crate) fn send(
        &self,
        method: Method,
        path: &str,
        document: Option<&Document>,
    ) -> Result<Option<Document>> {
        let body = document.map(Document::to_xml).transpose()?;
        log::debug!("{method} {path}");
        match self.backend.request(method, path, body.as_deref())? {
            Some(response) => Ok(Some(Document::parse(&response)?)),
            None => Ok(None),
        }
    }

    /// Validate a document before it is sent.
    pub(crate) fn validate(&self, kind: ResourceKind, document: &Document) -> Result<()> {
        Ok(self.validator.validate(kind.schema(), document)?)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// A client over a fresh mock with a cheap hasher.
    pub fn client() -> (Client, MockBackend) {
        let mock = MockBackend::new();
        let client = Client::with_backend(Box::new(mock.clone()))
            .with_hasher(Box::new(BcryptHasher::with_cost(4)));
        (client, mock)
    }
}
