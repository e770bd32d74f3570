//! Generic resource engine.
//!
//! An [`Entity`] caches the last document read from its own address. Reads
//! are lazy, mutations refresh the cache from the server's response, and
//! updates are skipped when merging the desired state changes nothing.

use crate::application;
use crate::backend::Method;
use crate::error::{Error, Result};
use crate::kind::{Operation, ResourceKind};
use crate::Client;
use reconcile::{
    Address, Change, ChangeSummary, DesiredState, Document, FieldSource, MergeMode, Outcome, merge,
};
use std::fmt;

/// Reference to an enclosing resource, used to build addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parent {
    pub kind: ResourceKind,
    pub name: Option<String>,
}

impl Parent {
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: Some(name.into()),
        }
    }

    /// The platform, which has a segment but no name.
    pub fn platform() -> Self {
        Self {
            kind: ResourceKind::Platform,
            name: None,
        }
    }

    pub fn site(name: impl Into<String>) -> Self {
        Self::new(ResourceKind::Site, name)
    }

    pub fn application(name: impl Into<String>) -> Self {
        Self::new(ResourceKind::Application, name)
    }

    pub fn repository(name: impl Into<String>) -> Self {
        Self::new(ResourceKind::Repository, name)
    }
}

impl fmt::Display for Parent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}({name})", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Address of a resource from its parents, kind and name.
pub(crate) fn address_of(parents: &[Parent], kind: ResourceKind, name: Option<&str>) -> Address {
    Address::new(
        parents
            .iter()
            .map(|p| (p.kind.schema().segment, p.name.as_deref())),
        kind.schema().segment,
        name,
    )
}

/// Outcome of comparing a desired state with the remote document.
#[derive(Debug, Clone)]
pub struct UpdateCheck {
    /// Whether an update would change anything.
    pub needed: bool,
    /// Remote document as read.
    pub current: Document,
    /// Document an update would send.
    pub desired: Document,
    pub changes: Vec<Change>,
}

impl UpdateCheck {
    pub fn summary(&self) -> ChangeSummary {
        ChangeSummary::from_changes(&self.changes)
    }
}

/// One remote resource.
#[derive(Clone)]
pub struct Entity<'c> {
    client: &'c Client,
    kind: ResourceKind,
    name: Option<String>,
    parents: Vec<Parent>,
    address: Address,
    document: Document,
    loaded: bool,
    dirty: bool,
}

impl<'c> Entity<'c> {
    /// An entity whose document has not been read yet.
    pub fn new(client: &'c Client, kind: ResourceKind, name: Option<&str>, parents: Vec<Parent>) -> Self {
        let name = name.filter(|n| !n.is_empty()).map(str::to_string);
        Self {
            client,
            kind,
            address: address_of(&parents, kind, name.as_deref()),
            name,
            parents,
            document: Document::template(kind.schema()),
            loaded: false,
            dirty: false,
        }
    }

    /// An entity whose document came from a listing, named by its identity.
    pub(crate) fn loaded(
        client: &'c Client,
        kind: ResourceKind,
        parents: Vec<Parent>,
        document: Document,
    ) -> Self {
        let name = document.identity(kind.schema()).map(str::to_string);
        let mut entity = Self::new(client, kind, name.as_deref(), parents);
        entity.document = document;
        entity.loaded = true;
        entity
    }

    pub fn client(&self) -> &'c Client {
        self.client
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn parents(&self) -> &[Parent] {
        &self.parents
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// The cached document; the schema template until loaded.
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Force the next read to go to the server.
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    fn require(&self, operation: Operation) -> Result<()> {
        if self.kind.supports(operation) {
            Ok(())
        } else {
            Err(Error::NotAvailable {
                operation: operation.as_str(),
                resource: self.to_string(),
            })
        }
    }

    fn load(&mut self, force: bool) -> Result<&Document> {
        if force || !self.loaded || self.dirty {
            log::debug!("Reading {self}");
            self.document = self.client.fetch(self.address.own())?;
            self.loaded = true;
            self.dirty = false;
        }
        Ok(&self.document)
    }

    fn reset(&mut self) {
        self.document = Document::template(self.kind.schema());
        self.loaded = false;
        self.dirty = false;
    }

    /// Take the server's response as the new state, or re-read without one.
    fn adopt(&mut self, response: Option<Document>) -> Result<()> {
        match response {
            Some(document) => {
                self.document = document;
                self.loaded = true;
                self.dirty = false;
            }
            None => {
                self.load(true)?;
            }
        }
        Ok(())
    }

    /// Reject unknown keys and fill fields taken from parent names.
    pub(crate) fn prepare(&self, desired: &DesiredState) -> Result<DesiredState> {
        let schema = self.kind.schema();
        desired.check(schema)?;
        let mut desired = desired.clone();
        for field in schema.fields {
            if let FieldSource::ParentName(tag) = field.source {
                let parent = self
                    .parents
                    .iter()
                    .find(|p| p.kind.tag() == tag)
                    .and_then(|p| p.name.as_deref())
                    .ok_or_else(|| Error::rule(format!("{self} must be nested in a {tag}")))?;
                desired.insert(field.name, parent);
            }
        }
        Ok(desired)
    }

    /// Validate and PUT a complete document to the own address.
    pub(crate) fn push(&mut self, document: &Document) -> Result<()> {
        self.client.validate(self.kind, document)?;
        let response = self
            .client
            .send(Method::Put, self.address.own(), Some(document))?;
        self.adopt(response)
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// The remote document, read once and cached.
    pub fn read(&mut self) -> Result<&Document> {
        self.require(Operation::Read)?;
        self.load(false)
    }

    /// Re-read the remote document.
    pub fn refresh(&mut self) -> Result<&Document> {
        self.require(Operation::Read)?;
        self.load(true)
    }

    /// Whether the resource exists. Only a 404 counts as absent.
    pub fn exists(&mut self) -> Result<bool> {
        self.require(Operation::Exists)?;
        let kind = self.kind;
        let found = match self.load(false) {
            Ok(document) => document.tag() == kind.tag(),
            Err(e) if e.is_not_found() => false,
            Err(e) => return Err(e),
        };
        if !found {
            self.reset();
        }
        Ok(found)
    }

    /// Create the resource from the schema template and `desired`.
    ///
    /// Fails with [`Error::Conflict`] before sending anything when the
    /// resource already exists.
    pub fn create(&mut self, desired: &DesiredState) -> Result<&Document> {
        self.require(Operation::Create)?;
        if self.name.is_none() && !self.kind.is_singleton() {
            return Err(Error::rule(format!("a name is required to create a {}", self.kind)));
        }
        let desired = self.prepare(desired)?;
        if self.exists()? {
            return Err(Error::Conflict {
                path: self.address.own().to_string(),
            });
        }

        let schema = self.kind.schema();
        let template = Document::template(schema);
        let merged = merge(schema, &template, &desired, self.name.as_deref(), MergeMode::Create);
        self.client.validate(self.kind, &merged.document)?;
        let response = self
            .client
            .send(Method::Post, self.address.ancestor(), Some(&merged.document))?;
        self.adopt(response)?;
        log::info!("Created {self}");
        Ok(&self.document)
    }

    /// Compare `desired` with the remote document without sending anything.
    pub fn is_update_needed(&mut self, desired: &DesiredState) -> Result<UpdateCheck> {
        self.require(Operation::Read)?;
        let desired = self.prepare(desired)?;
        let current = self.load(false)?.clone();
        let merged = merge(
            self.kind.schema(),
            &current,
            &desired,
            self.name.as_deref(),
            MergeMode::Update,
        );
        Ok(UpdateCheck {
            needed: merged.changed(),
            current,
            desired: merged.document,
            changes: merged.changes,
        })
    }

    /// Merge `desired` into the remote document and PUT it if anything changed.
    pub fn update(&mut self, desired: &DesiredState) -> Result<Outcome> {
        self.require(Operation::Update)?;
        let check = self.is_update_needed(desired)?;
        if !check.needed {
            log::warn!("No update needed for {self}");
            return Ok(Outcome::NoChange);
        }
        for change in &check.changes {
            log::debug!("{self}: {change}");
        }
        self.push(&check.desired)?;
        log::info!("Updated {self} ({})", check.summary());
        Ok(Outcome::Modified)
    }

    /// Delete the resource. A missing resource is [`Error::NotFound`].
    pub fn delete(&mut self) -> Result<()> {
        self.require(Operation::Delete)?;
        if !self.exists()? {
            return Err(Error::NotFound {
                path: self.address.own().to_string(),
            });
        }
        // Below a site the DELETE is the deassignment itself.
        if let (ResourceKind::Application, Some(name), true) =
            (self.kind, self.name.as_deref(), self.parents.is_empty())
        {
            application::ensure_unassigned(self.client, name)?;
        }
        self.client.send(Method::Delete, self.address.own(), None)?;
        self.reset();
        log::info!("Deleted {self}");
        Ok(())
    }
}

impl fmt::Display for Entity<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}({name})", self.kind),
            None => write!(f, "{}({})", self.kind, self.address),
        }
    }
}

impl fmt::Debug for Entity<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("address", &self.address)
            .field("loaded", &self.loaded)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use reconcile::Element;

    fn site() -> DesiredState {
        DesiredState::new()
            .set("host", "s1.local")
            .set("domain", "http://s1.local")
            .set("description", "first site")
            .set("active", false)
            .set("createRepositoryPath", false)
    }

    #[test]
    fn test_address_from_parents() {
        let (client, _) = testing::client();
        let property = client.entity(
            ResourceKind::Property,
            Some("a b"),
            vec![Parent::site("s1"), Parent::application("cms")],
        );
        assert_eq!(property.address().own(), "/site/s1/application/cms/property/a%20b");
        assert_eq!(property.address().ancestor(), "/site/s1/application/cms/property");

        let platform_property =
            client.entity(ResourceKind::Property, Some("x"), vec![Parent::platform()]);
        assert_eq!(platform_property.address().own(), "/platform/property/x");
    }

    #[test]
    fn test_create_then_read_round_trip() {
        let (client, mock) = testing::client();
        let mut entity = client.entity(ResourceKind::Site, Some("s1"), vec![]);
        entity.create(&site()).unwrap();
        assert!(entity.is_loaded());
        assert_eq!(mock.bodies()[0].1, "/site");

        let mut fresh = client.entity(ResourceKind::Site, Some("s1"), vec![]);
        let document = fresh.read().unwrap();
        assert_eq!(document.field("host"), Some("s1.local"));
        assert_eq!(document.field("active"), Some("false"));
        assert_eq!(document.name(), Some("s1"));
    }

    #[test]
    fn test_create_existing_is_conflict_without_post() {
        let (client, mock) = testing::client();
        client.entity(ResourceKind::Site, Some("s1"), vec![]).create(&site()).unwrap();
        mock.clear_calls();

        let err = client
            .entity(ResourceKind::Site, Some("s1"), vec![])
            .create(&site())
            .unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
        assert!(mock.mutations().is_empty());
    }

    #[test]
    fn test_create_invalid_is_not_sent() {
        let (client, mock) = testing::client();
        let desired = DesiredState::new().set("domain", "http://s1.local");
        let err = client
            .entity(ResourceKind::Site, Some("s1"), vec![])
            .create(&desired)
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        assert!(mock.mutations().is_empty());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let (client, mock) = testing::client();
        let desired = site().set("colour", "blue");
        let err = client
            .entity(ResourceKind::Site, Some("s1"), vec![])
            .create(&desired)
            .unwrap_err();
        assert!(err.to_string().contains("colour"));
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_update_is_idempotent() {
        let (client, mock) = testing::client();
        let mut entity = client.entity(ResourceKind::Site, Some("s1"), vec![]);
        entity.create(&site()).unwrap();

        let changed = site().set("active", true);
        assert_eq!(entity.update(&changed).unwrap(), Outcome::Modified);
        mock.clear_calls();
        assert_eq!(entity.update(&changed).unwrap(), Outcome::NoChange);
        assert!(mock.mutations().is_empty());
        assert_eq!(mock.document("/site/s1").unwrap().field("active"), Some("true"));
    }

    #[test]
    fn test_update_keeps_preserved_fields() {
        let (client, mock) = testing::client();
        let mut entity = client.entity(ResourceKind::Site, Some("s1"), vec![]);
        entity.create(&site()).unwrap();

        let mut without_description = site();
        without_description.remove("description");
        assert_eq!(entity.update(&without_description).unwrap(), Outcome::NoChange);
        assert_eq!(
            mock.document("/site/s1").unwrap().field("description"),
            Some("first site")
        );

        let cleared = without_description.clone().clear("description");
        assert_eq!(entity.update(&cleared).unwrap(), Outcome::Modified);
        assert_eq!(mock.document("/site/s1").unwrap().field("description"), Some(""));
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let (client, _) = testing::client();
        let err = client
            .entity(ResourceKind::Site, Some("nope"), vec![])
            .update(&site())
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_is_update_needed_reports_changes() {
        let (client, mock) = testing::client();
        let mut entity = client.entity(ResourceKind::Site, Some("s1"), vec![]);
        entity.create(&site()).unwrap();
        mock.clear_calls();

        let check = entity
            .is_update_needed(&site().set("host", "other.local"))
            .unwrap();
        assert!(check.needed);
        assert_eq!(check.changes.len(), 1);
        assert_eq!(check.desired.field("host"), Some("other.local"));
        assert_eq!(check.current.field("host"), Some("s1.local"));
        assert!(mock.mutations().is_empty());
    }

    #[test]
    fn test_delete() {
        let (client, mock) = testing::client();
        let mut entity = client.entity(ResourceKind::Site, Some("s1"), vec![]);
        entity.create(&site()).unwrap();
        entity.delete().unwrap();
        assert!(!entity.is_loaded());
        assert!(!entity.exists().unwrap());
        assert!(mock.document("/site/s1").is_none());
        assert!(entity.delete().unwrap_err().is_not_found());
    }

    #[test]
    fn test_exists_propagates_other_errors() {
        let (client, mock) = testing::client();
        mock.fail(Method::Get, "/site/s1", 500);
        let result = client.entity(ResourceKind::Site, Some("s1"), vec![]).exists();
        assert!(matches!(result, Err(Error::Server { .. })));
    }

    #[test]
    fn test_exists_with_other_tag_clears_document() {
        let (client, mock) = testing::client();
        mock.insert_xml("/site/s1", r#"<application name="x"/>"#).unwrap();
        let mut entity = client.entity(ResourceKind::Site, Some("s1"), vec![]);
        assert!(!entity.exists().unwrap());
        assert!(!entity.is_loaded());
        assert_eq!(
            entity.document(),
            &Document::template(ResourceKind::Site.schema())
        );
    }

    #[test]
    fn test_delete_site_application_is_deassignment() {
        let (client, mock) = testing::client();
        mock.insert_xml("/site/s1", r#"<site name="s1"/>"#).unwrap();
        mock.insert_xml("/application/cms", r#"<application name="cms"/>"#).unwrap();
        client.application("cms").assign("s1").unwrap();

        let mut assigned =
            client.entity(ResourceKind::Application, Some("cms"), vec![Parent::site("s1")]);
        assigned.delete().unwrap();
        assert!(mock.document("/site/s1/application/cms").is_none());
        assert!(mock.document("/application/cms").is_some());

        client.application("cms").assign("s1").unwrap();
        let mut global = client.entity(ResourceKind::Application, Some("cms"), vec![]);
        assert!(matches!(global.delete(), Err(Error::BusinessRule(_))));
        assert!(mock.document("/application/cms").is_some());
    }

    #[test]
    fn test_cached_read_and_invalidate() {
        let (client, mock) = testing::client();
        let mut entity = client.entity(ResourceKind::Site, Some("s1"), vec![]);
        entity.create(&site()).unwrap();
        mock.clear_calls();

        entity.read().unwrap();
        assert!(mock.calls().is_empty());
        entity.invalidate();
        assert!(entity.is_dirty());
        entity.read().unwrap();
        assert_eq!(mock.calls().len(), 1);
        assert!(!entity.is_dirty());
    }

    #[test]
    fn test_platform_operations_not_available() {
        let (client, mock) = testing::client();
        let mut platform = client.entity(ResourceKind::Platform, None, vec![]);
        let err = platform.read().unwrap_err();
        assert!(matches!(err, Error::NotAvailable { operation: "read", .. }));
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_clob_property_is_cdata() {
        let (client, mock) = testing::client();
        mock.insert_xml("/site/s1", r#"<site name="s1"/>"#).unwrap();
        let desired = DesiredState::new()
            .set("value", "<b>bold</b>")
            .set("clob", true);
        client
            .entity(ResourceKind::Property, Some("p"), vec![Parent::site("s1")])
            .create(&desired)
            .unwrap();

        let (_, path, body) = &mock.bodies()[0];
        assert_eq!(path, "/site/s1/property");
        assert!(body.contains("<![CDATA[<b>bold</b>]]>"));
        let stored = mock.document("/site/s1/property/p").unwrap();
        assert_eq!(stored.field("value"), Some("<b>bold</b>"));
    }

    #[test]
    fn test_role_takes_application_from_parent() {
        let (client, mock) = testing::client();
        let mut role = client.entity(
            ResourceKind::Role,
            Some("editor"),
            vec![Parent::application("cms")],
        );
        role.create(&DesiredState::new().set("description", "edits")).unwrap();
        let stored = mock.document("/application/cms/role/editor").unwrap();
        assert_eq!(stored.field("application"), Some("cms"));

        let mut orphan = client.entity(ResourceKind::Role, Some("editor"), vec![]);
        assert!(matches!(
            orphan.create(&DesiredState::new()),
            Err(Error::BusinessRule(_))
        ));
    }

    #[test]
    fn test_child_collection_is_reconciled() {
        let (client, mock) = testing::client();
        let roles = |names: &[&str]| {
            names
                .iter()
                .map(|n| Element::new("role").with_attribute("name", *n))
                .collect::<Vec<_>>()
        };
        let mut group = client.entity(ResourceKind::Group, Some("editors"), vec![]);
        group
            .create(&DesiredState::new().items("roles", roles(&["A", "B"])))
            .unwrap();
        let outcome = group
            .update(&DesiredState::new().items("roles", roles(&["B", "C"])))
            .unwrap();
        assert_eq!(outcome, Outcome::Modified);

        let stored = mock.document("/group/editors").unwrap();
        assert_eq!(stored.item_names("roles", "name"), vec!["B", "C"]);
        assert_eq!(
            group
                .update(&DesiredState::new().items("roles", roles(&["B", "C"])))
                .unwrap(),
            Outcome::NoChange
        );
    }
}
