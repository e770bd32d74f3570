//! In-memory backend for tests.

use crate::backend::{Backend, Method};
use crate::error::{Error, Result};
use crate::kind::ResourceKind;
use reconcile::{Document, Element, ResourceType};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct State {
    documents: BTreeMap<String, Document>,
    calls: Vec<(Method, String)>,
    bodies: Vec<(Method, String, String)>,
    failures: HashMap<(Method, String), u16>,
}

/// Mock backend for testing without network access.
///
/// Documents live at resource paths. Paths ending in a type segment
/// (`/site`, `/site/s1/application`, `/platform/property`) answer with a
/// listing of their direct children. `POST` to such a path creates the named
/// child, `PUT` replaces, `DELETE` removes the subtree.
/// `PUT {path}/reload` succeeds when `{path}` exists and `PUT {repo}/install`
/// marks the posted package variant installed and registers its application.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<State>>,
}

impl MockBackend {
    /// Create a new empty mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Store a document at a path.
    pub fn insert(&self, path: impl Into<String>, document: Document) {
        self.lock().documents.insert(path.into(), document);
    }

    /// Parse and store a document at a path.
    pub fn insert_xml(&self, path: impl Into<String>, xml: &str) -> Result<()> {
        self.insert(path, Document::parse(xml)?);
        Ok(())
    }

    /// The stored document at a path.
    #[must_use]
    pub fn document(&self, path: &str) -> Option<Document> {
        self.lock().documents.get(path).cloned()
    }

    /// Answer every matching request with this status from now on.
    pub fn fail(&self, method: Method, path: impl Into<String>, status: u16) {
        self.lock().failures.insert((method, path.into()), status);
    }

    /// Every request made so far.
    #[must_use]
    pub fn calls(&self) -> Vec<(Method, String)> {
        self.lock().calls.clone()
    }

    /// Requests that may have changed state.
    #[must_use]
    pub fn mutations(&self) -> Vec<(Method, String)> {
        self.calls()
            .into_iter()
            .filter(|(method, _)| method.is_mutating())
            .collect()
    }

    /// Bodies sent with mutating requests, as `(method, path, body)`.
    #[must_use]
    pub fn bodies(&self) -> Vec<(Method, String, String)> {
        self.lock().bodies.clone()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        let mut state = self.lock();
        state.calls.clear();
        state.bodies.clear();
    }
}

/// The schema whose type segment ends `path`.
fn listed_type(path: &str) -> Option<&'static ResourceType> {
    let segment = path.rsplit('/').next()?;
    ResourceKind::ALL
        .into_iter()
        .map(ResourceKind::schema)
        .find(|schema| schema.segment == Some(segment))
}

fn render(document: &Document) -> Result<Option<String>> {
    Ok(Some(document.to_xml()?))
}

impl State {
    fn get(&self, path: &str) -> Result<Option<String>> {
        if let Some(document) = self.documents.get(path) {
            return render(document);
        }
        if let Some(schema) = listed_type(path) {
            let prefix = format!("{path}/");
            let mut listing = Element::new(schema.plural);
            listing.children = self
                .documents
                .iter()
                .filter(|(p, _)| p.strip_prefix(&prefix).is_some_and(|rest| !rest.contains('/')))
                .map(|(_, d)| d.root.clone())
                .collect();
            return render(&Document::new(listing));
        }
        Err(Error::from_status(404, path, None))
    }

    fn post(&mut self, path: &str, body: Option<&str>) -> Result<Option<String>> {
        if path.ends_with("/reload") {
            return Ok(None);
        }
        let document = Document::parse(body.unwrap_or_default())?;
        let target = match listed_type(path) {
            Some(schema) => {
                let name = document
                    .identity(schema)
                    .ok_or_else(|| Error::from_status(400, path, None))?;
                format!("{path}/{}", urlencoding::encode(name))
            }
            None => path.to_string(),
        };
        if self.documents.contains_key(&target) {
            return Err(Error::from_status(409, &target, None));
        }
        self.documents.insert(target, document.clone());
        render(&document)
    }

    fn put(&mut self, path: &str, body: Option<&str>) -> Result<Option<String>> {
        if let Some(owner) = path.strip_suffix("/reload") {
            return match self.documents.contains_key(owner) {
                true => Ok(None),
                false => Err(Error::from_status(404, path, None)),
            };
        }
        let document = Document::parse(body.unwrap_or_default())?;
        if let Some(repository) = path.strip_suffix("/install") {
            return self.install(repository, &document);
        }
        if !self.documents.contains_key(path) {
            return Err(Error::from_status(404, path, None));
        }
        self.documents.insert(path.to_string(), document.clone());
        render(&document)
    }

    fn install(&mut self, repository: &str, package: &Document) -> Result<Option<String>> {
        let name = package
            .name()
            .ok_or_else(|| Error::from_status(400, repository, None))?
            .to_string();
        let version = package.field("version").unwrap_or_default().to_string();
        let path = format!("{repository}/{}", urlencoding::encode(&name));
        let variants = self
            .documents
            .get_mut(&path)
            .ok_or_else(|| Error::from_status(404, &path, None))?;
        for variant in &mut variants.root.children {
            let installed = variant.child("version").is_some_and(|v| v.text == version);
            if let Some(flag) = variant.child_mut("installed") {
                flag.text = installed.to_string();
            }
        }
        let application = Document::new(
            Element::new("application")
                .with_attribute("name", name.as_str())
                .with_child(Element::new("displayName").with_text(
                    package.field("displayName").unwrap_or_default(),
                ))
                .with_child(Element::new("version").with_text(version)),
        );
        let target = format!("/application/{}", urlencoding::encode(&name));
        self.documents.insert(target, application.clone());
        render(&application)
    }

    fn delete(&mut self, path: &str) -> Result<Option<String>> {
        if self.documents.remove(path).is_none() {
            return Err(Error::from_status(404, path, None));
        }
        let prefix = format!("{path}/");
        self.documents.retain(|p, _| !p.starts_with(&prefix));
        Ok(None)
    }
}

impl Backend for MockBackend {
    fn request(&self, method: Method, path: &str, body: Option<&str>) -> Result<Option<String>> {
        let mut state = self.lock();
        state.calls.push((method, path.to_string()));
        if method.is_mutating() {
            state
                .bodies
                .push((method, path.to_string(), body.unwrap_or_default().to_string()));
        }
        if let Some(status) = state.failures.get(&(method, path.to_string())) {
            return Err(Error::from_status(*status, path, None));
        }
        match method {
            Method::Get => state.get(path),
            Method::Post => state.post(path, body),
            Method::Put => state.put(path, body),
            Method::Delete => state.delete(path),
        }
    }
}
