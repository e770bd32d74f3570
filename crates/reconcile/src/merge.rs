//! Desired-state merging.
//!
//! [`merge`] applies a [`DesiredState`] to a document according to the
//! resource schema and returns the merged document together with every
//! [`Change`] it made. An empty change list means the remote resource already
//! matches, which is how update checks avoid a network round trip.
//!
//! Rules, per declared field in schema order:
//!
//! - absent from the desired state: cleared on update unless preserved, kept
//!   as the template default on create
//! - present but empty, [`Value::Clear`] or the text `none`: cleared, even
//!   when preserved
//! - present: text replaced, CDATA-wrapped when the field's encoding says so
//!
//! Attributes follow the same rules without preservation. Child collections
//! are reconciled by identity only when named in the desired state.

use crate::document::{Document, Element};
use crate::error::{Error, Result};
use crate::schema::{Encoding, FieldSource, ResourceType};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Text that clears a field, compared case-insensitively.
const CLEAR_MARKER: &str = "none";

/// Desired value for one field, attribute or collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Bool(bool),
    /// Explicit request to clear.
    Clear,
    /// Collection members, each carrying its identity attribute.
    Items(Vec<Element>),
}

impl Value {
    /// Wire text, or `None` when the value clears.
    fn text(&self) -> Option<String> {
        match self {
            Self::Text(text) if text.is_empty() || text.eq_ignore_ascii_case(CLEAR_MARKER) => None,
            Self::Text(text) => Some(text.clone()),
            Self::Bool(flag) => Some(flag.to_string()),
            Self::Clear | Self::Items(_) => None,
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<bool> for Value {
    fn from(flag: bool) -> Self {
        Self::Bool(flag)
    }
}

/// A partial description of how a resource should look.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredState {
    values: BTreeMap<String, Value>,
}

impl DesiredState {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    #[must_use]
    pub fn clear(mut self, key: impl Into<String>) -> Self {
        self.insert(key, Value::Clear);
        self
    }

    #[must_use]
    pub fn items(mut self, key: impl Into<String>, items: Vec<Element>) -> Self {
        self.insert(key, Value::Items(items));
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Desired text of a key, `None` when absent or clearing.
    pub fn text(&self, key: &str) -> Option<String> {
        self.get(key).and_then(Value::text)
    }

    /// Whether a key is set to `true`.
    pub fn is_truthy(&self, key: &str) -> bool {
        self.text(key)
            .is_some_and(|t| t.eq_ignore_ascii_case("true"))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Capture the declared state of a document, so that merging the result
    /// back into the same document changes nothing.
    pub fn from_document(schema: &ResourceType, document: &Document) -> Self {
        let mut state = Self::new();
        for field in schema.fields {
            let text = document.field(field.name).unwrap_or_default();
            state.insert(field.name, Value::Text(text.to_string()));
        }
        for attribute in schema.attributes.iter().filter(|a| !is_identity(schema, a.name)) {
            if let Some(value) = document.attribute(attribute.name) {
                state.insert(attribute.name, value);
            }
        }
        for collection in schema.collections {
            let items = document
                .items(collection.name)
                .into_iter()
                .cloned()
                .collect();
            state.insert(collection.name, Value::Items(items));
        }
        state
    }

    /// Reject keys the schema does not declare.
    pub fn check(&self, schema: &ResourceType) -> Result<()> {
        match self.values.keys().find(|key| !schema.declares(key)) {
            Some(field) => Err(Error::UnknownField {
                resource: schema.tag.to_string(),
                field: field.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for DesiredState {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut state = Self::new();
        for (key, value) in iter {
            state.insert(key, value);
        }
        state
    }
}

/// Whether the document being merged has prior remote state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Fresh template; omitted fields keep their defaults.
    Create,
    /// Current remote document; omitted fields are cleared unless preserved.
    Update,
}

/// What a change touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Field(&'static str),
    Attribute(&'static str),
    ItemAdded {
        collection: &'static str,
        identity: String,
    },
    ItemRemoved {
        collection: &'static str,
        identity: String,
    },
}

/// One difference between the current and the merged document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub target: Target,
    pub from: String,
    pub to: String,
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Target::Field(name) => write!(f, "{name}: '{}' -> '{}'", self.from, self.to),
            Target::Attribute(name) => write!(f, "@{name}: '{}' -> '{}'", self.from, self.to),
            Target::ItemAdded {
                collection,
                identity,
            } => write!(f, "{collection}: + {identity}"),
            Target::ItemRemoved {
                collection,
                identity,
            } => write!(f, "{collection}: - {identity}"),
        }
    }
}

/// Result of a merge.
#[derive(Debug, Clone)]
pub struct Merge {
    pub document: Document,
    pub changes: Vec<Change>,
}

impl Merge {
    /// Whether the merged document differs from the input.
    pub fn changed(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn summary(&self) -> ChangeSummary {
        ChangeSummary::from_changes(&self.changes)
    }
}

/// Change counts by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    pub fields: usize,
    pub attributes: usize,
    pub added: usize,
    pub removed: usize,
}

impl ChangeSummary {
    pub fn from_changes(changes: &[Change]) -> Self {
        let mut summary = Self::default();
        for change in changes {
            match change.target {
                Target::Field(_) => summary.fields += 1,
                Target::Attribute(_) => summary.attributes += 1,
                Target::ItemAdded { .. } => summary.added += 1,
                Target::ItemRemoved { .. } => summary.removed += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.fields + self.attributes + self.added + self.removed
    }
}

impl fmt::Display for ChangeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} field(s), {} attribute(s), {} added, {} removed",
            self.fields, self.attributes, self.added, self.removed
        )
    }
}

/// The `name` attribute and the schema's identity attribute are set by the
/// resource itself, never from desired state.
fn is_identity(schema: &ResourceType, attribute: &str) -> bool {
    attribute == "name" || attribute == schema.identity
}

/// Merge `desired` into `current` and report what changed.
///
/// `current` is never modified. When `name` is given the root `name`
/// attribute is rewritten last.
pub fn merge(
    schema: &ResourceType,
    current: &Document,
    desired: &DesiredState,
    name: Option<&str>,
    mode: MergeMode,
) -> Merge {
    let mut document = current.clone();
    let mut changes = Vec::new();

    for field in schema.fields {
        let wanted = match desired.get(field.name) {
            None if mode == MergeMode::Create || field.preserved => continue,
            None => String::new(),
            Some(Value::Items(_)) => {
                log::warn!("ignoring item list for field {}.{}", schema.tag, field.name);
                continue;
            }
            Some(value) => value.text().unwrap_or_default(),
        };
        if matches!(field.source, FieldSource::ParentName(_)) && !desired.contains(field.name) {
            continue;
        }
        let cdata = match field.encoding {
            Encoding::Text => false,
            Encoding::Cdata => true,
            Encoding::CdataWhen(attribute) => desired.is_truthy(attribute),
        };

        let element = element_slot(schema, &mut document.root, field.name);
        element.cdata = cdata;
        if element.text != wanted {
            log::debug!("{}.{}: '{}' -> '{}'", schema.tag, field.name, element.text, wanted);
            changes.push(Change {
                target: Target::Field(field.name),
                from: std::mem::replace(&mut element.text, wanted.clone()),
                to: wanted,
            });
        }
    }

    for attribute in schema.attributes.iter().filter(|a| !is_identity(schema, a.name)) {
        let wanted = match desired.get(attribute.name) {
            None if mode == MergeMode::Create => continue,
            None => None,
            Some(value) => value.text(),
        };
        let previous = document.root.attribute(attribute.name).unwrap_or_default().to_string();
        match wanted {
            Some(value) => {
                if previous != value {
                    document.root.set_attribute(attribute.name, value.as_str());
                    changes.push(Change {
                        target: Target::Attribute(attribute.name),
                        from: previous,
                        to: value,
                    });
                }
            }
            None => {
                document.root.remove_attribute(attribute.name);
                if !previous.is_empty() {
                    changes.push(Change {
                        target: Target::Attribute(attribute.name),
                        from: previous,
                        to: String::new(),
                    });
                }
            }
        }
    }

    for collection in schema.collections {
        let items: &[Element] = match desired.get(collection.name) {
            None => continue,
            Some(Value::Items(items)) => items.as_slice(),
            Some(value) if value.text().is_none() => &[],
            Some(_) => {
                log::warn!("ignoring text for collection {}.{}", schema.tag, collection.name);
                continue;
            }
        };
        let wrapper = element_slot(schema, &mut document.root, collection.name);
        reconcile_items(collection.name, collection.identity, wrapper, items, &mut changes);
    }

    if let Some(name) = name.filter(|n| !n.is_empty()) {
        let previous = document.root.attribute("name").unwrap_or_default().to_string();
        if previous != name {
            document.root.set_attribute("name", name);
            changes.push(Change {
                target: Target::Attribute("name"),
                from: previous,
                to: name.to_string(),
            });
        }
    }

    log::debug!("merged {} with {} change(s)", schema.tag, changes.len());
    Merge { document, changes }
}

/// Set membership of `wrapper` to exactly `desired`, by identity.
fn reconcile_items(
    collection: &'static str,
    identity: &str,
    wrapper: &mut Element,
    desired: &[Element],
    changes: &mut Vec<Change>,
) {
    let wanted: HashSet<&str> = desired.iter().filter_map(|i| i.attribute(identity)).collect();

    let mut kept = HashSet::new();
    let mut removed = Vec::new();
    wrapper.children.retain(|item| {
        let id = item.attribute(identity).unwrap_or_default().to_string();
        let keep = wanted.contains(id.as_str()) && kept.insert(id.clone());
        if !keep {
            removed.push(id);
        }
        keep
    });
    for id in removed {
        log::debug!("{collection}: removing {id}");
        changes.push(Change {
            target: Target::ItemRemoved {
                collection,
                identity: id.clone(),
            },
            from: id,
            to: String::new(),
        });
    }

    for item in desired {
        let Some(id) = item.attribute(identity) else {
            log::warn!("{collection}: skipping item without {identity}");
            continue;
        };
        if kept.insert(id.to_string()) {
            log::debug!("{collection}: adding {id}");
            wrapper.children.push(item.clone());
            changes.push(Change {
                target: Target::ItemAdded {
                    collection,
                    identity: id.to_string(),
                },
                from: String::new(),
                to: id.to_string(),
            });
        }
    }
}

/// The child element `name`, inserted at its schema position when missing.
fn element_slot<'a>(schema: &ResourceType, root: &'a mut Element, name: &str) -> &'a mut Element {
    let index = match root.children.iter().position(|c| c.name == name) {
        Some(index) => index,
        None => {
            let order = schema.element_order(name).unwrap_or(usize::MAX);
            let at = root
                .children
                .iter()
                .position(|c| schema.element_order(&c.name).is_some_and(|o| o > order))
                .unwrap_or_else(|| {
                    root.children
                        .iter()
                        .rposition(|c| schema.element_order(&c.name).is_some_and(|o| o < order))
                        .map_or(root.children.len(), |i| i + 1)
                });
            root.children.insert(at, Element::new(name));
            at
        }
    };
    &mut root.children[index]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeDef, CollectionDef, FieldDef};

    static SITE: ResourceType = ResourceType::new("site", "sites")
        .with_fields(&[
            FieldDef::text("host").required(),
            FieldDef::text("domain").required(),
            FieldDef::text("description").preserved(),
            FieldDef::flag("active", false),
        ])
        .with_attributes(&[AttributeDef::text("name")]);

    static PROPERTY: ResourceType = ResourceType::new("property", "properties")
        .with_fields(&[
            FieldDef::text("value").cdata_when("clob"),
            FieldDef::text("defaultValue").preserved().cdata_when("clob"),
            FieldDef::text("description").preserved(),
        ])
        .with_attributes(&[AttributeDef::text("name"), AttributeDef::flag("clob")]);

    static GROUP: ResourceType = ResourceType::new("group", "groups")
        .with_fields(&[FieldDef::text("description").preserved()])
        .with_attributes(&[AttributeDef::text("name")])
        .with_collections(&[CollectionDef::named("roles")]);

    fn role(name: &str) -> Element {
        Element::new("role")
            .with_attribute("name", name)
            .with_child(Element::new("application").with_text("cms"))
    }

    fn site(host: &str, description: &str) -> Document {
        let desired = DesiredState::new()
            .set("host", host)
            .set("domain", "example.org")
            .set("description", description)
            .set("active", true);
        merge(&SITE, &Document::template(&SITE), &desired, Some("s1"), MergeMode::Create).document
    }

    #[test]
    fn test_create_applies_input_and_defaults() {
        let desired = DesiredState::new().set("host", "h").set("domain", "d");
        let merged = merge(&SITE, &Document::template(&SITE), &desired, Some("s1"), MergeMode::Create);
        assert!(merged.changed());
        assert_eq!(merged.document.field("host"), Some("h"));
        assert_eq!(merged.document.field("active"), Some("false"));
        assert_eq!(merged.document.name(), Some("s1"));
    }

    #[test]
    fn test_idempotent_when_desired_matches() {
        let current = site("h", "main site");
        let desired = DesiredState::from_document(&SITE, &current);
        let merged = merge(&SITE, &current, &desired, Some("s1"), MergeMode::Update);
        assert!(!merged.changed());
        assert_eq!(merged.document, current);
    }

    #[test]
    fn test_update_preserves_omitted_preserved_field() {
        let current = site("h", "main site");
        let desired = DesiredState::new().set("host", "h2").set("domain", "example.org");
        let merged = merge(&SITE, &current, &desired, Some("s1"), MergeMode::Update);
        assert_eq!(merged.document.field("description"), Some("main site"));
        assert_eq!(merged.document.field("host"), Some("h2"));
    }

    #[test]
    fn test_update_clears_omitted_field() {
        let current = site("h", "main site");
        let desired = DesiredState::new().set("host", "h").set("domain", "example.org");
        let merged = merge(&SITE, &current, &desired, Some("s1"), MergeMode::Update);
        assert_eq!(merged.document.field("active"), Some(""));
        assert_eq!(
            merged.changes,
            vec![Change {
                target: Target::Field("active"),
                from: "true".to_string(),
                to: String::new(),
            }]
        );
    }

    #[test]
    fn test_explicit_clear_overrides_preservation() {
        let current = site("h", "main site");
        for desired in [
            DesiredState::new().clear("description"),
            DesiredState::new().set("description", ""),
            DesiredState::new().set("description", "None"),
        ] {
            let merged = merge(&SITE, &current, &desired, Some("s1"), MergeMode::Update);
            assert_eq!(merged.document.field("description"), Some(""));
        }
    }

    #[test]
    fn test_cdata_follows_clob_attribute() {
        let desired = DesiredState::new()
            .set("value", "<p>long</p>")
            .set("clob", true);
        let merged = merge(
            &PROPERTY,
            &Document::template(&PROPERTY),
            &desired,
            Some("p"),
            MergeMode::Create,
        );
        let value = merged.document.root.child("value").unwrap();
        assert!(value.cdata);
        assert_eq!(merged.document.attribute("clob"), Some("true"));
        assert!(merged.document.to_xml().unwrap().contains("<![CDATA[<p>long</p>]]>"));

        let plain = DesiredState::new().set("value", "short");
        let merged = merge(&PROPERTY, &merged.document, &plain, Some("p"), MergeMode::Update);
        assert!(!merged.document.root.child("value").unwrap().cdata);
        assert_eq!(merged.document.attribute("clob"), None);
        assert!(merged.changes.iter().any(|c| c.target == Target::Attribute("clob")));
    }

    #[test]
    fn test_missing_field_inserted_in_order() {
        let current = Document::new(
            Element::new("site")
                .with_child(Element::new("host").with_text("h"))
                .with_child(Element::new("active").with_text("true")),
        );
        let desired = DesiredState::new()
            .set("host", "h")
            .set("domain", "d")
            .set("active", true);
        let merged = merge(&SITE, &current, &desired, None, MergeMode::Update);
        let order: Vec<_> = merged.document.root.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(order, vec!["host", "domain", "active"]);
        assert_eq!(merged.changes.len(), 1);
    }

    #[test]
    fn test_child_collection_replaces_membership() {
        let mut current = Document::template(&GROUP);
        current.root.set_attribute("name", "g");
        current.root.child_mut("roles").unwrap().children = vec![role("A"), role("B")];

        let desired = DesiredState::new().items("roles", vec![role("B"), role("C"), role("C")]);
        let merged = merge(&GROUP, &current, &desired, Some("g"), MergeMode::Update);

        assert_eq!(merged.document.item_names("roles", "name"), vec!["B", "C"]);
        let summary = merged.summary();
        assert_eq!(summary.added, 1);
        assert_eq!(summary.removed, 1);
        assert_eq!(summary.total(), 2);
    }

    #[test]
    fn test_child_collection_order_independent() {
        let mut current = Document::template(&GROUP);
        current.root.child_mut("roles").unwrap().children = vec![role("B"), role("A")];
        let desired = DesiredState::new().items("roles", vec![role("C"), role("B")]);
        let merged = merge(&GROUP, &current, &desired, None, MergeMode::Update);
        let mut names = merged.document.item_names("roles", "name");
        names.sort();
        assert_eq!(names, vec!["B", "C"]);
    }

    #[test]
    fn test_child_collection_untouched_when_absent() {
        let mut current = Document::template(&GROUP);
        current.root.child_mut("roles").unwrap().children = vec![role("A")];
        let desired = DesiredState::new().set("description", "d");
        let merged = merge(&GROUP, &current, &desired, None, MergeMode::Update);
        assert_eq!(merged.document.item_names("roles", "name"), vec!["A"]);
    }

    #[test]
    fn test_child_collection_cleared_and_inserted() {
        let mut current = Document::template(&GROUP);
        current.root.child_mut("roles").unwrap().children = vec![role("A")];
        let merged = merge(&GROUP, &current, &DesiredState::new().clear("roles"), None, MergeMode::Update);
        assert!(merged.document.items("roles").is_empty());

        let bare = Document::new(Element::new("group"));
        let desired = DesiredState::new().items("roles", vec![role("A")]);
        let merged = merge(&GROUP, &bare, &desired, None, MergeMode::Update);
        assert_eq!(merged.document.item_names("roles", "name"), vec!["A"]);
    }

    #[test]
    fn test_name_rewrite_only_counts_when_different() {
        let current = site("h", "d");
        let desired = DesiredState::from_document(&SITE, &current);
        let renamed = merge(&SITE, &current, &desired, Some("s2"), MergeMode::Update);
        assert_eq!(renamed.changes.len(), 1);
        assert_eq!(renamed.document.name(), Some("s2"));
        assert_eq!(renamed.changes[0].to_string(), "@name: 's1' -> 's2'");
    }

    #[test]
    fn test_check_rejects_unknown_keys() {
        assert!(DesiredState::new().set("host", "h").check(&SITE).is_ok());
        let err = DesiredState::new().set("hots", "h").check(&SITE).unwrap_err();
        assert!(matches!(err, Error::UnknownField { ref field, .. } if field == "hots"));
    }

    #[test]
    fn test_desired_state_helpers() {
        let state: DesiredState = [("active", "TRUE"), ("host", "none")].into_iter().collect();
        assert!(state.is_truthy("active"));
        assert_eq!(state.text("host"), None);
        assert_eq!(state.len(), 2);
        assert!(DesiredState::new().is_empty());
    }
}
