//! Declarative resource schemas.
//!
//! A [`ResourceType`] is a static, ordered description of one resource kind.
//! Field, attribute and collection order is significant: it drives template
//! construction and the on-wire element order of merged documents.

/// Value domain of a field or attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text.
    Text,
    /// `true`, `false` or empty.
    Bool,
    /// One of a fixed set of values, or empty.
    Choice(&'static [&'static str]),
}

/// How a field's text is written on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Escaped character data.
    Text,
    /// Always a CDATA section.
    Cdata,
    /// A CDATA section when the named desired attribute is true.
    CdataWhen(&'static str),
}

/// Where a field's desired value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    /// Supplied by the caller.
    Input,
    /// Filled from the name of the nearest parent with this type tag.
    ParentName(&'static str),
}

/// One element-valued field of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    /// Element name.
    pub name: &'static str,
    /// Template text.
    pub default: &'static str,
    /// Value domain.
    pub kind: FieldKind,
    /// Keeps its prior value when omitted from an update.
    pub preserved: bool,
    /// Must be non-empty to pass validation.
    pub required: bool,
    /// Wire encoding.
    pub encoding: Encoding,
    /// Value source.
    pub source: FieldSource,
}

impl FieldDef {
    /// A free text field with an empty default.
    #[must_use]
    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            default: "",
            kind: FieldKind::Text,
            preserved: false,
            required: false,
            encoding: Encoding::Text,
            source: FieldSource::Input,
        }
    }

    /// A boolean field.
    #[must_use]
    pub const fn flag(name: &'static str, default: bool) -> Self {
        Self {
            default: if default { "true" } else { "false" },
            kind: FieldKind::Bool,
            ..Self::text(name)
        }
    }

    /// A field restricted to `options`.
    #[must_use]
    pub const fn choice(
        name: &'static str,
        default: &'static str,
        options: &'static [&'static str],
    ) -> Self {
        Self {
            default,
            kind: FieldKind::Choice(options),
            ..Self::text(name)
        }
    }

    /// Set the template text.
    #[must_use]
    pub const fn with_default(self, default: &'static str) -> Self {
        Self { default, ..self }
    }

    /// Mark as preserved.
    #[must_use]
    pub const fn preserved(self) -> Self {
        Self {
            preserved: true,
            ..self
        }
    }

    /// Mark as required.
    #[must_use]
    pub const fn required(self) -> Self {
        Self {
            required: true,
            ..self
        }
    }

    /// Always CDATA-encode.
    #[must_use]
    pub const fn cdata(self) -> Self {
        Self {
            encoding: Encoding::Cdata,
            ..self
        }
    }

    /// CDATA-encode when the desired attribute `attribute` is true.
    #[must_use]
    pub const fn cdata_when(self, attribute: &'static str) -> Self {
        Self {
            encoding: Encoding::CdataWhen(attribute),
            ..self
        }
    }

    /// Fill from the name of the nearest parent tagged `tag`.
    #[must_use]
    pub const fn from_parent(self, tag: &'static str) -> Self {
        Self {
            source: FieldSource::ParentName(tag),
            ..self
        }
    }
}

/// One root attribute of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDef {
    /// Attribute name.
    pub name: &'static str,
    /// Template value; empty means absent.
    pub default: &'static str,
    /// Value domain.
    pub kind: FieldKind,
}

impl AttributeDef {
    /// A free text attribute.
    #[must_use]
    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            default: "",
            kind: FieldKind::Text,
        }
    }

    /// A boolean attribute with no template value.
    #[must_use]
    pub const fn flag(name: &'static str) -> Self {
        Self {
            name,
            default: "",
            kind: FieldKind::Bool,
        }
    }
}

/// A child collection holding sub-resource elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionDef {
    /// Wrapper element name.
    pub name: &'static str,
    /// Attribute identifying each item.
    pub identity: &'static str,
}

impl CollectionDef {
    /// A collection whose items are identified by `name`.
    #[must_use]
    pub const fn named(name: &'static str) -> Self {
        Self {
            name,
            identity: "name",
        }
    }
}

/// Declarative metadata for one resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceType {
    /// Root element name and type tag.
    pub tag: &'static str,
    /// Root element name of a listing of this type.
    pub plural: &'static str,
    /// Path segment; `None` when addresses omit the type.
    pub segment: Option<&'static str>,
    /// Root attribute identifying an instance in a listing.
    pub identity: &'static str,
    /// Ordered fields.
    pub fields: &'static [FieldDef],
    /// Ordered root attributes.
    pub attributes: &'static [AttributeDef],
    /// Ordered child collections, placed after the fields.
    pub collections: &'static [CollectionDef],
}

impl ResourceType {
    /// A type with no fields, addressed by its own tag and identified by `name`.
    #[must_use]
    pub const fn new(tag: &'static str, plural: &'static str) -> Self {
        Self {
            tag,
            plural,
            segment: Some(tag),
            identity: "name",
            fields: &[],
            attributes: &[],
            collections: &[],
        }
    }

    #[must_use]
    pub const fn with_fields(self, fields: &'static [FieldDef]) -> Self {
        Self { fields, ..self }
    }

    #[must_use]
    pub const fn with_attributes(self, attributes: &'static [AttributeDef]) -> Self {
        Self { attributes, ..self }
    }

    #[must_use]
    pub const fn with_collections(self, collections: &'static [CollectionDef]) -> Self {
        Self {
            collections,
            ..self
        }
    }

    #[must_use]
    pub const fn with_segment(self, segment: Option<&'static str>) -> Self {
        Self { segment, ..self }
    }

    #[must_use]
    pub const fn with_identity(self, identity: &'static str) -> Self {
        Self { identity, ..self }
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&AttributeDef> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Look up a collection by name.
    pub fn collection(&self, name: &str) -> Option<&CollectionDef> {
        self.collections.iter().find(|c| c.name == name)
    }

    /// Whether `key` names a field, attribute or collection.
    pub fn declares(&self, key: &str) -> bool {
        self.field(key).is_some() || self.attribute(key).is_some() || self.collection(key).is_some()
    }

    /// Position of an element among declared fields and collections.
    pub fn element_order(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .map(|f| f.name)
            .chain(self.collections.iter().map(|c| c.name))
            .position(|n| n == name)
    }

    /// Names of the preserved fields.
    pub fn preserved_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().filter(|f| f.preserved).map(|f| f.name)
    }
}
