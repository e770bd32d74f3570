//! XML-shaped document tree and its wire codec.

use crate::error::{Error, Result};
use crate::schema::ResourceType;
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::fmt;

/// Namespace placed on the root of every outgoing document.
pub const NAMESPACE: &str = "http://www.appng.org/schema/appngizer";

/// One element: tag, root attributes, text and child elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    /// Text is written as a CDATA section.
    pub cdata: bool,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(key, value);
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, keeping its position when it already exists.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    /// Remove an attribute, returning its previous value.
    pub fn remove_attribute(&mut self, key: &str) -> Option<String> {
        let index = self.attributes.iter().position(|(k, _)| k == key)?;
        Some(self.attributes.remove(index).1)
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }
}

/// A resource document rooted at an element tagged with the resource type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub root: Element,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    /// Build the schema-default document: declared attributes with a
    /// non-empty default, then every field in order, then empty collections.
    pub fn template(schema: &ResourceType) -> Self {
        let mut root = Element::new(schema.tag);
        for attribute in schema.attributes.iter().filter(|a| !a.default.is_empty()) {
            root.set_attribute(attribute.name, attribute.default);
        }
        for field in schema.fields {
            root.children
                .push(Element::new(field.name).with_text(field.default));
        }
        for collection in schema.collections {
            root.children.push(Element::new(collection.name));
        }
        Self { root }
    }

    /// Parse a document, keeping local names and dropping namespace declarations.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => stack.push(element_from_start(&start)?),
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    close(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let mut element = stack
                        .pop()
                        .ok_or_else(|| Error::xml("unexpected closing tag"))?;
                    // Indentation between child elements is not text.
                    if !element.children.is_empty() && is_blank(&element.text) {
                        element.text.clear();
                    }
                    close(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        let text = text.unescape()?;
                        if !(current.cdata && is_blank(&text)) {
                            current.text.push_str(&text);
                        }
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = stack.last_mut() {
                        let raw = String::from_utf8(data.into_inner().into_owned())
                            .map_err(Error::xml)?;
                        if !current.cdata && is_blank(&current.text) {
                            current.text.clear();
                        }
                        current.text.push_str(&raw);
                        current.cdata = true;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(Error::xml("unexpected end of document"));
        }
        root.map(Self::new)
            .ok_or_else(|| Error::xml("document has no root element"))
    }

    /// Serialize with the namespace on the root.
    pub fn to_xml(&self) -> Result<String> {
        self.write(Writer::new(Vec::new()))
    }

    /// Serialize with two-space indentation.
    pub fn to_pretty_xml(&self) -> Result<String> {
        self.write(Writer::new_with_indent(Vec::new(), b' ', 2))
    }

    fn write(&self, mut writer: Writer<Vec<u8>>) -> Result<String> {
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        write_element(&mut writer, &self.root, Some(NAMESPACE))?;
        String::from_utf8(writer.into_inner()).map_err(Error::xml)
    }

    pub fn tag(&self) -> &str {
        &self.root.name
    }

    /// Text of a field element.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.root.child(name).map(|c| c.text.as_str())
    }

    /// Set the text of an existing field element.
    pub fn set_field(&mut self, name: &str, text: impl Into<String>) -> bool {
        match self.root.child_mut(name) {
            Some(element) => {
                element.text = text.into();
                true
            }
            None => false,
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.root.attribute(key)
    }

    /// The `name` attribute, if set and non-empty.
    pub fn name(&self) -> Option<&str> {
        self.attribute("name").filter(|n| !n.is_empty())
    }

    /// The value of the schema's identity attribute.
    pub fn identity(&self, schema: &ResourceType) -> Option<&str> {
        self.attribute(schema.identity).filter(|n| !n.is_empty())
    }

    /// Item elements of a child collection.
    pub fn items(&self, collection: &str) -> Vec<&Element> {
        self.root
            .child(collection)
            .map(|c| c.children.iter().collect())
            .unwrap_or_default()
    }

    /// Identity attributes of a child collection's items.
    pub fn item_names(&self, collection: &str, identity: &str) -> Vec<String> {
        self.items(collection)
            .into_iter()
            .filter_map(|item| item.attribute(identity))
            .map(str::to_string)
            .collect()
    }

    /// Declared fields and their text, in schema order.
    pub fn fields(&self, schema: &ResourceType) -> Vec<(&'static str, String)> {
        schema
            .fields
            .iter()
            .map(|f| (f.name, self.field(f.name).unwrap_or_default().to_string()))
            .collect()
    }

    /// Split a listing document into one document per child element.
    pub fn split(self) -> Vec<Self> {
        self.root.children.into_iter().map(Self::new).collect()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_pretty_xml() {
            Ok(xml) => f.write_str(&xml),
            Err(_) => write!(f, "<{}/>", self.root.name),
        }
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element> {
    let name = std::str::from_utf8(start.local_name().as_ref())
        .map_err(Error::xml)?
        .to_string();
    let mut element = Element::new(name);
    for attribute in start.attributes() {
        let attribute = attribute?;
        if attribute.key.as_namespace_binding().is_some() {
            continue;
        }
        let key = std::str::from_utf8(attribute.key.local_name().as_ref())
            .map_err(Error::xml)?
            .to_string();
        let value = attribute.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn is_blank(text: &str) -> bool {
    text.chars().all(char::is_whitespace)
}

fn close(stack: &mut Vec<Element>, root: &mut Option<Element>, element: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(Error::xml("multiple root elements")),
    }
    Ok(())
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    element: &Element,
    namespace: Option<&str>,
) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    if let Some(namespace) = namespace {
        start.push_attribute(("xmlns", namespace));
    }
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.text.is_empty() && element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    if !element.text.is_empty() {
        // "]]>" cannot appear inside a CDATA section
        if element.cdata && !element.text.contains("]]>") {
            writer.write_event(Event::CData(BytesCData::new(element.text.as_str())))?;
        } else {
            writer.write_event(Event::Text(BytesText::new(&element.text)))?;
        }
    }
    for child in &element.children {
        write_element(writer, child, None)?;
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}
