//! Document validation seam.

use crate::document::Document;
use crate::error::{Error, Result};
use crate::schema::{FieldKind, ResourceType};

/// Checks a document before it is sent.
pub trait Validator: Send + Sync {
    /// Return `Err(Error::Validation)` listing every problem found.
    fn validate(&self, schema: &ResourceType, document: &Document) -> Result<()>;
}

/// Validates against the declarative resource schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl Validator for SchemaValidator {
    fn validate(&self, schema: &ResourceType, document: &Document) -> Result<()> {
        let mut problems = Vec::new();

        if document.tag() != schema.tag {
            problems.push(format!(
                "root element is '{}', expected '{}'",
                document.tag(),
                schema.tag
            ));
        }

        for field in schema.fields {
            let text = document.field(field.name).unwrap_or_default();
            if field.required && text.is_empty() {
                problems.push(format!("{} is required", field.name));
            }
            if let Some(problem) = check_kind(field.name, field.kind, text) {
                problems.push(problem);
            }
        }

        for attribute in schema.attributes {
            let value = document.attribute(attribute.name).unwrap_or_default();
            if let Some(problem) = check_kind(attribute.name, attribute.kind, value) {
                problems.push(problem);
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation {
                resource: schema.tag.to_string(),
                problems,
            })
        }
    }
}

/// Accepts every document.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl Validator for AcceptAll {
    fn validate(&self, _schema: &ResourceType, _document: &Document) -> Result<()> {
        Ok(())
    }
}

fn check_kind(name: &str, kind: FieldKind, text: &str) -> Option<String> {
    if text.is_empty() {
        return None;
    }
    match kind {
        FieldKind::Text => None,
        FieldKind::Bool if text == "true" || text == "false" => None,
        FieldKind::Bool => Some(format!("{name} must be true or false, got '{text}'")),
        FieldKind::Choice(options) if options.contains(&text) => None,
        FieldKind::Choice(options) => Some(format!(
            "{name} must be one of {}, got '{text}'",
            options.join(", ")
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Element;
    use crate::merge::{DesiredState, MergeMode, merge};
    use crate::schema::{AttributeDef, FieldDef};

    static REPO: ResourceType = ResourceType::new("repository", "repositories")
        .with_fields(&[
            FieldDef::text("uri").with_default("file:/").required(),
            FieldDef::flag("enabled", false),
            FieldDef::choice("mode", "ALL", &["ALL", "STABLE", "SNAPSHOT"]),
        ])
        .with_attributes(&[AttributeDef::text("name"), AttributeDef::flag("clob")]);

    #[test]
    fn test_template_is_valid() {
        assert!(SchemaValidator.validate(&REPO, &Document::template(&REPO)).is_ok());
    }

    #[test]
    fn test_collects_every_problem() {
        let desired = DesiredState::new()
            .clear("uri")
            .set("enabled", "yes")
            .set("mode", "NIGHTLY")
            .set("clob", "maybe");
        let merged = merge(&REPO, &Document::template(&REPO), &desired, Some("r"), MergeMode::Update);
        let err = SchemaValidator.validate(&REPO, &merged.document).unwrap_err();
        match err {
            Error::Validation { resource, problems } => {
                assert_eq!(resource, "repository");
                assert_eq!(problems.len(), 4);
                assert!(problems[0].contains("uri is required"));
                assert!(problems[2].contains("ALL, STABLE, SNAPSHOT"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_wrong_root() {
        let doc = Document::new(Element::new("site"));
        assert!(SchemaValidator.validate(&REPO, &doc).is_err());
        assert!(AcceptAll.validate(&REPO, &doc).is_ok());
    }

    #[test]
    fn test_empty_flag_is_valid() {
        let desired = DesiredState::new().set("uri", "file:/tmp");
        let merged = merge(&REPO, &Document::template(&REPO), &desired, Some("r"), MergeMode::Update);
        assert_eq!(merged.document.field("enabled"), Some(""));
        assert!(SchemaValidator.validate(&REPO, &merged.document).is_ok());
    }
}
