//! Resource kinds and their schemas.

use reconcile::{AttributeDef, CollectionDef, FieldDef, ResourceType};
use std::fmt;

const BOOL_FALSE: bool = false;

pub static PLATFORM: ResourceType = ResourceType::new("platform", "platform");

pub static SITE: ResourceType = ResourceType::new("site", "sites")
    .with_fields(&[
        FieldDef::text("host").required(),
        FieldDef::text("domain").required(),
        FieldDef::text("description").preserved(),
        FieldDef::flag("active", BOOL_FALSE),
        FieldDef::flag("createRepositoryPath", BOOL_FALSE),
    ])
    .with_attributes(&[AttributeDef::text("name")]);

pub static REPOSITORY: ResourceType = ResourceType::new("repository", "repositories")
    .with_fields(&[
        FieldDef::text("description").preserved(),
        FieldDef::text("remoteName"),
        FieldDef::text("uri").with_default("file:/").required(),
        FieldDef::flag("enabled", BOOL_FALSE),
        FieldDef::flag("strict", BOOL_FALSE),
        FieldDef::flag("published", BOOL_FALSE),
        FieldDef::choice("mode", "ALL", &["ALL", "STABLE", "SNAPSHOT"]),
        FieldDef::choice("type", "LOCAL", &["LOCAL", "REMOTE"]),
    ])
    .with_attributes(&[AttributeDef::text("name")]);

pub static PROPERTY: ResourceType = ResourceType::new("property", "properties")
    .with_fields(&[
        FieldDef::text("value").cdata_when("clob"),
        FieldDef::text("defaultValue").preserved().cdata_when("clob"),
        FieldDef::text("description").preserved(),
    ])
    .with_attributes(&[AttributeDef::text("name"), AttributeDef::flag("clob")]);

pub static APPLICATION: ResourceType = ResourceType::new("application", "applications")
    .with_fields(&[
        FieldDef::text("displayName").preserved(),
        FieldDef::flag("core", BOOL_FALSE),
        FieldDef::flag("fileBased", BOOL_FALSE),
        FieldDef::flag("hidden", BOOL_FALSE),
        FieldDef::text("version"),
    ])
    .with_attributes(&[AttributeDef::text("name")]);

pub static PACKAGE: ResourceType = ResourceType::new("package", "packages")
    .with_segment(None)
    .with_fields(&[
        FieldDef::text("displayName").preserved(),
        FieldDef::text("version"),
        FieldDef::text("timestamp"),
        FieldDef::text("release"),
        FieldDef::text("snapshot"),
        FieldDef::flag("installed", BOOL_FALSE),
        FieldDef::choice("type", "APPLICATION", &["APPLICATION", "TEMPLATE"]),
    ])
    .with_attributes(&[AttributeDef::text("name")]);

pub static SUBJECT: ResourceType = ResourceType::new("subject", "subjects")
    .with_fields(&[
        FieldDef::text("realName").required(),
        FieldDef::text("email").required(),
        FieldDef::text("description").preserved(),
        FieldDef::text("digest"),
        FieldDef::text("timeZone").with_default("Europe/Berlin"),
        FieldDef::text("language").with_default("en"),
        FieldDef::choice(
            "type",
            "LOCAL_USER",
            &["LOCAL_USER", "GLOBAL_USER", "GLOBAL_GROUP"],
        ),
    ])
    .with_attributes(&[AttributeDef::text("name")])
    .with_collections(&[CollectionDef::named("groups")]);

pub static GROUP: ResourceType = ResourceType::new("group", "groups")
    .with_fields(&[FieldDef::text("description").preserved()])
    .with_attributes(&[AttributeDef::text("name")])
    .with_collections(&[CollectionDef::named("roles")]);

pub static ROLE: ResourceType = ResourceType::new("role", "roles")
    .with_fields(&[
        FieldDef::text("application").from_parent("application"),
        FieldDef::text("description").preserved(),
    ])
    .with_attributes(&[AttributeDef::text("name")])
    .with_collections(&[CollectionDef::named("permissions")]);

pub static PERMISSION: ResourceType = ResourceType::new("permission", "permissions")
    .with_fields(&[
        FieldDef::text("application").from_parent("application"),
        FieldDef::text("description").preserved(),
    ])
    .with_attributes(&[AttributeDef::text("name")]);

pub static DATABASE: ResourceType = ResourceType::new("database", "databases")
    .with_identity("id")
    .with_fields(&[
        FieldDef::text("type").preserved(),
        FieldDef::text("user"),
        FieldDef::text("password"),
        FieldDef::text("dbVersion").preserved(),
        FieldDef::text("driver"),
        FieldDef::text("url"),
        FieldDef::text("ok").preserved(),
    ])
    .with_attributes(&[AttributeDef::text("id")]);

pub static GRANTS: ResourceType = ResourceType::new("grants", "grants").with_identity("site");

/// Operations of the generic entity engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Exists,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Exists => "exists",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Every resource type the endpoint manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Platform,
    Site,
    Repository,
    Property,
    Application,
    Package,
    Subject,
    Group,
    Role,
    Permission,
    Database,
    Grants,
}

impl ResourceKind {
    pub const ALL: [Self; 12] = [
        Self::Platform,
        Self::Site,
        Self::Repository,
        Self::Property,
        Self::Application,
        Self::Package,
        Self::Subject,
        Self::Group,
        Self::Role,
        Self::Permission,
        Self::Database,
        Self::Grants,
    ];

    /// The static schema of this kind.
    pub fn schema(self) -> &'static ResourceType {
        match self {
            Self::Platform => &PLATFORM,
            Self::Site => &SITE,
            Self::Repository => &REPOSITORY,
            Self::Property => &PROPERTY,
            Self::Application => &APPLICATION,
            Self::Package => &PACKAGE,
            Self::Subject => &SUBJECT,
            Self::Group => &GROUP,
            Self::Role => &ROLE,
            Self::Permission => &PERMISSION,
            Self::Database => &DATABASE,
            Self::Grants => &GRANTS,
        }
    }

    pub fn tag(self) -> &'static str {
        self.schema().tag
    }

    /// Find a kind by singular or plural tag, ignoring case.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| {
            let schema = kind.schema();
            schema.tag.eq_ignore_ascii_case(tag) || schema.plural.eq_ignore_ascii_case(tag)
        })
    }

    /// Whether instances are addressed without a name.
    pub fn is_singleton(self) -> bool {
        matches!(self, Self::Platform | Self::Database | Self::Grants)
    }

    /// Whether the generic entity engine offers `operation` for this kind.
    pub fn supports(self, operation: Operation) -> bool {
        use Operation::{Create, Delete, Exists, Read, Update};
        match self {
            Self::Platform => false,
            Self::Application => operation != Create,
            Self::Package | Self::Database | Self::Grants => {
                !matches!(operation, Create | Delete)
            }
            _ => matches!(operation, Read | Exists | Create | Update | Delete),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
