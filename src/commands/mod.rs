//! Command implementations and the helpers they share.

pub mod application;
pub mod database;
pub mod grants;
pub mod package;
pub mod reload;
pub mod resource;

use anyhow::{Result, bail};
use appng::{Client, DesiredState, Document, Element, Parent, ResourceKind};
use std::collections::BTreeMap;

use crate::Context;
use crate::cli::{Command, ScopeArgs, StateArgs};

/// Link attribute the server adds to every element.
const SELF_LINK: &str = "self";

pub fn run(ctx: &Context, client: &Client, command: Command) -> Result<()> {
    match command {
        Command::Read(target) => resource::read(client, &target),
        Command::List { kind, scope } => resource::list(ctx, client, &kind, &scope),
        Command::Create { target, state } => resource::create(ctx, client, &target, &state),
        Command::Update { target, state } => resource::update(ctx, client, &target, &state),
        Command::Check { target, state } => resource::check(ctx, client, &target, &state),
        Command::Delete { target, yes } => resource::delete(ctx, client, &target, yes),
        Command::Install(args) => package::install(ctx, client, &args),
        Command::Upgrade(args) => package::upgrade(ctx, client, &args),
        Command::Packages {
            name,
            repository,
            filter,
        } => package::search(client, &name, repository.as_deref(), &filter),
        Command::Assign { application, site } => {
            application::assign(ctx, client, &application, &site)
        }
        Command::Deassign {
            application,
            site,
            all,
        } => application::deassign(ctx, client, &application, site.as_deref(), all),
        Command::Grants {
            site,
            application,
            grant,
        } => grants::run(ctx, client, &site, &application, &grant),
        Command::Database(args) => database::run(ctx, client, &args),
        Command::Reload { site } => reload::run(ctx, client, site.as_deref()),
        // Handled before connecting
        Command::Completions { .. } => Ok(()),
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Resolve a type tag given on the command line.
pub fn kind(tag: &str) -> Result<ResourceKind> {
    match ResourceKind::from_tag(tag) {
        Some(kind) => Ok(kind),
        None => {
            let known: Vec<&str> = ResourceKind::ALL.iter().map(|k| k.tag()).collect();
            bail!("Unknown resource type '{tag}', expected one of: {}", known.join(", "))
        }
    }
}

/// Parents of a resource from the scope flags, outermost first.
///
/// Properties without a site or application belong to the platform.
pub fn parents(kind: ResourceKind, scope: &ScopeArgs) -> Vec<Parent> {
    let mut parents = Vec::new();
    if let Some(site) = &scope.site {
        parents.push(Parent::site(site));
    }
    if let Some(application) = &scope.application
        && kind != ResourceKind::Application
    {
        parents.push(Parent::application(application));
    }
    if let Some(repository) = &scope.repository {
        parents.push(Parent::repository(repository));
    }
    if parents.is_empty() && kind == ResourceKind::Property {
        parents.push(Parent::platform());
    }
    parents
}

/// Build the desired state of a resource from `--set`, `--child` and `--clob`.
pub fn desired(kind: ResourceKind, state: &StateArgs) -> Result<DesiredState> {
    let mut desired = DesiredState::new();
    for (key, value) in &state.set {
        desired.insert(key.as_str(), value.as_str());
    }
    if state.clob {
        desired.insert("clob", true);
    }

    let mut collections: BTreeMap<&str, Vec<Element>> = BTreeMap::new();
    for (collection, name) in &state.child {
        let collections_of = kind.schema().collections;
        let Some(def) = collections_of.iter().find(|c| c.name == collection.as_str()) else {
            bail!("{kind} has no collection '{collection}'");
        };
        collections
            .entry(def.name)
            .or_default()
            .push(member(def.name, def.identity, name)?);
    }
    for (collection, items) in collections {
        desired.insert(collection, appng::Value::Items(items));
    }
    Ok(desired)
}

/// One collection member. Roles belong to an application and are written
/// as `application:role`.
fn member(collection: &str, identity: &str, name: &str) -> Result<Element> {
    let tag: &str = ResourceKind::from_tag(collection).map_or(collection, |kind| kind.tag());
    if tag != ResourceKind::Role.tag() {
        return Ok(Element::new(tag).with_attribute(identity, name));
    }
    match name.split_once(':') {
        Some((application, role)) if !application.is_empty() && !role.is_empty() => {
            Ok(Element::new(tag)
                .with_attribute(identity, role)
                .with_child(Element::new("application").with_text(application)))
        }
        _ => bail!("Roles are given as application:role, got '{name}'"),
    }
}

/// Copy of `element` without the server's link attributes.
fn strip_links(element: &Element) -> Element {
    let mut stripped = element.clone();
    stripped.remove_attribute(SELF_LINK);
    stripped.children = element.children.iter().map(strip_links).collect();
    stripped
}

/// Render a document for output.
pub fn render(document: &Document) -> Result<String> {
    Ok(Document::new(strip_links(&document.root)).to_pretty_xml()?)
}

pub fn print_document(document: &Document) -> Result<()> {
    println!("{}", render(document)?);
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_defaults_to_platform() {
        let platform = parents(ResourceKind::Property, &ScopeArgs::default());
        assert_eq!(platform, vec![Parent::platform()]);

        let scope = ScopeArgs {
            site: Some("main".into()),
            application: Some("cms".into()),
            ..ScopeArgs::default()
        };
        let scoped = parents(ResourceKind::Property, &scope);
        assert_eq!(scoped, vec![Parent::site("main"), Parent::application("cms")]);
    }

    #[test]
    fn test_application_ignores_own_scope() {
        let scope = ScopeArgs {
            application: Some("cms".into()),
            ..ScopeArgs::default()
        };
        assert!(parents(ResourceKind::Application, &scope).is_empty());
        assert_eq!(parents(ResourceKind::Role, &scope), vec![Parent::application("cms")]);
    }

    #[test]
    fn test_desired_from_flags() {
        let state = StateArgs {
            set: vec![("value".into(), "42".into()), ("description".into(), "none".into())],
            child: vec![],
            clob: true,
        };
        let state = desired(ResourceKind::Property, &state).unwrap();
        assert_eq!(state.text("value").as_deref(), Some("42"));
        assert_eq!(state.text("description"), None);
        assert!(state.is_truthy("clob"));
    }

    #[test]
    fn test_desired_collections() {
        let state = StateArgs {
            child: vec![
                ("roles".into(), "cms:editor".into()),
                ("roles".into(), "shop:admin".into()),
            ],
            ..StateArgs::default()
        };
        let group = desired(ResourceKind::Group, &state).unwrap();
        let Some(appng::Value::Items(items)) = group.get("roles") else {
            panic!("expected roles");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "role");
        assert_eq!(items[0].attribute("name"), Some("editor"));
        assert_eq!(items[0].child("application").unwrap().text, "cms");

        let bad = StateArgs {
            child: vec![("roles".into(), "editor".into())],
            ..StateArgs::default()
        };
        assert!(desired(ResourceKind::Group, &bad).is_err());

        let unknown = StateArgs {
            child: vec![("roles".into(), "x".into())],
            ..StateArgs::default()
        };
        assert!(desired(ResourceKind::Site, &unknown).is_err());
    }

    #[test]
    fn test_subject_groups() {
        let state = StateArgs {
            child: vec![("groups".into(), "admins".into())],
            ..StateArgs::default()
        };
        let subject = desired(ResourceKind::Subject, &state).unwrap();
        let Some(appng::Value::Items(items)) = subject.get("groups") else {
            panic!("expected groups");
        };
        assert_eq!(items[0].name, "group");
        assert_eq!(items[0].attribute("name"), Some("admins"));
    }

    #[test]
    fn test_render_strips_links() {
        let document = Document::parse(
            r#"<site name="s" self="http://x/site/s"><host self="h">a</host></site>"#,
        )
        .unwrap();
        let xml = render(&document).unwrap();
        assert!(!xml.contains("self="));
        assert!(xml.contains("<host>a</host>"));
    }

    #[test]
    fn test_unknown_kind() {
        assert!(kind("gadget").is_err());
        assert_eq!(kind("Sites").unwrap(), ResourceKind::Site);
    }
}
