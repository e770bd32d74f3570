//! Sibling resources of one kind below the same parents.

use crate::Client;
use crate::entity::{Entity, Parent, address_of};
use crate::error::{Error, Result};
use crate::kind::ResourceKind;
use reconcile::{Address, Document, Version};
use std::collections::HashSet;

/// One variant of a package in one repository.
#[derive(Debug, Clone)]
pub struct PackageMatch {
    /// Repository the variant was found in.
    pub repository: String,
    pub document: Document,
}

impl PackageMatch {
    pub fn name(&self) -> &str {
        self.document.name().unwrap_or_default()
    }

    /// Text of a field, empty when absent.
    pub fn field(&self, name: &str) -> &str {
        self.document.field(name).unwrap_or_default()
    }

    pub fn version(&self) -> Version {
        Version::parse(self.field("version"))
    }

    pub fn timestamp(&self) -> &str {
        self.field("timestamp")
    }

    pub fn is_snapshot(&self) -> bool {
        self.field("snapshot") == "true" || self.version().is_snapshot()
    }

    pub fn is_installed(&self) -> bool {
        self.field("installed") == "true"
    }
}

/// Sort variants newest version first. Equal versions keep their order.
pub fn sort_by_version(matches: &mut [PackageMatch]) {
    matches.sort_by(|a, b| b.version().cmp(&a.version()));
}

/// All resources of one kind below the same parents.
#[derive(Debug, Clone)]
pub struct Collection<'c> {
    client: &'c Client,
    kind: ResourceKind,
    parents: Vec<Parent>,
}

impl<'c> Collection<'c> {
    pub fn new(client: &'c Client, kind: ResourceKind, parents: Vec<Parent>) -> Self {
        Self {
            client,
            kind,
            parents,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn address(&self) -> Address {
        address_of(&self.parents, self.kind, None)
    }

    /// Every member, with its listed document already loaded.
    pub fn list(&self) -> Result<Vec<Entity<'c>>> {
        if self.kind == ResourceKind::Package {
            return self.list_packages();
        }
        let listing = self.client.fetch(self.address().own())?;
        log::debug!("Listed {} {}", listing.root.children.len(), self.kind.schema().plural);
        Ok(listing
            .split()
            .into_iter()
            .map(|document| Entity::loaded(self.client, self.kind, self.parents.clone(), document))
            .collect())
    }

    /// Packages named in the repository document, one entity per name.
    fn list_packages(&self) -> Result<Vec<Entity<'c>>> {
        let repository = self
            .parents
            .iter()
            .find(|p| p.kind == ResourceKind::Repository)
            .ok_or_else(|| Error::rule("packages are listed per repository"))?;
        let address = address_of(&[], ResourceKind::Repository, repository.name.as_deref());
        let document = self.client.fetch(address.own())?;
        let mut seen = HashSet::new();
        Ok(document
            .items("packages")
            .into_iter()
            .filter(|item| item.attribute("name").is_some_and(|n| seen.insert(n.to_string())))
            .map(|item| {
                Entity::loaded(
                    self.client,
                    ResourceKind::Package,
                    self.parents.clone(),
                    Document::new(item.clone()),
                )
            })
            .collect())
    }

    /// Identities of every member, in listing order.
    pub fn names(&self) -> Result<Vec<String>> {
        Ok(self
            .list()?
            .iter()
            .filter_map(|e| e.name().map(str::to_string))
            .collect())
    }

    /// The member with this identity, if listed.
    pub fn get(&self, name: &str) -> Result<Option<Entity<'c>>> {
        Ok(self.list()?.into_iter().find(|e| e.name() == Some(name)))
    }

    /// Variants of a package whose fields equal every `(field, value)` pair.
    ///
    /// Searches the parent repository, or every repository without one.
    pub fn find(&self, name: &str, filter: &[(&str, &str)]) -> Result<Vec<PackageMatch>> {
        if self.kind != ResourceKind::Package {
            return Err(Error::NotAvailable {
                operation: "find",
                resource: self.kind.schema().plural.to_string(),
            });
        }
        let repositories = match self.parents.iter().find(|p| p.kind == ResourceKind::Repository) {
            Some(parent) => parent.name.iter().cloned().collect(),
            None => self.client.collection(ResourceKind::Repository, vec![]).names()?,
        };

        let mut matches = Vec::new();
        for repository in repositories {
            let address = address_of(
                &[Parent::repository(repository.as_str())],
                ResourceKind::Package,
                Some(name),
            );
            let variants = match self.client.fetch(address.own()) {
                Ok(document) => document,
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            };
            for variant in variants.split() {
                if filter
                    .iter()
                    .all(|(field, value)| variant.field(field).unwrap_or_default() == *value)
                {
                    matches.push(PackageMatch {
                        repository: repository.clone(),
                        document: variant,
                    });
                }
            }
        }
        log::debug!("Found {} variant(s) of package({name})", matches.len());
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use crate::MockBackend;

    fn variant(version: &str, timestamp: &str) -> String {
        format!(
            "<package name=\"cms\"><version>{version}</version><timestamp>{timestamp}</timestamp>\
             <snapshot>{}</snapshot><installed>false</installed></package>",
            version.ends_with("SNAPSHOT")
        )
    }

    fn repositories(mock: &MockBackend) {
        mock.insert_xml(
            "/repository/local",
            "<repository name=\"local\"><uri>file:/</uri>\
               <packages><package name=\"cms\"/><package name=\"cms\"/><package name=\"shop\"/></packages>\
             </repository>",
        )
        .unwrap();
        mock.insert_xml("/repository/remote", "<repository name=\"remote\"/>").unwrap();
        mock.insert_xml(
            "/repository/local/cms",
            &format!(
                "<packages>{}{}{}</packages>",
                variant("1.2.0", "1"),
                variant("1.10.0-SNAPSHOT", "2"),
                variant("1.10.0", "3")
            ),
        )
        .unwrap();
        mock.insert_xml(
            "/repository/remote/cms",
            &format!("<packages>{}</packages>", variant("1.2.0", "9")),
        )
        .unwrap();
    }

    #[test]
    fn test_list_and_names() {
        let (client, mock) = testing::client();
        mock.insert_xml("/site/b", r#"<site name="b"/>"#).unwrap();
        mock.insert_xml("/site/a", r#"<site name="a"/>"#).unwrap();

        let sites = client.collection(ResourceKind::Site, vec![]);
        assert_eq!(sites.address().own(), "/site");
        let listed = sites.list().unwrap();
        assert!(listed.iter().all(Entity::is_loaded));
        assert_eq!(sites.names().unwrap(), vec!["a", "b"]);
        assert!(sites.get("b").unwrap().is_some());
        assert!(sites.get("c").unwrap().is_none());
    }

    #[test]
    fn test_nested_listing() {
        let (client, mock) = testing::client();
        mock.insert_xml("/site/s1/property/x", r#"<property name="x"><value>1</value></property>"#)
            .unwrap();
        let properties = client.collection(ResourceKind::Property, vec![Parent::site("s1")]);
        let listed = properties.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].address().own(), "/site/s1/property/x");
        assert_eq!(listed[0].document().field("value"), Some("1"));
    }

    #[test]
    fn test_databases_are_keyed_by_id() {
        let (client, mock) = testing::client();
        mock.insert_xml("/platform/database/7", r#"<database id="7"><user>u</user></database>"#)
            .unwrap();
        let databases = client.collection(ResourceKind::Database, vec![Parent::platform()]);
        assert_eq!(databases.names().unwrap(), vec!["7"]);
    }

    #[test]
    fn test_list_packages_from_repository() {
        let (client, mock) = testing::client();
        repositories(&mock);
        let packages = client.collection(ResourceKind::Package, vec![Parent::repository("local")]);
        assert_eq!(packages.names().unwrap(), vec!["cms", "shop"]);
        let listed = packages.list().unwrap();
        assert_eq!(listed[0].address().own(), "/repository/local/cms");
    }

    #[test]
    fn test_find_filters_and_searches_all_repositories() {
        let (client, mock) = testing::client();
        repositories(&mock);
        let packages = client.collection(ResourceKind::Package, vec![]);

        let all = packages.find("cms", &[]).unwrap();
        assert_eq!(all.len(), 4);
        let old = packages.find("cms", &[("version", "1.2.0")]).unwrap();
        let found: Vec<_> = old.iter().map(|m| m.repository.as_str()).collect();
        assert_eq!(found, vec!["local", "remote"]);
        assert!(packages.find("nothing", &[]).unwrap().is_empty());
    }

    #[test]
    fn test_find_in_one_repository() {
        let (client, mock) = testing::client();
        repositories(&mock);
        let packages = client.collection(ResourceKind::Package, vec![Parent::repository("remote")]);
        let found = packages.find("cms", &[]).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].timestamp(), "9");
    }

    #[test]
    fn test_sort_by_version() {
        let (client, mock) = testing::client();
        repositories(&mock);
        let packages = client.collection(ResourceKind::Package, vec![Parent::repository("local")]);
        let mut found = packages.find("cms", &[]).unwrap();
        sort_by_version(&mut found);
        let versions: Vec<_> = found.iter().map(|m| m.field("version").to_string()).collect();
        assert_eq!(versions, vec!["1.10.0", "1.10.0-SNAPSHOT", "1.2.0"]);
        assert!(found[1].is_snapshot());
        assert!(!found[0].is_snapshot());
    }

    #[test]
    fn test_find_only_for_packages() {
        let (client, _) = testing::client();
        let sites = client.collection(ResourceKind::Site, vec![]);
        assert!(matches!(sites.find("x", &[]), Err(Error::NotAvailable { .. })));
    }
}
