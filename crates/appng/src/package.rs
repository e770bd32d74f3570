//! Package variants and their installation.
//!
//! A package has no path segment of its own: `/repository/{r}/{name}` lists
//! every variant of `name` in repository `r`. Installing sends the chosen
//! variant to `/repository/{r}/install`, after which an application of the
//! same name exists.

use crate::Client;
use crate::backend::Method;
use crate::collection::{Collection, PackageMatch, sort_by_version};
use crate::entity::{Parent, address_of};
use crate::error::{Error, Result};
use crate::kind::ResourceKind;
use reconcile::{DesiredState, Document, MergeMode, Outcome, merge};

/// Which variant of a package to pick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageQuery {
    /// Exact version, or the latest when unset.
    pub version: Option<String>,
    /// Exact build timestamp.
    pub timestamp: Option<String>,
    /// Whether a snapshot may be chosen.
    pub allow_snapshot: bool,
}

impl PackageQuery {
    /// Create a query for the latest release.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    #[must_use]
    pub fn timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    #[must_use]
    pub fn snapshot(mut self, allow: bool) -> Self {
        self.allow_snapshot = allow;
        self
    }

    fn filter(&self) -> Vec<(&str, &str)> {
        let mut filter = Vec::new();
        if let Some(version) = &self.version {
            filter.push(("version", version.as_str()));
        }
        if let Some(timestamp) = &self.timestamp {
            filter.push(("timestamp", timestamp.as_str()));
        }
        filter
    }

    /// Query matching exactly this variant.
    fn exact(variant: &PackageMatch) -> Self {
        Self::new()
            .version(variant.field("version"))
            .timestamp(variant.timestamp())
            .snapshot(true)
    }
}

/// A package, looked up in one repository or in all of them.
#[derive(Debug, Clone)]
pub struct Package<'c> {
    client: &'c Client,
    name: String,
    repository: Option<String>,
}

impl<'c> Package<'c> {
    pub fn new(client: &'c Client, name: &str, repository: Option<&str>) -> Self {
        Self {
            client,
            name: name.to_string(),
            repository: repository.map(str::to_string),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn repository(&self) -> Option<&str> {
        self.repository.as_deref()
    }

    fn collection(&self) -> Collection<'c> {
        let parents = self.repository.iter().map(Parent::repository).collect();
        self.client.collection(ResourceKind::Package, parents)
    }

    fn not_found(&self, query: &PackageQuery) -> Error {
        let repository = self.repository.as_deref().unwrap_or("*");
        let mut path = format!("/repository/{repository}/{}", self.name);
        if let Some(version) = &query.version {
            path.push_str(&format!(" version {version}"));
        }
        Error::NotFound { path }
    }

    /// Matching variants, newest version first.
    pub fn variants(&self, query: &PackageQuery) -> Result<Vec<PackageMatch>> {
        let mut variants = self.collection().find(&self.name, &query.filter())?;
        sort_by_version(&mut variants);
        Ok(variants)
    }

    pub fn exists(&self, query: &PackageQuery) -> Result<bool> {
        Ok(!self.variants(query)?.is_empty())
    }

    /// The newest matching variant.
    pub fn read(&self, query: &PackageQuery) -> Result<PackageMatch> {
        self.variants(query)?
            .into_iter()
            .next()
            .ok_or_else(|| self.not_found(query))
    }

    /// The variant an install would pick: the newest match, skipping
    /// snapshots unless the query allows them.
    pub fn resolve(&self, query: &PackageQuery) -> Result<PackageMatch> {
        self.variants(query)?
            .into_iter()
            .find(|v| query.allow_snapshot || !v.is_snapshot())
            .ok_or_else(|| {
                let version = query.version.as_deref().unwrap_or("any release version");
                Error::rule(format!("package({}) is not available in {version}", self.name))
            })
    }

    /// Whether an application of this name exists.
    pub fn is_installed(&self) -> Result<bool> {
        self.client
            .entity(ResourceKind::Application, Some(&self.name), vec![])
            .exists()
    }

    /// The variant flagged as installed.
    pub fn read_installed(&self) -> Result<PackageMatch> {
        let query = PackageQuery::new();
        self.variants(&query)?
            .into_iter()
            .find(PackageMatch::is_installed)
            .ok_or_else(|| self.not_found(&query))
    }

    /// Whether the installed variant differs from the one `query` resolves to.
    pub fn is_update_needed(&self, query: &PackageQuery) -> Result<bool> {
        let desired = self.resolve(query)?;
        let installed = match self.read_installed() {
            Ok(installed) => installed,
            Err(e) if e.is_not_found() => return Ok(true),
            Err(e) => return Err(e),
        };
        Ok(installed.version() != desired.version()
            || (query.timestamp.is_some() && installed.timestamp() != desired.timestamp()))
    }

    fn push_install(&self, variant: &PackageMatch) -> Result<()> {
        let schema = ResourceKind::Package.schema();
        let desired = DesiredState::from_document(schema, &variant.document);
        let merged = merge(
            schema,
            &Document::template(schema),
            &desired,
            Some(&self.name),
            MergeMode::Create,
        );
        self.client.validate(ResourceKind::Package, &merged.document)?;
        let address = address_of(
            &[Parent::repository(variant.repository.as_str())],
            ResourceKind::Package,
            Some("install"),
        );
        self.client
            .send(Method::Put, address.own(), Some(&merged.document))?;
        if !self.is_installed()? {
            return Err(Error::rule(format!(
                "package({}) {} was sent for installation but is not installed",
                self.name,
                variant.version()
            )));
        }
        Ok(())
    }

    /// Install the variant `query` resolves to. Fails when already installed.
    pub fn install(&self, query: &PackageQuery) -> Result<PackageMatch> {
        if self.is_installed()? {
            return Err(Error::rule(format!(
                "package({}) is already installed, upgrade it instead",
                self.name
            )));
        }
        let variant = self.resolve(query)?;
        self.push_install(&variant)?;
        log::info!(
            "Installed package({}) {} from repository({})",
            self.name,
            variant.version(),
            variant.repository
        );
        Package::new(self.client, &self.name, Some(variant.repository.as_str()))
            .read(&PackageQuery::exact(&variant))
    }

    /// Install another variant over an installed package.
    pub fn update(&self, query: &PackageQuery) -> Result<Outcome> {
        if !self.is_installed()? {
            return Err(Error::rule(format!(
                "package({}) is not installed, install it first",
                self.name
            )));
        }
        let variant = self.resolve(query)?;
        let current = match self.read_installed() {
            Ok(installed) => Some(installed),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };
        if current.is_some_and(|c| {
            c.version() == variant.version() && c.timestamp() == variant.timestamp()
        }) {
            log::warn!("No update needed for package({})", self.name);
            return Ok(Outcome::NoChange);
        }
        self.push_install(&variant)?;
        log::info!(
            "Upgraded package({}) to {} from repository({})",
            self.name,
            variant.version(),
            variant.repository
        );
        Ok(Outcome::Modified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use crate::MockBackend;

    fn repository(mock: &MockBackend) {
        mock.insert_xml("/repository/local", r#"<repository name="local"/>"#)
            .unwrap();
        mock.insert_xml(
            "/repository/local/cms",
            "<packages>\
               <package name=\"cms\"><displayName>CMS</displayName><version>1.2.0</version>\
                 <timestamp>100</timestamp><snapshot>false</snapshot><installed>false</installed></package>\
               <package name=\"cms\"><displayName>CMS</displayName><version>1.11.0-SNAPSHOT</version>\
                 <timestamp>200</timestamp><snapshot>true</snapshot><installed>false</installed></package>\
             </packages>",
        )
        .unwrap();
    }

    #[test]
    fn test_resolve_skips_snapshots() {
        let (client, mock) = testing::client();
        repository(&mock);
        let package = client.package("cms", None);

        let release = package.resolve(&PackageQuery::new()).unwrap();
        assert_eq!(release.field("version"), "1.2.0");
        let snapshot = package.resolve(&PackageQuery::new().snapshot(true)).unwrap();
        assert_eq!(snapshot.field("version"), "1.11.0-SNAPSHOT");
        assert_eq!(snapshot.repository, "local");

        let err = package.resolve(&PackageQuery::new().version("1.11.0-SNAPSHOT")).unwrap_err();
        assert!(matches!(err, Error::BusinessRule(_)));
    }

    #[test]
    fn test_read_missing_version_is_not_found() {
        let (client, mock) = testing::client();
        repository(&mock);
        let package = client.package("cms", Some("local"));
        assert!(package.exists(&PackageQuery::new().version("1.2.0")).unwrap());
        assert!(!package.exists(&PackageQuery::new().version("9.9")).unwrap());
        assert!(package.read(&PackageQuery::new().version("9.9")).unwrap_err().is_not_found());
    }

    #[test]
    fn test_install_and_upgrade() {
        let (client, mock) = testing::client();
        repository(&mock);
        let package = client.package("cms", None);
        assert!(!package.is_installed().unwrap());
        assert!(package.read_installed().unwrap_err().is_not_found());

        let installed = package.install(&PackageQuery::new()).unwrap();
        assert!(installed.is_installed());
        assert_eq!(installed.field("version"), "1.2.0");
        assert!(package.is_installed().unwrap());
        let (_, path, body) = mock.bodies().last().cloned().unwrap();
        assert_eq!(path, "/repository/local/install");
        assert!(body.contains("<version>1.2.0</version>"));

        assert!(matches!(
            package.install(&PackageQuery::new()),
            Err(Error::BusinessRule(_))
        ));
        assert!(!package.is_update_needed(&PackageQuery::new()).unwrap());
        assert_eq!(package.update(&PackageQuery::new()).unwrap(), Outcome::NoChange);

        let snapshot = PackageQuery::new().snapshot(true);
        assert!(package.is_update_needed(&snapshot).unwrap());
        assert_eq!(package.update(&snapshot).unwrap(), Outcome::Modified);
        assert_eq!(
            package.read_installed().unwrap().field("version"),
            "1.11.0-SNAPSHOT"
        );
    }

    #[test]
    fn test_update_requires_installed() {
        let (client, mock) = testing::client();
        repository(&mock);
        let err = client.package("cms", None).update(&PackageQuery::new()).unwrap_err();
        assert!(err.to_string().contains("not installed"));
        assert!(mock.mutations().is_empty());
    }

    #[test]
    fn test_install_unknown_version_sends_nothing() {
        let (client, mock) = testing::client();
        repository(&mock);
        let result = client
            .package("cms", None)
            .install(&PackageQuery::new().version("3.0.0"));
        assert!(matches!(result, Err(Error::BusinessRule(_))));
        assert!(mock.mutations().is_empty());
    }
}
