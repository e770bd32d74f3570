//! Database connection of a site-application.
//!
//! The server stores the password hashed, so comparing connections hashes
//! the desired password with the same salt first. The update itself sends
//! the plaintext password.

use crate::Client;
use crate::entity::{Entity, Parent, UpdateCheck};
use crate::error::{Error, Result};
use crate::kind::ResourceKind;
use reconcile::{DesiredState, Document, Outcome};

/// Platform property used as salt when none is given.
pub const SALT_PROPERTY: &str = "sharedSecret";

/// Desired connection settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseSpec {
    pub user: String,
    pub password: String,
    pub driver: String,
    pub url: String,
    /// Salt for hashing; the platform's shared secret when unset.
    pub salt: Option<String>,
}

impl DatabaseSpec {
    fn desired(&self, password: &str) -> DesiredState {
        DesiredState::new()
            .set("user", self.user.as_str())
            .set("password", password)
            .set("driver", self.driver.as_str())
            .set("url", self.url.as_str())
    }
}

/// Connection settings of one application on one site.
#[derive(Debug, Clone)]
pub struct Database<'c> {
    entity: Entity<'c>,
}

impl<'c> Database<'c> {
    pub fn new(client: &'c Client, site: &str, application: &str) -> Self {
        let parents = vec![Parent::site(site), Parent::application(application)];
        Self {
            entity: Entity::new(client, ResourceKind::Database, None, parents),
        }
    }

    pub fn entity(&self) -> &Entity<'c> {
        &self.entity
    }

    pub fn entity_mut(&mut self) -> &mut Entity<'c> {
        &mut self.entity
    }

    pub fn read(&mut self) -> Result<&Document> {
        self.entity.read()
    }

    /// Whether a connection document exists for the site-application.
    pub fn exists(&mut self) -> Result<bool> {
        self.entity.exists()
    }

    fn salt(&self, spec: &DatabaseSpec) -> Result<String> {
        if let Some(salt) = spec.salt.as_deref().filter(|s| !s.is_empty()) {
            return Ok(salt.to_string());
        }
        let client = self.entity.client();
        let mut property = client.entity(
            ResourceKind::Property,
            Some(SALT_PROPERTY),
            vec![Parent::platform()],
        );
        let salt = property.read()?.field("value").unwrap_or_default().to_string();
        if salt.is_empty() {
            return Err(Error::rule(format!(
                "no salt given and platform property {SALT_PROPERTY} is empty"
            )));
        }
        Ok(salt)
    }

    /// Compare `spec` with the stored connection, password hashed.
    pub fn is_update_needed(&mut self, spec: &DatabaseSpec) -> Result<UpdateCheck> {
        let salt = self.salt(spec)?;
        let hashed = self.entity.client().hasher().hash(&spec.password, &salt)?;
        self.entity.is_update_needed(&spec.desired(&hashed))
    }

    /// Update the connection when it differs, sending the plaintext password.
    pub fn update(&mut self, spec: &DatabaseSpec) -> Result<Outcome> {
        if !self.is_update_needed(spec)?.needed {
            log::warn!("No update needed for {}", self.entity);
            return Ok(Outcome::NoChange);
        }
        let check = self.entity.is_update_needed(&spec.desired(&spec.password))?;
        self.entity.push(&check.desired)?;
        log::info!("Updated {}", self.entity);
        Ok(Outcome::Modified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use crate::MockBackend;

    const PATH: &str = "/site/main/application/cms/database";

    fn spec(password: &str) -> DatabaseSpec {
        DatabaseSpec {
            user: "cms".to_string(),
            password: password.to_string(),
            driver: "org.mariadb.jdbc.Driver".to_string(),
            url: "jdbc:mariadb://db/cms".to_string(),
            salt: None,
        }
    }

    fn stored(mock: &MockBackend, client: &Client, password: &str) {
        mock.insert_xml(
            "/platform/property/sharedSecret",
            r#"<property name="sharedSecret"><value>pepper</value></property>"#,
        )
        .unwrap();
        let hash = client.hasher().hash(password, "pepper").unwrap();
        mock.insert_xml(
            PATH,
            &format!(
                "<database id=\"3\"><type>MARIADB</type><user>cms</user><password>{hash}</password>\
                 <dbVersion>10.6</dbVersion><driver>org.mariadb.jdbc.Driver</driver>\
                 <url>jdbc:mariadb://db/cms</url><ok>true</ok></database>"
            ),
        )
        .unwrap();
    }

    #[test]
    fn test_same_password_needs_no_update() {
        let (client, mock) = testing::client();
        stored(&mock, &client, "s3cret");
        let mut database = client.database("main", "cms");
        assert!(database.exists().unwrap());

        let check = database.is_update_needed(&spec("s3cret")).unwrap();
        assert!(!check.needed, "{:?}", check.changes);
        assert_eq!(database.update(&spec("s3cret")).unwrap(), Outcome::NoChange);
        assert!(mock.mutations().is_empty());
    }

    #[test]
    fn test_changed_password_sends_plaintext() {
        let (client, mock) = testing::client();
        stored(&mock, &client, "s3cret");
        let mut database = client.database("main", "cms");

        assert!(database.is_update_needed(&spec("other")).unwrap().needed);
        assert_eq!(database.update(&spec("other")).unwrap(), Outcome::Modified);

        let (_, path, body) = mock.bodies().last().cloned().unwrap();
        assert_eq!(path, PATH);
        assert!(body.contains("<password>other</password>"));
        assert!(body.contains("<dbVersion>10.6</dbVersion>"));
        assert!(body.contains("id=\"3\""));
    }

    #[test]
    fn test_explicit_salt() {
        let (client, mock) = testing::client();
        stored(&mock, &client, "s3cret");
        let mut database = client.database("main", "cms");
        let salted = DatabaseSpec {
            salt: Some("other salt".to_string()),
            ..spec("s3cret")
        };
        assert!(database.is_update_needed(&salted).unwrap().needed);
    }

    #[test]
    fn test_missing_salt_property() {
        let (client, mock) = testing::client();
        mock.insert_xml(PATH, r#"<database id="3"/>"#).unwrap();
        let err = client
            .database("main", "cms")
            .is_update_needed(&spec("x"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_database_cannot_be_created_or_deleted() {
        let (client, _) = testing::client();
        let mut database = client.database("main", "cms");
        assert!(matches!(
            database.entity_mut().delete(),
            Err(Error::NotAvailable { operation: "delete", .. })
        ));
        assert!(matches!(
            database.entity_mut().create(&DesiredState::new()),
            Err(Error::NotAvailable { operation: "create", .. })
        ));
    }
}
