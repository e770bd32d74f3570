//! Database connection of a site application.

use anyhow::{Context as AnyhowContext, Result};
use appng::{Client, DatabaseSpec, Outcome};

use crate::Context;
use crate::cli::DatabaseArgs;
use crate::ui;

/// The desired connection, `None` when only reading.
fn spec(args: &DatabaseArgs) -> Option<DatabaseSpec> {
    Some(DatabaseSpec {
        user: args.user.clone()?,
        password: args.password.clone()?,
        driver: args.driver.clone()?,
        url: args.jdbc_url.clone()?,
        salt: args.salt.clone(),
    })
}

pub fn run(ctx: &Context, client: &Client, args: &DatabaseArgs) -> Result<()> {
    let label = format!(
        "database of application({}) on site({})",
        args.application, args.site
    );
    let mut database = client.database(&args.site, &args.application);

    let Some(spec) = spec(args) else {
        let document = database
            .read()
            .with_context(|| format!("Could not read {label}"))?;
        return super::print_document(document);
    };

    let outcome = database
        .update(&spec)
        .with_context(|| format!("Could not update {label}"))?;
    match outcome {
        Outcome::NoChange => {
            if !ctx.quiet {
                ui::info(&format!("{label} is up to date"));
            }
        }
        _ => ui::success(&format!("Updated {label}")),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing;

    const PATH: &str = "/site/main/application/cms/database";

    fn args(password: Option<&str>) -> DatabaseArgs {
        DatabaseArgs {
            site: "main".to_string(),
            application: "cms".to_string(),
            user: password.map(|_| "cms".to_string()),
            password: password.map(str::to_string),
            driver: password.map(|_| "org.mariadb.jdbc.Driver".to_string()),
            jdbc_url: password.map(|_| "jdbc:mariadb://db/cms".to_string()),
            salt: Some("pepper".to_string()),
        }
    }

    #[test]
    fn test_read_only_without_settings() {
        assert!(spec(&args(None)).is_none());
        let (ctx, client, mock) = testing::setup();
        mock.insert_xml(PATH, r#"<database id="1"><user>cms</user></database>"#)
            .unwrap();
        run(&ctx, &client, &args(None)).unwrap();
        assert!(mock.mutations().is_empty());
    }

    #[test]
    fn test_update_sends_password() {
        let (ctx, client, mock) = testing::setup();
        mock.insert_xml(
            PATH,
            r#"<database id="1"><type>MARIADB</type><user>cms</user><password>x</password></database>"#,
        )
        .unwrap();
        run(&ctx, &client, &args(Some("s3cret"))).unwrap();
        let stored = mock.document(PATH).unwrap();
        assert_eq!(stored.field("password"), Some("s3cret"));
        assert_eq!(stored.field("type"), Some("MARIADB"));
    }
}
