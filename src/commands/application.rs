//! Application assignment to sites.

use anyhow::{Context as AnyhowContext, Result};
use appng::Client;

use crate::Context;
use crate::ui;

pub fn assign(ctx: &Context, client: &Client, application: &str, site: &str) -> Result<()> {
    let mut app = client.application(application);
    let document = app
        .assign(site)
        .with_context(|| format!("Could not assign application({application}) to site({site})"))?;
    if ctx.verbose > 0 {
        super::print_document(&document)?;
    }
    ui::success(&format!("Assigned application({application}) to site({site})"));
    Ok(())
}

/// Remove an application from one site, or from all of them.
pub fn deassign(
    ctx: &Context,
    client: &Client,
    application: &str,
    site: Option<&str>,
    all: bool,
) -> Result<()> {
    let mut app = client.application(application);
    if all {
        let sites = app
            .deassign_all()
            .with_context(|| format!("Could not deassign application({application})"))?;
        if sites.is_empty() {
            if !ctx.quiet {
                ui::info(&format!("application({application}) is not assigned to any site"));
            }
        } else {
            ui::success(&format!(
                "Deassigned application({application}) from {}",
                sites.join(", ")
            ));
        }
        return Ok(());
    }

    let site = site.context("Pass --site or --all")?;
    app.deassign(site).with_context(|| {
        format!("Could not deassign application({application}) from site({site})")
    })?;
    ui::success(&format!("Deassigned application({application}) from site({site})"));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing;

    fn seed(mock: &appng::MockBackend) {
        mock.insert_xml("/application/cms", r#"<application name="cms"/>"#)
            .unwrap();
        mock.insert_xml("/site/main", r#"<site name="main"/>"#).unwrap();
    }

    #[test]
    fn test_assign_and_deassign() {
        let (ctx, client, mock) = testing::setup();
        seed(&mock);
        assign(&ctx, &client, "cms", "main").unwrap();
        assert!(mock.document("/site/main/application/cms").is_some());

        assert!(assign(&ctx, &client, "cms", "main").is_err());

        deassign(&ctx, &client, "cms", Some("main"), false).unwrap();
        assert!(mock.document("/site/main/application/cms").is_none());
    }

    #[test]
    fn test_deassign_all() {
        let (ctx, client, mock) = testing::setup();
        seed(&mock);
        assign(&ctx, &client, "cms", "main").unwrap();
        deassign(&ctx, &client, "cms", None, true).unwrap();
        assert!(mock.document("/site/main/application/cms").is_none());
    }

    #[test]
    fn test_deassign_needs_site() {
        let (ctx, client, mock) = testing::setup();
        seed(&mock);
        assert!(deassign(&ctx, &client, "cms", None, false).is_err());
    }
}
