//! Site grants of a site application.

use anyhow::{Context as AnyhowContext, Result};
use appng::{Client, Outcome};
use colored::Colorize;

use crate::Context;
use crate::ui;

/// Print the grants, or apply `--grant` entries when given.
pub fn run(
    ctx: &Context,
    client: &Client,
    site: &str,
    application: &str,
    grants: &[(String, bool)],
) -> Result<()> {
    let label = format!("grants of application({application}) on site({site})");
    let mut entity = client.grants(site, application);

    if grants.is_empty() {
        let current = entity
            .read()
            .with_context(|| format!("Could not read {label}"))?;
        ui::header(&label);
        for (target, granted) in current {
            let state = if granted {
                "granted".green()
            } else {
                "denied".dimmed()
            };
            ui::kv(&target, &state.to_string());
        }
        return Ok(());
    }

    let desired: Vec<(&str, bool)> = grants.iter().map(|(s, g)| (s.as_str(), *g)).collect();
    let outcome = entity
        .update(&desired)
        .with_context(|| format!("Could not update {label}"))?;
    match outcome {
        Outcome::NoChange => {
            if !ctx.quiet {
                ui::info(&format!("{label} are up to date"));
            }
        }
        _ => ui::success(&format!("Updated {label}")),
    }
    Ok(())
}
