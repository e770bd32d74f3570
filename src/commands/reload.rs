use anyhow::{Context as AnyhowContext, Result};
use appng::Client;

use crate::Context;
use crate::ui;

/// Reload one site, or the whole platform when no site is given.
pub fn run(ctx: &Context, client: &Client, site: Option<&str>) -> Result<()> {
    let Some(site) = site else {
        client
            .platform()
            .reload()
            .context("Could not reload the platform")?;
        ui::success("Reloaded platform");
        return Ok(());
    };

    let reloaded = client
        .site(site)
        .reload()
        .with_context(|| format!("Could not reload site({site})"))?;
    if reloaded {
        ui::success(&format!("Reloaded site({site})"));
    } else if !ctx.quiet {
        ui::warn(&format!("site({site}) does not exist, nothing reloaded"));
    }
    Ok(())
}
