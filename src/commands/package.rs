//! Package install, upgrade and search.

use anyhow::{Context as AnyhowContext, Result};
use appng::{Client, Outcome, PackageMatch, PackageQuery, ResourceKind};
use colored::Colorize;

use crate::Context;
use crate::cli::PackageArgs;
use crate::ui;

fn query(args: &PackageArgs) -> PackageQuery {
    let mut query = PackageQuery::new().snapshot(args.snapshot);
    if let Some(version) = &args.version {
        query = query.version(version);
    }
    if let Some(timestamp) = &args.timestamp {
        query = query.timestamp(timestamp);
    }
    query
}

fn describe(variant: &PackageMatch) -> String {
    let mut text = format!("{} {}", variant.name(), variant.version());
    if !variant.timestamp().is_empty() {
        text.push_str(&format!(" ({})", variant.timestamp()));
    }
    text
}

pub fn install(ctx: &Context, client: &Client, args: &PackageArgs) -> Result<()> {
    let package = client.package(&args.name, args.repository.as_deref());
    let installed = package
        .install(&query(args))
        .with_context(|| format!("Could not install package({})", args.name))?;
    ui::success(&format!(
        "Installed {} from repository({})",
        describe(&installed),
        installed.repository
    ));
    if !ctx.quiet {
        ui::dim("Assign it to a site with 'appngizer assign'");
    }
    Ok(())
}

pub fn upgrade(ctx: &Context, client: &Client, args: &PackageArgs) -> Result<()> {
    let package = client.package(&args.name, args.repository.as_deref());
    let outcome = package
        .update(&query(args))
        .with_context(|| format!("Could not upgrade package({})", args.name))?;
    match outcome {
        Outcome::NoChange => {
            if !ctx.quiet {
                ui::info(&format!("package({}) is up to date", args.name));
            }
        }
        _ => {
            let installed = package.read_installed()?;
            ui::success(&format!("Upgraded to {}", describe(&installed)));
        }
    }
    Ok(())
}

/// Print every variant matching the filter, newest first.
pub fn search(
    client: &Client,
    name: &str,
    repository: Option<&str>,
    filter: &[(String, String)],
) -> Result<()> {
    let filter: Vec<(&str, &str)> = filter
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    let parents = repository
        .map(|r| vec![appng::Parent::repository(r)])
        .unwrap_or_default();
    let mut variants = client
        .collection(ResourceKind::Package, parents)
        .find(name, &filter)
        .with_context(|| format!("Could not search package({name})"))?;
    appng::collection::sort_by_version(&mut variants);

    if variants.is_empty() {
        ui::warn(&format!("No variants of package({name}) found"));
        return Ok(());
    }
    ui::header(&format!("package({name})"));
    for variant in &variants {
        let marker = if variant.is_installed() {
            "installed".green().to_string()
        } else if variant.is_snapshot() {
            "snapshot".yellow().to_string()
        } else {
            String::new()
        };
        ui::kv(&variant.repository, &format!("{} {marker}", describe(variant)));
    }
    Ok(())
}
