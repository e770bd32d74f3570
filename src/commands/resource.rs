//! Generic read, list, create, update, check and delete.

use anyhow::{Context as AnyhowContext, Result};
use appng::registry::{self, Resource};
use appng::{Client, Outcome, ResourceKind};
use dialoguer::Confirm;

use super::{desired, kind, parents, print_document, render};
use crate::Context;
use crate::cli::{ScopeArgs, StateArgs, TargetArgs};
use crate::ui;

/// `site(main)`, or the bare type for singletons.
fn label(kind: ResourceKind, name: Option<&str>) -> String {
    match name {
        Some(name) => format!("{kind}({name})"),
        None => kind.to_string(),
    }
}

fn construct<'c>(client: &'c Client, target: &TargetArgs) -> Result<(Resource<'c>, String)> {
    let kind = kind(&target.kind)?;
    let name = target.name.as_deref();
    let resource = registry::construct(client, kind.tag(), name, &parents(kind, &target.scope))?;
    Ok((resource, label(kind, name)))
}

pub fn read(client: &Client, target: &TargetArgs) -> Result<()> {
    let (mut resource, label) = construct(client, target)?;
    let document = resource
        .read()
        .with_context(|| format!("Could not read {label}"))?;
    print_document(&document)
}

pub fn list(ctx: &Context, client: &Client, tag: &str, scope: &ScopeArgs) -> Result<()> {
    let kind = kind(tag)?;
    let collection = client.collection(kind, parents(kind, scope));
    let entities = collection
        .list()
        .with_context(|| format!("Could not list {}", kind.schema().plural))?;

    if entities.is_empty() {
        if !ctx.quiet {
            ui::info(&format!("No {} found", kind.schema().plural));
        }
        return Ok(());
    }
    for entity in &entities {
        if ctx.verbose > 0 {
            print_document(entity.document())?;
        } else {
            println!("{}", entity.name().unwrap_or_default());
        }
    }
    Ok(())
}

pub fn create(ctx: &Context, client: &Client, target: &TargetArgs, state: &StateArgs) -> Result<()> {
    let (mut resource, label) = construct(client, target)?;
    let desired = desired(resource.kind(), state)?;
    let document = resource
        .create(&desired)
        .with_context(|| format!("Could not create {label}"))?;
    if !ctx.quiet {
        print_document(&document)?;
    }
    ui::success(&format!("Created {label}"));
    Ok(())
}

pub fn update(ctx: &Context, client: &Client, target: &TargetArgs, state: &StateArgs) -> Result<()> {
    let (mut resource, label) = construct(client, target)?;
    let desired = desired(resource.kind(), state)?;
    let outcome = resource
        .update(&desired)
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

/// Print what an update would change, without sending it.
pub fn check(ctx: &Context, client: &Client, target: &TargetArgs, state: &StateArgs) -> Result<()> {
    let (mut resource, label) = construct(client, target)?;
    let desired = desired(resource.kind(), state)?;
    let check = resource
        .check(&desired)
        .with_context(|| format!("Could not check {label}"))?;

    if !check.needed {
        ui::success(&format!("{label} is up to date"));
        return Ok(());
    }

    ui::header(&format!("{label}: {}", check.summary()));
    if ctx.verbose > 0 {
        for change in &check.changes {
            ui::dim(&change.to_string());
        }
    }
    if let Some(diff) = ui::line_diff(&render(&check.current)?, &render(&check.desired)?) {
        print!("{diff}");
    }
    Ok(())
}

pub fn delete(ctx: &Context, client: &Client, target: &TargetArgs, yes: bool) -> Result<()> {
    let (mut resource, label) = construct(client, target)?;
    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete {label}?"))
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;
        if !confirmed {
            if !ctx.quiet {
                ui::info("Nothing deleted");
            }
            return Ok(());
        }
    }
    resource
        .delete()
        .with_context(|| format!("Could not delete {label}"))?;
    ui::success(&format!("Deleted {label}"));
    Ok(())
}
