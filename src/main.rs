mod cli;
mod commands;
mod config;
mod ui;

use anyhow::{Context as AnyhowContext, Result};
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use config::ConnectionConfig;
use std::io;
use std::process::ExitCode;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    if let Command::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "appngizer", &mut io::stdout());
        return Ok(());
    }

    let connection = ConnectionConfig::resolve(&cli.connection)?;
    let client = appng::Client::connect(
        &connection.url,
        &connection.sharedsecret,
        &connection.http_options(),
    )
    .with_context(|| format!("Could not connect to {}", connection.url))?;

    commands::run(&ctx, &client, cli.command)
}

/// Print the error chain and, for client errors, what to do about it.
fn report(err: &anyhow::Error) {
    ui::error(&format!("{err:#}"));
    if let Some(client_error) = err.downcast_ref::<appng::Error>() {
        let category = client_error.category();
        ui::dim_err(&format!("{}: {}", category.description(), category.advice()));
    }
}
