use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "appngizer")]
#[command(version)]
#[command(about = "Reconcile appNG platform configuration through appNGizer", long_about = None)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Command,
}

// ============================================================================
// Connection
// ============================================================================

#[derive(Args, Debug, Default, Clone)]
pub struct ConnectionArgs {
    /// appNGizer base URL, e.g. http://localhost:8080/appNGizer
    #[arg(long, env = "APPNGIZER_URL", global = true)]
    pub url: Option<String>,

    /// Shared secret of the platform
    #[arg(long, env = "APPNGIZER_SECRET", global = true, hide_env_values = true)]
    pub secret: Option<String>,

    /// Connection file (JSON or TOML)
    #[arg(long, value_name = "FILE", global = true)]
    pub connection: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout: Option<u64>,
}

// ============================================================================
// Commands
// ============================================================================

#[derive(Subcommand)]
pub enum Command {
    /// Print one resource
    Read(TargetArgs),

    /// List every resource of a type
    List {
        /// Resource type (site, properties, role, ...)
        kind: String,

        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// Create a resource
    Create {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        state: StateArgs,
    },

    /// Update a resource when it differs from the desired state
    Update {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        state: StateArgs,
    },

    /// Show what an update would change
    Check {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        state: StateArgs,
    },

    /// Delete a resource
    Delete {
        #[command(flatten)]
        target: TargetArgs,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Install a package from a repository
    Install(PackageArgs),

    /// Upgrade an installed package
    Upgrade(PackageArgs),

    /// Search package variants
    Packages {
        /// Package name
        name: String,

        /// Only search this repository
        #[arg(long)]
        repository: Option<String>,

        /// Only variants whose field matches
        #[arg(long, value_name = "FIELD=VALUE", value_parser = parse_pair)]
        filter: Vec<(String, String)>,
    },

    /// Assign an application to a site
    Assign {
        /// Application name
        application: String,

        #[arg(long)]
        site: String,
    },

    /// Remove an application from a site
    Deassign {
        /// Application name
        application: String,

        #[arg(long, required_unless_present = "all")]
        site: Option<String>,

        /// Remove it from every site
        #[arg(long, conflicts_with = "site")]
        all: bool,
    },

    /// Show or update application grants of a site
    Grants {
        #[arg(long)]
        site: String,

        #[arg(long)]
        application: String,

        /// Grant (true) or revoke (false) access for a site
        #[arg(long, value_name = "SITE=BOOL", value_parser = parse_grant)]
        grant: Vec<(String, bool)>,
    },

    /// Show or update the database connection of a site application
    Database(DatabaseArgs),

    /// Reload the platform or one site
    Reload {
        #[arg(long)]
        site: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Shared arguments
// ============================================================================

/// Parents a resource lives below.
#[derive(Args, Debug, Default, Clone)]
pub struct ScopeArgs {
    #[arg(long)]
    pub site: Option<String>,

    #[arg(long)]
    pub application: Option<String>,

    #[arg(long)]
    pub repository: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Resource type (site, property, role, ...)
    pub kind: String,

    /// Resource name
    pub name: Option<String>,

    #[command(flatten)]
    pub scope: ScopeArgs,
}

#[derive(Args, Debug, Default, Clone)]
pub struct StateArgs {
    /// Field or attribute value; `none` clears it
    #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_pair)]
    pub set: Vec<(String, String)>,

    /// Collection member; roles are given as application:role
    #[arg(long = "child", value_name = "COLLECTION=NAME", value_parser = parse_pair)]
    pub child: Vec<(String, String)>,

    /// Store property values as CLOB
    #[arg(long)]
    pub clob: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PackageArgs {
    /// Package name
    pub name: String,

    /// Only use this repository
    #[arg(long)]
    pub repository: Option<String>,

    /// Exact version, latest when omitted
    #[arg(long)]
    pub version: Option<String>,

    /// Exact build timestamp
    #[arg(long)]
    pub timestamp: Option<String>,

    /// Allow snapshot versions
    #[arg(long)]
    pub snapshot: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DatabaseArgs {
    #[arg(long)]
    pub site: String,

    #[arg(long)]
    pub application: String,

    #[arg(long, requires_all = ["password", "driver", "jdbc_url"])]
    pub user: Option<String>,

    #[arg(long)]
    pub password: Option<String>,

    #[arg(long)]
    pub driver: Option<String>,

    #[arg(long = "jdbc-url")]
    pub jdbc_url: Option<String>,

    /// Salt for the password hash, the platform's shared secret by default
    #[arg(long)]
    pub salt: Option<String>,
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    if key.is_empty() {
        return Err(format!("missing key in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

fn parse_grant(raw: &str) -> Result<(String, bool), String> {
    let (site, value) = parse_pair(raw)?;
    let granted = value
        .parse()
        .map_err(|_| format!("expected true or false for site '{site}', got '{value}'"))?;
    Ok((site, granted))
}
