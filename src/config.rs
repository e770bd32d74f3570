use anyhow::{Context, Result, bail};
use appng::HttpOptions;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::ConnectionArgs;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("appngizer"))
}

/// Default connection file
pub fn default_connection_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("connection.json"))
}

// ============================================================================
// Connection Config
// ============================================================================

/// Where and how to reach appNGizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub url: String,
    pub sharedsecret: String,
    pub timeout_secs: u64,
}

/// Partial settings read from a connection file.
#[derive(Debug, Default, Deserialize)]
struct ConnectionFile {
    url: Option<String>,
    sharedsecret: Option<String>,
    timeout_secs: Option<u64>,
}

impl ConnectionFile {
    /// Load a connection file, TOML for `.toml` and JSON otherwise
    fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&content)
                .with_context(|| format!("Invalid TOML in {}", path.display()))
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON in {}", path.display()))
        }
    }
}

impl ConnectionConfig {
    /// Resolve connection settings from flags, the `--connection` file or the
    /// default file. Flags win over file values.
    pub fn resolve(args: &ConnectionArgs) -> Result<Self> {
        let fallback = default_connection_path().ok();
        Self::resolve_with(args, fallback.as_deref())
    }

    fn resolve_with(args: &ConnectionArgs, fallback: Option<&Path>) -> Result<Self> {
        let file = match &args.connection {
            Some(path) => {
                let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
                ConnectionFile::load(Path::new(&expanded))?
            }
            None => match fallback.filter(|p| p.exists()) {
                Some(path) => {
                    log::debug!("Using connection file {}", path.display());
                    ConnectionFile::load(path)?
                }
                None => ConnectionFile::default(),
            },
        };

        let url = args.url.clone().or(file.url).filter(|u| !u.is_empty());
        let secret = args
            .secret
            .clone()
            .or(file.sharedsecret)
            .filter(|s| !s.is_empty());
        let (Some(url), Some(sharedsecret)) = (url, secret) else {
            bail!(
                "No appNGizer connection configured. Pass --url and --secret \
                 (or APPNGIZER_URL/APPNGIZER_SECRET), --connection <file>, \
                 or create ~/.config/appngizer/connection.json"
            );
        };

        Ok(Self {
            url,
            sharedsecret,
            timeout_secs: args
                .timeout
                .or(file.timeout_secs)
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        })
    }

    pub fn http_options(&self) -> HttpOptions {
        HttpOptions {
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}
