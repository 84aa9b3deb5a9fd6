//! Command-line argument parsing and configuration.
//!
//! Supports:
//! - CLI arguments via clap
//! - TOML configuration file
//! - Merging CLI with file config (CLI takes precedence)
//!
//! Credentials are deliberately NOT flags: `API_ID` / `API_HASH` come from
//! the environment (or a `.env` file) so they never land in shell history.

use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Telestash - a messaging service's cloud as personal file storage.
#[derive(Parser, Deserialize, Clone, Debug)]
#[command(author, version, about)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to a config file (TOML).
    #[clap(long)]
    #[serde(default)]
    pub config: Option<PathBuf>,

    /// Directory for all persistent data (metadata index, session, logs).
    /// Defaults to ~/.telestash/
    #[clap(long)]
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Storage chat to resolve on connect (ID, username, or "me").
    #[clap(long)]
    #[serde(default)]
    pub chat: Option<String>,

    /// Verbosity level (-v, -vv, -vvv).
    #[clap(short = 'v', long, action = clap::ArgAction::Count)]
    #[serde(default)]
    pub verbose: u8,
}

impl Args {
    /// Load Args from CLI + TOML file (if it exists).
    /// CLI values override those from the file.
    pub fn load() -> Self {
        let mut cli_args = Args::parse();

        // Resolve relative paths before anything changes directories.
        cli_args.data_dir = cli_args.data_dir.map(Self::resolve_path);

        if let Some(config_path) = cli_args.config.clone()
            && let Some(file_args) = Self::from_file(&config_path)
        {
            return Self::merge(file_args, cli_args);
        }

        let default_path = PathBuf::from("config.toml");
        if let Some(file_args) = Self::from_file(&default_path) {
            return Self::merge(file_args, cli_args);
        }

        cli_args
    }

    /// Resolve a potentially relative path to an absolute one.
    fn resolve_path(p: PathBuf) -> PathBuf {
        if p.is_absolute() {
            p
        } else {
            std::env::current_dir().unwrap_or_default().join(p)
        }
    }

    /// Load args from a TOML file.
    fn from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        let content = fs::read_to_string(path).ok()?;
        toml::from_str::<Args>(&content).ok()
    }

    /// Merge file args with CLI args (CLI takes precedence).
    fn merge(mut file: Args, cli: Args) -> Args {
        if cli.data_dir.is_some() {
            file.data_dir = cli.data_dir;
        }
        if cli.chat.is_some() {
            file.chat = cli.chat;
        }
        if cli.verbose > 0 {
            file.verbose = cli.verbose;
        }
        if cli.config.is_some() {
            file.config = cli.config;
        }
        file
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_file_values() {
        let file = Args {
            config: None,
            data_dir: Some(PathBuf::from("/from/file")),
            chat: Some("me".into()),
            verbose: 1,
        };
        let cli = Args {
            config: None,
            data_dir: Some(PathBuf::from("/from/cli")),
            chat: None,
            verbose: 0,
        };

        let merged = Args::merge(file, cli);
        assert_eq!(merged.data_dir, Some(PathBuf::from("/from/cli")));
        assert_eq!(merged.chat, Some("me".into()));
        assert_eq!(merged.verbose, 1);
    }

    #[test]
    fn toml_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "chat = \"@backups\"\nverbose = 2\n").unwrap();

        let args = Args::from_file(&path).unwrap();
        assert_eq!(args.chat, Some("@backups".into()));
        assert_eq!(args.verbose, 2);
    }
}
