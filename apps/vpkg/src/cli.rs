//! Command line interface definition

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use vpkg_config::ColorChoice;

/// vpkg - install upstream .deb packages on Void Linux
#[derive(Parser)]
#[command(name = "vpkg")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Install upstream .deb packages on Void Linux")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Color output control
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorChoice>,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Use alternate package set
    #[arg(id = "packages_path", long = "packages", global = true, value_name = "PATH")]
    pub packages: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Build and install packages from the package set
    #[command(alias = "i")]
    Install {
        /// Package names
        packages: Vec<String>,

        /// Rebuild and reinstall even if up to date
        #[arg(short, long)]
        force: bool,

        /// Update instead of install; without names, update every stale package
        #[arg(short, long)]
        update: bool,

        /// Do not ask for confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Update every installed package with a newer upstream release
    #[command(alias = "up")]
    Update {
        /// Rebuild and reinstall every converted package
        #[arg(short, long)]
        force: bool,

        /// Do not ask for confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// List converted packages
    #[command(alias = "ls")]
    List {
        /// List the package set instead, marking installed entries with `*`
        #[arg(short, long)]
        repository: bool,
    },
}

impl Commands {
    /// Whether the command skips confirmation prompts
    pub fn assume_yes(&self) -> bool {
        match self {
            Self::Install { yes, .. } | Self::Update { yes, .. } => *yes,
            Self::List { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_flags() {
        let cli = Cli::parse_from(["vpkg", "install", "-fy", "discord", "slack"]);
        match cli.command {
            Commands::Install {
                packages,
                force,
                update,
                yes,
            } => {
                assert_eq!(packages, vec!["discord", "slack"]);
                assert!(force);
                assert!(!update);
                assert!(yes);
            }
            _ => panic!("expected install"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["vpkg", "list", "--repository", "--json", "--color", "never"]);
        assert!(cli.global.json);
        assert_eq!(cli.global.color, Some(ColorChoice::Never));
        assert!(matches!(cli.command, Commands::List { repository: true }));
        assert!(!cli.command.assume_yes());
    }

    #[test]
    fn update_alias() {
        let cli = Cli::parse_from(["vpkg", "up", "-y"]);
        assert!(matches!(
            cli.command,
            Commands::Update {
                force: false,
                yes: true
            }
        ));
    }
}
