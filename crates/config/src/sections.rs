//! Configuration file sections

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use vpkg_types::RevertPolicy;

/// Output format for CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Plain,
    #[default]
    Tty,
    Json,
}

/// Color output choice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    Always,
    #[default]
    Auto,
    Never,
}

/// General application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default)]
    pub default_output: OutputFormat,
    #[serde(default)]
    pub color: ColorChoice,
    /// Skip the confirmation prompt before committing a transaction
    #[serde(default)]
    pub assume_yes: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_output: OutputFormat::Tty,
            color: ColorChoice::Auto,
            assume_yes: false,
        }
    }
}

/// Path configuration. Unset entries fall back to the defaults in
/// [`crate::constants`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathConfig {
    pub packages: Option<PathBuf>,
    pub work_dir: Option<PathBuf>,
    pub binpkgs: Option<PathBuf>,
    pub shlibs: Option<PathBuf>,
}

/// Acquisition pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Worker pool size, 0 = one per CPU
    #[serde(default)]
    pub workers: usize,
    /// Target architecture, defaults to the host's
    #[serde(default)]
    pub architecture: Option<String>,
    #[serde(default)]
    pub revert_policy: RevertPolicy,
    /// Leave the work directory in place after a run
    #[serde(default)]
    pub keep_work_dir: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            architecture: None,
            revert_policy: RevertPolicy::default(),
            keep_work_dir: false,
        }
    }
}

/// External converter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    #[serde(default = "default_converter_program")]
    pub program: PathBuf,
    /// Flags passed before the per-package arguments
    #[serde(default = "default_converter_args")]
    pub extra_args: Vec<String>,
    /// Run `xdeb -SQ` before converting anything
    #[serde(default = "default_true")]
    pub refresh_shlibs: bool,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            program: default_converter_program(),
            extra_args: default_converter_args(),
            refresh_shlibs: true,
        }
    }
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_timeout")]
    pub timeout: u64, // seconds
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64, // seconds
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            retries: default_retries(),
            retry_delay: default_retry_delay(),
            user_agent: default_user_agent(),
        }
    }
}

/// Transaction engine programs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_install_program")]
    pub install_program: PathBuf,
    #[serde(default = "default_rindex_program")]
    pub rindex_program: PathBuf,
    /// Package database read for the installed-package snapshot
    #[serde(default = "default_pkgdb")]
    pub pkgdb: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            install_program: default_install_program(),
            rindex_program: default_rindex_program(),
            pkgdb: default_pkgdb(),
        }
    }
}

fn default_converter_program() -> PathBuf {
    PathBuf::from("xdeb")
}

fn default_converter_args() -> Vec<String> {
    vec!["-edR".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> u64 {
    300
}

fn default_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    1
}

fn default_user_agent() -> String {
    format!("vpkg/{}", env!("CARGO_PKG_VERSION"))
}

fn default_install_program() -> PathBuf {
    PathBuf::from("xbps-install")
}

fn default_rindex_program() -> PathBuf {
    PathBuf::from("xbps-rindex")
}

fn default_pkgdb() -> PathBuf {
    PathBuf::from("/var/db/xbps/pkgdb-0.38.plist")
}
