#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for vpkg
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/vpkg/config.toml)
//! - Environment variables
//! - CLI flags
//!
//! It also loads the package set, the user's list of upstream packages.

pub mod constants;
pub mod sections;
pub mod packages;

pub use sections::{
    ColorChoice, ConverterConfig, EngineConfig, GeneralConfig, NetworkConfig, OutputFormat,
    PathConfig, PipelineConfig,
};
pub use packages::load_package_set;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use vpkg_errors::{ConfigError, Error};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub paths: PathConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub converter: ConverterConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub engine: EngineConfig,
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        Ok(config_dir()?.join(constants::CONFIG_DIR).join("config.toml"))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        // VPKG_WORKERS
        if let Ok(workers) = std::env::var("VPKG_WORKERS") {
            self.pipeline.workers = workers.parse().map_err(|_| ConfigError::InvalidValue {
                field: "VPKG_WORKERS".to_string(),
                value: workers,
            })?;
        }

        // VPKG_OUTPUT
        if let Ok(output) = std::env::var("VPKG_OUTPUT") {
            self.general.default_output = match output.as_str() {
                "plain" => OutputFormat::Plain,
                "tty" => OutputFormat::Tty,
                "json" => OutputFormat::Json,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "VPKG_OUTPUT".to_string(),
                        value: output,
                    }
                    .into())
                }
            };
        }

        for (var, slot) in [
            ("VPKG_PACKAGES", &mut self.paths.packages),
            ("VPKG_WORK_DIR", &mut self.paths.work_dir),
            ("VPKG_BINPKGS", &mut self.paths.binpkgs),
        ] {
            if let Ok(value) = std::env::var(var) {
                if value.is_empty() {
                    return Err(ConfigError::InvalidValue {
                        field: var.to_string(),
                        value,
                    }
                    .into());
                }
                *slot = Some(PathBuf::from(value));
            }
        }

        if let Ok(program) = std::env::var("VPKG_CONVERTER") {
            if program.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "VPKG_CONVERTER".to_string(),
                    value: program,
                }
                .into());
            }
            self.converter.program = PathBuf::from(program);
        }

        Ok(())
    }

    /// Get the package-set path (with default)
    ///
    /// # Errors
    ///
    /// Returns an error if no path is configured and the user config
    /// directory cannot be determined.
    pub fn packages_path(&self) -> Result<PathBuf, Error> {
        match &self.paths.packages {
            Some(path) => Ok(path.clone()),
            None => Ok(config_dir()?.join(constants::PACKAGES_FILE)),
        }
    }

    /// Get the work directory (with default)
    #[must_use]
    pub fn work_dir(&self) -> PathBuf {
        self.paths
            .work_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(constants::WORK_DIR))
    }

    /// Get the binary package repository directory (with default)
    #[must_use]
    pub fn binpkgs_dir(&self) -> PathBuf {
        self.paths
            .binpkgs
            .clone()
            .unwrap_or_else(|| PathBuf::from(constants::BINPKGS_DIR))
    }

    /// Get the converter shlibs file (with default)
    #[must_use]
    pub fn shlibs_path(&self) -> PathBuf {
        self.paths
            .shlibs
            .clone()
            .unwrap_or_else(|| PathBuf::from(constants::SHLIBS_FILE))
    }

    /// Target architecture for built packages
    #[must_use]
    pub fn architecture(&self) -> String {
        self.pipeline
            .architecture
            .clone()
            .unwrap_or_else(|| vpkg_types::native_arch().to_string())
    }

    /// Effective worker pool size
    #[must_use]
    pub fn worker_count(&self) -> usize {
        calculate_workers(self.pipeline.workers)
    }
}

fn config_dir() -> Result<PathBuf, Error> {
    dirs::config_dir().ok_or_else(|| {
        ConfigError::NotFound {
            path: "config directory".to_string(),
        }
        .into()
    })
}

/// Calculate the worker pool size based on CPU count
#[must_use]
pub fn calculate_workers(config_value: usize) -> usize {
    if config_value > 0 {
        config_value
    } else {
        num_cpus::get().max(1)
    }
}
