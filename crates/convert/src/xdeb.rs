//! xdeb subprocess invocation

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use vpkg_config::Config;
use vpkg_errors::{ConversionError, Error};
use vpkg_types::PackageSpec;

/// Scratch root for one conversion
pub const ENV_PKGROOT: &str = "XDEB_PKGROOT";
/// Directory the produced archive is written to
pub const ENV_BINPKGS: &str = "XDEB_BINPKGS";
/// Shared-library map consulted for dependency detection
pub const ENV_SHLIBS: &str = "XDEB_SHLIBS";

/// Runs the external converter
#[derive(Debug, Clone)]
pub struct Converter {
    program: PathBuf,
    extra_args: Vec<String>,
    binpkgs: PathBuf,
    shlibs: PathBuf,
}

impl Converter {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, binpkgs: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            extra_args: Vec::new(),
            binpkgs: binpkgs.into(),
            shlibs: PathBuf::from(vpkg_config::constants::SHLIBS_FILE),
        }
    }

    /// Build a converter from the `[converter]` and `[paths]` sections
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            program: config.converter.program.clone(),
            extra_args: config.converter.extra_args.clone(),
            binpkgs: config.binpkgs_dir(),
            shlibs: config.shlibs_path(),
        }
    }

    #[must_use]
    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    #[must_use]
    pub fn with_shlibs(mut self, shlibs: impl Into<PathBuf>) -> Self {
        self.shlibs = shlibs.into();
        self
    }

    #[must_use]
    pub fn binpkgs(&self) -> &Path {
        &self.binpkgs
    }

    /// Regenerate the shared-library map with `xdeb -SQ`
    ///
    /// # Errors
    ///
    /// Returns a `ConversionError` if the converter cannot be spawned or
    /// exits unsuccessfully.
    pub async fn refresh_shlibs(&self) -> Result<(), Error> {
        tracing::debug!(shlibs = %self.shlibs.display(), "refreshing shlibs");

        let output = Command::new(&self.program)
            .arg("-SQ")
            .env(ENV_SHLIBS, &self.shlibs)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ConversionError::SpawnFailed {
                program: self.program.display().to_string(),
                message: e.to_string(),
            })?;

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(match output.status.code() {
            Some(code) => ConversionError::failed(code, &stderr),
            None => ConversionError::Terminated {
                stderr: trim_newlines(&stderr).to_string(),
            },
        }
        .into())
    }

    /// Convert `artifact` into a native package and return the path of the
    /// produced archive.
    ///
    /// `pkgroot` is this job's scratch directory. The child is killed if the
    /// returned future is dropped.
    ///
    /// # Errors
    ///
    /// Returns a `ConversionError` if the converter cannot be spawned, exits
    /// unsuccessfully, or prints no archive path.
    pub async fn convert(
        &self,
        name: &str,
        spec: &PackageSpec,
        artifact: &Path,
        pkgroot: &Path,
    ) -> Result<PathBuf, Error> {
        let args = self.arguments(name, spec, artifact);
        tracing::debug!(
            program = %self.program.display(),
            package = name,
            ?args,
            "running converter"
        );

        let output = Command::new(&self.program)
            .args(&args)
            .env(ENV_PKGROOT, pkgroot)
            .env(ENV_BINPKGS, &self.binpkgs)
            .env(ENV_SHLIBS, &self.shlibs)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ConversionError::SpawnFailed {
                program: self.program.display().to_string(),
                message: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(match output.status.code() {
                Some(code) => ConversionError::failed(code, &stderr),
                None => ConversionError::Terminated {
                    stderr: trim_newlines(&stderr).to_string(),
                },
            }
            .into());
        }

        parse_output(&stdout).ok_or_else(|| {
            ConversionError::InvalidOutput {
                output: stdout.to_string(),
                stderr: trim_newlines(&stderr).to_string(),
            }
            .into()
        })
    }

    /// Command-line arguments for one conversion
    #[must_use]
    pub fn arguments(&self, name: &str, spec: &PackageSpec, artifact: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.extra_args.iter().map(OsString::from).collect();

        for (flag, value) in [
            ("--deps", &spec.deps),
            ("--not-deps", &spec.not_deps),
            ("--provides", &spec.provides),
            ("--replaces", &spec.replaces),
        ] {
            if !value.trim().is_empty() {
                args.push(format!("{flag}={value}").into());
            }
        }

        args.push(format!("--name={name}").into());
        if let Some(version) = &spec.version {
            args.push(format!("--version={version}").into());
        }

        args.push("--".into());
        args.push(artifact.as_os_str().to_owned());
        args
    }
}

/// Standard output must be exactly one line holding the absolute path of
/// the produced archive.
fn parse_output(stdout: &str) -> Option<PathBuf> {
    let mut lines = stdout.lines().map(|line| line.trim_end_matches('\r'));
    let line = lines.next()?;
    if lines.next().is_some() {
        return None;
    }
    let path = PathBuf::from(line);
    path.is_absolute().then_some(path)
}

fn trim_newlines(s: &str) -> &str {
    s.trim_end_matches(['\n', '\r'])
}
