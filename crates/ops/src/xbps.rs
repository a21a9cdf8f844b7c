//! Transaction engine backed by the xbps command-line tools

use crate::engine::{PlannedChange, PrepareOutcome, SubmitOutcome, TransactionEngine};
use async_trait::async_trait;
use serde_json::Value;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use vpkg_config::Config;
use vpkg_errors::{Error, StorageError, TransactionError};
use vpkg_types::{split_pkgver, InstalledPackages, PackageMeta};

// xbps-install exits with the errno of the failed transaction step
const EXIT_NOT_FOUND: i32 = 2;
const EXIT_ALREADY_INSTALLED: i32 = 17;
const EXIT_MISSING_DEPENDENCY: i32 = 19;

/// Drives `xbps-install` against the local binary package repository.
///
/// Submissions are validated with a dry run of the single package and
/// collected. `prepare` dry-runs all of them together and `commit` runs
/// the real transaction with the terminal attached.
#[derive(Debug, Clone)]
pub struct XbpsEngine {
    install_program: PathBuf,
    rindex_program: PathBuf,
    pkgdb: PathBuf,
    repository: PathBuf,
    targets: Vec<String>,
    force: bool,
    update: bool,
}

impl XbpsEngine {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            install_program: config.engine.install_program.clone(),
            rindex_program: config.engine.rindex_program.clone(),
            pkgdb: config.engine.pkgdb.clone(),
            repository: config.binpkgs_dir(),
            targets: Vec::new(),
            force: false,
            update: false,
        }
    }

    #[must_use]
    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    fn install_args(&self, dry_run: bool, packages: &[String]) -> Vec<OsString> {
        let mut repository = OsString::from("--repository=");
        repository.push(&self.repository);

        let mut args = vec![repository];
        args.push(if dry_run { "-n" } else { "-y" }.into());
        if self.force {
            args.push("-f".into());
        }
        if self.update {
            args.push("-u".into());
        }
        args.extend(packages.iter().map(OsString::from));
        args
    }

    async fn submit(&mut self, pkgver: &str) -> Result<SubmitOutcome, Error> {
        let args = self.install_args(true, &[pkgver.to_string()]);
        let output = run(&self.install_program, &args, "install").await?;
        let outcome = submit_outcome(output.code);
        tracing::debug!(pkgver, ?outcome, "submitted to xbps");
        if outcome == SubmitOutcome::Success {
            self.targets.push(pkgver.to_string());
        }
        Ok(outcome)
    }
}

#[async_trait]
impl TransactionEngine for XbpsEngine {
    async fn installed(&self) -> Result<InstalledPackages, Error> {
        let xml = match tokio::fs::read_to_string(&self.pkgdb).await {
            Ok(xml) => xml,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(pkgdb = %self.pkgdb.display(), "no package database");
                return Ok(InstalledPackages::default());
            }
            Err(e) => return Err(StorageError::from_io_with_path(&e, &self.pkgdb).into()),
        };
        parse_pkgdb(&xml, &self.pkgdb)
    }

    async fn register(&mut self, archives: &[PathBuf]) -> Result<(), Error> {
        if archives.is_empty() {
            return Ok(());
        }
        let mut args: Vec<OsString> = vec!["-f".into(), "-a".into()];
        args.extend(archives.iter().map(|a| a.as_os_str().to_owned()));

        let output = run(&self.rindex_program, &args, "register").await?;
        if output.code != 0 {
            return Err(engine_error("register", output.code, &output.stderr));
        }
        tracing::info!(archives = archives.len(), "registered archives");
        Ok(())
    }

    async fn install(&mut self, pkgver: &str, force: bool) -> Result<SubmitOutcome, Error> {
        self.force |= force;
        self.submit(pkgver).await
    }

    async fn update(&mut self, pkgver: &str) -> Result<SubmitOutcome, Error> {
        self.update = true;
        self.submit(pkgver).await
    }

    async fn prepare(&mut self) -> Result<PrepareOutcome, Error> {
        if self.targets.is_empty() {
            return Ok(PrepareOutcome::Success(Vec::new()));
        }

        let args = self.install_args(true, &self.targets);
        let output = run(&self.install_program, &args, "prepare").await?;
        Ok(match output.code {
            0 => PrepareOutcome::Success(parse_plan(&output.stdout)),
            EXIT_MISSING_DEPENDENCY => PrepareOutcome::MissingDependency,
            code => PrepareOutcome::Other(code),
        })
    }

    async fn commit(&mut self) -> Result<(), Error> {
        let args = self.install_args(false, &self.targets);
        let status = Command::new(&self.install_program)
            .args(&args)
            .status()
            .await
            .map_err(|e| spawn_error("commit", &self.install_program, &e))?;

        match status.code() {
            Some(0) => Ok(()),
            Some(code) => Err(engine_error("commit", code, "")),
            None => Err(engine_error("commit", -1, "terminated by signal")),
        }
    }
}

struct Output {
    code: i32,
    stdout: String,
    stderr: String,
}

async fn run(program: &Path, args: &[OsString], operation: &str) -> Result<Output, Error> {
    tracing::debug!(program = %program.display(), ?args, operation, "running engine command");
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| spawn_error(operation, program, &e))?;

    Ok(Output {
        code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

fn submit_outcome(code: i32) -> SubmitOutcome {
    match code {
        0 => SubmitOutcome::Success,
        EXIT_ALREADY_INSTALLED => SubmitOutcome::AlreadySatisfied,
        EXIT_NOT_FOUND => SubmitOutcome::NotFound,
        EXIT_MISSING_DEPENDENCY => SubmitOutcome::MissingDependency,
        code => SubmitOutcome::Other(code),
    }
}

/// Dry-run lines read `<pkgver> <action> <arch> <repository> ...`
fn parse_plan(stdout: &str) -> Vec<PlannedChange> {
    stdout
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .filter_map(split_pkgver)
        .map(|(name, version)| PlannedChange {
            name: name.to_string(),
            version: version.to_string(),
        })
        .collect()
}

/// Read the installed-package snapshot out of the pkgdb property list.
/// Entries that are not package records are skipped.
fn parse_pkgdb(xml: &str, path: &Path) -> Result<InstalledPackages, Error> {
    let value = vpkg_convert::plist::parse(xml).map_err(|e| StorageError::CorruptedData {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let Value::Object(entries) = value else {
        return Err(StorageError::CorruptedData {
            path: path.display().to_string(),
            message: "package database is not a dictionary".to_string(),
        }
        .into());
    };

    let installed = entries
        .into_iter()
        .filter(|(name, _)| !name.starts_with('_'))
        .filter_map(|(name, record)| match serde_json::from_value::<PackageMeta>(record) {
            Ok(meta) => Some(meta),
            Err(e) => {
                tracing::warn!(package = %name, error = %e, "skipping pkgdb entry");
                None
            }
        })
        .collect();
    Ok(installed)
}

fn engine_error(operation: &str, code: i32, stderr: &str) -> Error {
    TransactionError::Engine {
        operation: operation.to_string(),
        code,
        message: stderr.trim_end().to_string(),
    }
    .into()
}

fn spawn_error(operation: &str, program: &Path, e: &std::io::Error) -> Error {
    TransactionError::Engine {
        operation: operation.to_string(),
        code: -1,
        message: format!("{}: {e}", program.display()),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_outcome() {
        assert_eq!(submit_outcome(0), SubmitOutcome::Success);
        assert_eq!(submit_outcome(17), SubmitOutcome::AlreadySatisfied);
        assert_eq!(submit_outcome(2), SubmitOutcome::NotFound);
        assert_eq!(submit_outcome(19), SubmitOutcome::MissingDependency);
        assert_eq!(submit_outcome(5), SubmitOutcome::Other(5));
    }

    #[test]
    fn test_parse_plan() {
        let stdout = "zoom-5.16_1 install x86_64 /var/lib/vpkg 812M 201M\n\
                      libxcb-1.16_1 update x86_64 https://repo-default.voidlinux.org 1M 400K\n\n";
        assert_eq!(
            parse_plan(stdout),
            vec![
                PlannedChange {
                    name: "zoom".into(),
                    version: "5.16_1".into()
                },
                PlannedChange {
                    name: "libxcb".into(),
                    version: "1.16_1".into()
                },
            ]
        );
    }

    #[test]
    fn test_parse_pkgdb() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<plist version="1.0">
<dict>
	<key>_XBPS_ALTERNATIVES_</key>
	<dict/>
	<key>discord</key>
	<dict>
		<key>architecture</key>
		<string>x86_64</string>
		<key>install-date</key>
		<string>2024-01-02 10:00 UTC</string>
		<key>pkgver</key>
		<string>discord-0.0.40_1</string>
		<key>tags</key>
		<string>xdeb</string>
	</dict>
	<key>glibc</key>
	<dict>
		<key>architecture</key>
		<string>x86_64</string>
		<key>pkgver</key>
		<string>glibc-2.39_1</string>
	</dict>
	<key>broken</key>
	<dict>
		<key>state</key>
		<string>half-unpacked</string>
	</dict>
</dict>
</plist>
"#;
        let installed = parse_pkgdb(xml, Path::new("pkgdb.plist")).unwrap();
        assert_eq!(installed.len(), 2);
        assert!(installed.get("discord").unwrap().is_converted());
        assert!(!installed.get("glibc").unwrap().is_converted());
        assert_eq!(installed.converted().count(), 1);
    }

    #[test]
    fn test_install_args() {
        let mut config = Config::default();
        config.paths.binpkgs = Some(PathBuf::from("/srv/binpkgs"));
        let mut engine = XbpsEngine::new(&config);
        engine.force = true;
        let args = engine.install_args(true, &["zoom-5.16_1".to_string()]);
        assert_eq!(
            args,
            vec![
                OsString::from("--repository=/srv/binpkgs"),
                "-n".into(),
                "-f".into(),
                "zoom-5.16_1".into(),
            ]
        );
    }
}
