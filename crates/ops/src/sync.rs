//! Install and update: acquisition, index commit and transaction

use crate::engine::{PrepareOutcome, SubmitOutcome};
use crate::{IndexOutcome, OpsCtx, SyncReport, SyncRequest, TransactionOutcome};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use vpkg_convert::Converter;
use vpkg_errors::{ConsistencyError, Error, TransactionError, UserFacingError};
use vpkg_events::{EventEmitter, FailureContext, TransactionEvent};
use vpkg_install::{RunReport, Scheduler, SchedulerConfig};
use vpkg_net::Fetcher;
use vpkg_repository::{CommitOutcome, RepositoryIndex};
use vpkg_types::{InstalledPackages, PackageSet, RevertPolicy};

/// Build, index and install the requested packages.
///
/// Seeds the acquisition run with every requested package that needs
/// work, commits the built packages to the local repository and submits
/// the requested ones (not their discovered dependencies) to the
/// transaction engine. The work directory is removed afterwards unless
/// configured otherwise.
///
/// # Errors
///
/// Returns an error if a job fails, the index cannot be written, the user
/// declines a prompt, or the transaction engine rejects the transaction.
pub async fn sync(ctx: &mut OpsCtx, request: &SyncRequest) -> Result<SyncReport, Error> {
    let installed = ctx.engine.installed().await?;
    let candidates = select_candidates(
        ctx,
        request,
        &installed,
        ctx.config.pipeline.revert_policy,
    );

    if candidates.is_empty() {
        tracing::info!("no package needs work");
        ctx.emit_transaction(TransactionEvent::NothingToDo);
        return Ok(SyncReport::nothing_to_do(candidates));
    }

    if request.is_scan() && !ctx.prompter.confirm("Install candidates:", &candidates) {
        return Err(TransactionError::Aborted.into());
    }

    let work_dir = ctx.config.work_dir();
    let result = run(ctx, request, candidates, installed, &work_dir).await;

    if ctx.config.pipeline.keep_work_dir {
        tracing::debug!(work_dir = %work_dir.display(), "keeping work directory");
    } else {
        remove_work_dir(ctx, &work_dir).await;
    }
    result
}

/// Pick the packages a run starts from
fn select_candidates(
    ctx: &OpsCtx,
    request: &SyncRequest,
    installed: &InstalledPackages,
    policy: RevertPolicy,
) -> Vec<String> {
    if request.is_scan() {
        return scan_stale(&ctx.packages, installed, request.force, policy);
    }

    let mut candidates = Vec::new();
    for name in &request.packages {
        let Some(spec) = ctx.packages.get(name) else {
            tracing::warn!(package = %name, "not in package set");
            ctx.emit_warning(format!("package {name} not found"));
            continue;
        };

        if !request.force {
            if let Some(record) = installed.get(name) {
                if !record.is_converted() {
                    tracing::info!(package = %name, "installed from another source, skipping");
                    continue;
                }
                if !spec.is_stale(Some(record), policy) {
                    tracing::info!(package = %name, pkgver = %record.pkgver, "up to date");
                    continue;
                }
            }
        }

        if !candidates.contains(name) {
            candidates.push(name.clone());
        }
    }
    candidates
}

/// Converted packages on the system that have a stale record
#[must_use]
pub fn scan_stale(
    packages: &PackageSet,
    installed: &InstalledPackages,
    force: bool,
    policy: RevertPolicy,
) -> Vec<String> {
    installed
        .converted()
        .filter_map(|record| {
            let name = record.name();
            let spec = packages.get(name)?;
            (force || spec.is_stale(Some(record), policy)).then(|| name.to_string())
        })
        .collect()
}

async fn run(
    ctx: &mut OpsCtx,
    request: &SyncRequest,
    candidates: Vec<String>,
    installed: InstalledPackages,
    work_dir: &Path,
) -> Result<SyncReport, Error> {
    let converter = Converter::from_config(&ctx.config);
    if ctx.config.converter.refresh_shlibs {
        converter.refresh_shlibs().await?;
    }

    let binpkgs = ctx.config.binpkgs_dir();
    for dir in [work_dir, binpkgs.as_path()] {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| Error::io_with_path(&e, dir))?;
    }

    let architecture = ctx.config.architecture();
    let index = RepositoryIndex::open(&binpkgs, &architecture)
        .await?
        .with_events(ctx.tx.clone());
    let index = Arc::new(Mutex::new(index));

    let scheduler = Scheduler::new(
        SchedulerConfig {
            workers: ctx.config.worker_count(),
            work_dir: work_dir.to_path_buf(),
            architecture,
            revert_policy: ctx.config.pipeline.revert_policy,
        },
        Fetcher::new(ctx.net.clone()),
        converter,
        Arc::clone(&ctx.packages),
        Arc::new(installed),
    )
    .with_event_sender(ctx.tx.clone());

    let report = scheduler.run(candidates.clone(), Arc::clone(&index)).await?;

    let mut index = Arc::try_unwrap(index)
        .map_err(|_| Error::internal("repository index is still shared after the run"))?
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner);

    let index_outcome = match index.commit().await? {
        CommitOutcome::Empty => IndexOutcome::Unchanged,
        CommitOutcome::Committed { added } => {
            ctx.engine.register(&built_archives(&report)).await?;
            IndexOutcome::Committed {
                added: added.into_iter().map(|(pkgver, _)| pkgver).collect(),
            }
        }
        CommitOutcome::Deferred {
            reason,
            staged,
            stage_file,
        } => {
            let broken = match &reason {
                ConsistencyError::BrokenShlibs { shlibs } => shlibs.len(),
                _ => 0,
            };
            tracing::warn!(
                error = %reason.user_message(),
                code = reason.user_code().unwrap_or_default(),
                stage_file = %stage_file.display(),
                "index commit deferred"
            );
            IndexOutcome::Deferred {
                staged: staged.into_iter().map(|(pkgver, _)| pkgver).collect(),
                broken,
            }
        }
    };

    let (submitted, transaction) = match transact(ctx, request, &report, &index_outcome).await {
        Ok(done) => done,
        Err(error) => {
            ctx.emit_transaction(TransactionEvent::Failed {
                operation: if request.update { "update" } else { "install" }.to_string(),
                failure: FailureContext::from_error(&error),
            });
            return Err(error);
        }
    };

    Ok(SyncReport {
        candidates,
        jobs: report.jobs.clone(),
        built: report.built(),
        cached: report.cached(),
        index: index_outcome,
        submitted,
        transaction,
    })
}

fn built_archives(report: &RunReport) -> Vec<PathBuf> {
    report
        .results
        .iter()
        .filter_map(|result| result.archive.clone())
        .collect()
}

/// Submit the seeded packages, prepare, confirm and commit
///
/// Packages held back by a deferred commit were never registered with the
/// engine, so they are left staged instead of submitted.
async fn transact(
    ctx: &mut OpsCtx,
    request: &SyncRequest,
    report: &RunReport,
    index: &IndexOutcome,
) -> Result<(Vec<String>, TransactionOutcome), Error> {
    let held_back: &[String] = match index {
        IndexOutcome::Deferred { staged, .. } => staged.as_slice(),
        _ => &[],
    };
    let mut submitted = Vec::new();
    let mut offered = 0;

    for result in report.explicit() {
        let pkgver = result.meta.pkgver.as_str();
        if held_back.iter().any(|staged| staged == pkgver) {
            tracing::info!(pkgver, "staged for review, not submitted");
            continue;
        }
        offered += 1;
        ctx.emit_transaction(TransactionEvent::Submitted {
            pkgver: pkgver.to_string(),
            update: request.update,
        });

        let outcome = if request.update {
            ctx.engine.update(pkgver).await?
        } else {
            ctx.engine.install(pkgver, request.force).await?
        };
        tracing::debug!(pkgver, ?outcome, "engine outcome");

        match outcome {
            SubmitOutcome::Success => submitted.push(pkgver.to_string()),
            SubmitOutcome::AlreadySatisfied => {
                tracing::info!(pkgver, "already installed");
                ctx.emit_transaction(TransactionEvent::AlreadyInstalled {
                    pkgver: pkgver.to_string(),
                });
            }
            SubmitOutcome::NotFound => {
                return Err(TransactionError::NotFound {
                    pkgver: pkgver.to_string(),
                }
                .into());
            }
            SubmitOutcome::MissingDependency => {
                return Err(TransactionError::MissingDependencies.into());
            }
            SubmitOutcome::Other(code) => {
                return Err(TransactionError::Engine {
                    operation: if request.update { "update" } else { "install" }.to_string(),
                    code,
                    message: format!("{pkgver}: Unexpected error"),
                }
                .into());
            }
        }
    }

    if offered == 0 {
        ctx.emit_transaction(TransactionEvent::NothingToDo);
        return Ok((submitted, TransactionOutcome::NothingToDo));
    }

    let plan = match ctx.engine.prepare().await? {
        PrepareOutcome::Success(plan) => plan,
        PrepareOutcome::MissingDependency => {
            return Err(TransactionError::MissingDependencies.into())
        }
        PrepareOutcome::Other(code) => {
            return Err(TransactionError::Engine {
                operation: "prepare".to_string(),
                code,
                message: "unexpected error".to_string(),
            }
            .into())
        }
    };

    if plan.is_empty() {
        ctx.emit_transaction(TransactionEvent::NothingToDo);
        return Ok((submitted, TransactionOutcome::NothingToDo));
    }

    ctx.emit_transaction(TransactionEvent::Summary {
        changes: plan
            .iter()
            .map(|change| (change.name.clone(), change.version.clone()))
            .collect(),
    });
    let lines: Vec<String> = plan
        .iter()
        .map(|change| format!("{} -> {}", change.name, change.version))
        .collect();
    if !ctx.prompter.confirm("Summary of changes:", &lines) {
        return Err(TransactionError::Aborted.into());
    }

    ctx.engine.commit().await?;
    tracing::info!(changes = plan.len(), "transaction committed");
    ctx.emit_transaction(TransactionEvent::Committed {
        changes: plan.len(),
    });
    Ok((submitted, TransactionOutcome::Committed { changes: plan }))
}

async fn remove_work_dir(ctx: &OpsCtx, work_dir: &Path) {
    match tokio::fs::remove_dir_all(work_dir).await {
        Ok(()) => tracing::debug!(work_dir = %work_dir.display(), "removed work directory"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            let error = Error::io_with_path(&e, work_dir);
            tracing::warn!(error = %error, "failed to clean up work directory");
            ctx.emit_warning(format!(
                "failed to clean up {}: {}",
                work_dir.display(),
                error.user_message()
            ));
        }
    }
}
