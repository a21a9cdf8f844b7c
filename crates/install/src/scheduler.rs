//! Worker pool driving the acquisition pipeline

use crate::context::SyncContext;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinSet;
use vpkg_convert::Converter;
use vpkg_errors::{ConfigError, Error, UserFacingError};
use vpkg_events::{
    AcquisitionEvent, AppEvent, EventEmitter, EventSender, FailureContext, ProgressKind,
};
use vpkg_net::Fetcher;
use vpkg_repository::{prepare_entry, RepositoryIndex};
use vpkg_types::{
    pkgpattern_name, InstalledPackages, PackageMeta, PackageSet, PackageSpec, RevertPolicy,
};

/// Repository index shared between workers
pub type SharedIndex = Arc<Mutex<RepositoryIndex>>;

/// Pool settings for one run
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Worker count, at least 1
    pub workers: usize,
    /// Parent of the per-worker scratch directories
    pub work_dir: PathBuf,
    /// Architecture produced archives must match
    pub architecture: String,
    pub revert_policy: RevertPolicy,
}

/// What one job produced
#[derive(Debug, Clone)]
pub struct JobResult {
    pub position: usize,
    pub name: String,
    pub meta: Arc<PackageMeta>,
    /// Produced archive, `None` when the cached record was reused
    pub archive: Option<PathBuf>,
}

impl JobResult {
    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.archive.is_none()
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// The final job list in position order
    pub jobs: Vec<String>,
    /// Number of jobs the run was seeded with
    pub initial: usize,
    /// One result per job, in position order
    pub results: Vec<JobResult>,
}

impl RunReport {
    /// Results of the seeded jobs, excluding discovered dependencies
    pub fn explicit(&self) -> impl Iterator<Item = &JobResult> {
        self.results.iter().filter(|r| r.position < self.initial)
    }

    #[must_use]
    pub fn built(&self) -> usize {
        self.results.iter().filter(|r| !r.is_cached()).count()
    }

    #[must_use]
    pub fn cached(&self) -> usize {
        self.results.iter().filter(|r| r.is_cached()).count()
    }
}

struct JobFailure {
    package: String,
    error: Error,
}

struct Shared {
    config: SchedulerConfig,
    fetcher: Fetcher,
    converter: Converter,
    packages: Arc<PackageSet>,
    installed: Arc<InstalledPackages>,
    index: SharedIndex,
    results: DashMap<usize, JobResult>,
    tx: Option<EventSender>,
}

impl EventEmitter for Shared {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}

impl Shared {
    fn index(&self) -> MutexGuard<'_, RepositoryIndex> {
        self.index
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Runs jobs on a fixed pool of workers until every job, including the
/// dependencies discovered along the way, has settled.
pub struct Scheduler {
    config: SchedulerConfig,
    fetcher: Fetcher,
    converter: Converter,
    packages: Arc<PackageSet>,
    installed: Arc<InstalledPackages>,
    tx: Option<EventSender>,
}

impl EventEmitter for Scheduler {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}

impl Scheduler {
    #[must_use]
    pub fn new(
        config: SchedulerConfig,
        fetcher: Fetcher,
        converter: Converter,
        packages: Arc<PackageSet>,
        installed: Arc<InstalledPackages>,
    ) -> Self {
        Self {
            config,
            fetcher,
            converter,
            packages,
            installed,
            tx: None,
        }
    }

    #[must_use]
    pub fn with_event_sender(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    /// Process `initial` and everything it pulls in.
    ///
    /// Each job reuses the record in `index` when it is not stale, and
    /// otherwise fetches, converts and stages the package. The first failed
    /// job aborts the run: the remaining workers are cancelled and joined
    /// before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failed job.
    pub async fn run(&self, initial: Vec<String>, index: SharedIndex) -> Result<RunReport, Error> {
        let ctx = Arc::new(SyncContext::new(initial));
        let initial = ctx.jobs().len();
        let workers = self.config.workers.max(1);

        let shared = Arc::new(Shared {
            config: self.config.clone(),
            fetcher: self.fetcher.clone(),
            converter: self.converter.clone(),
            packages: Arc::clone(&self.packages),
            installed: Arc::clone(&self.installed),
            index,
            results: DashMap::new(),
            tx: self.tx.clone(),
        });

        tracing::info!(workers, jobs = initial, "starting acquisition");
        self.emit(AppEvent::Acquisition(AcquisitionEvent::Started {
            workers,
            jobs: initial,
        }));

        let mut set = JoinSet::new();
        for id in 0..workers {
            set.spawn(worker_loop(id, Arc::clone(&shared), Arc::clone(&ctx)));
        }

        let mut failure: Option<JobFailure> = None;
        while let Some(joined) = set.join_next().await {
            let error = match joined {
                Ok(Ok(())) => continue,
                Ok(Err(job)) => job,
                Err(e) if e.is_cancelled() => continue,
                Err(e) => JobFailure {
                    package: String::new(),
                    error: Error::internal(format!("worker panicked: {e}")),
                },
            };

            let replace = match &failure {
                None => true,
                Some(current) => matches!(current.error, Error::Cancelled)
                    && !matches!(error.error, Error::Cancelled),
            };
            if replace {
                ctx.fail();
                set.abort_all();
                failure = Some(error);
            }
        }

        if let Some(JobFailure { package, error }) = failure {
            tracing::error!(package = %package, error = %error, "acquisition failed");
            self.emit(AppEvent::Acquisition(AcquisitionEvent::Failed {
                package,
                failure: FailureContext::from_error(&error),
            }));
            return Err(error);
        }

        let jobs = ctx.jobs();
        let mut results: Vec<JobResult> = shared
            .results
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        results.sort_by_key(|r| r.position);

        let report = RunReport {
            jobs,
            initial,
            results,
        };
        tracing::info!(
            built = report.built(),
            cached = report.cached(),
            "acquisition finished"
        );
        self.emit(AppEvent::Acquisition(AcquisitionEvent::Completed {
            built: report.built(),
            cached: report.cached(),
        }));
        Ok(report)
    }
}

async fn worker_loop(
    id: usize,
    shared: Arc<Shared>,
    ctx: Arc<SyncContext>,
) -> Result<(), JobFailure> {
    while let Some((position, name)) = ctx.claim().await {
        match process_job(id, position, &name, &shared, &ctx).await {
            Ok(result) => {
                shared.results.insert(position, result);
                shared.emit_progress(id, position, &name, ProgressKind::Done);
                ctx.complete();
            }
            Err(Error::Cancelled) => {
                return Err(JobFailure {
                    package: name,
                    error: Error::Cancelled,
                });
            }
            Err(error) => {
                tracing::debug!(worker = id, package = %name, error = %error, "job failed");
                shared.emit_progress(
                    id,
                    position,
                    &name,
                    ProgressKind::Error {
                        message: error.user_message().into_owned(),
                    },
                );
                ctx.fail();
                return Err(JobFailure {
                    package: name,
                    error,
                });
            }
        }
    }
    Ok(())
}

async fn process_job(
    id: usize,
    position: usize,
    name: &str,
    shared: &Shared,
    ctx: &SyncContext,
) -> Result<JobResult, Error> {
    shared.emit_progress(id, position, name, ProgressKind::Init);

    let spec = shared
        .packages
        .get(name)
        .ok_or_else(|| ConfigError::UnknownPackage {
            name: name.to_string(),
        })?;

    let policy = shared.config.revert_policy;
    let cached = shared
        .index()
        .lookup(name)
        .filter(|meta| !spec.is_stale(Some(meta), policy));

    let (meta, archive) = if let Some(meta) = cached {
        tracing::debug!(worker = id, package = name, pkgver = %meta.pkgver, "reusing cached package");
        (meta, None)
    } else {
        let scratch = shared.config.work_dir.join(id.to_string());
        let archive = build(id, position, name, spec, &scratch, shared, ctx).await?;
        let entry = prepare_entry(&archive, &shared.config.architecture).await?;
        let meta = shared.index().stage(entry);
        (meta, Some(archive))
    };

    discover(name, spec, &meta, shared, ctx);

    Ok(JobResult {
        position,
        name: name.to_string(),
        meta,
        archive,
    })
}

/// Fetch and convert one package inside its worker's scratch directory
#[allow(clippy::too_many_arguments)]
async fn build(
    id: usize,
    position: usize,
    name: &str,
    spec: &PackageSpec,
    scratch: &Path,
    shared: &Shared,
    ctx: &SyncContext,
) -> Result<PathBuf, Error> {
    let artifact = scratch.join(format!("{name}.deb"));
    shared
        .fetcher
        .fetch(&spec.url, &artifact, |progress| {
            shared.emit_progress(
                id,
                position,
                name,
                ProgressKind::Downloading {
                    done: progress.downloaded,
                    total: progress.total,
                },
            );
        })
        .await?;

    if ctx.is_failed() {
        return Err(Error::Cancelled);
    }

    shared.emit_progress(id, position, name, ProgressKind::Converting);
    let archive = shared
        .converter
        .convert(name, spec, &artifact, scratch)
        .await?;

    if ctx.is_failed() {
        return Err(Error::Cancelled);
    }
    Ok(archive)
}

/// Queue every declared package that `name` depends on and that is missing
/// or stale on the system. A dependency installed from another source is
/// left alone.
fn discover(
    name: &str,
    spec: &PackageSpec,
    meta: &PackageMeta,
    shared: &Shared,
    ctx: &SyncContext,
) {
    let policy = shared.config.revert_policy;
    let patterns = spec
        .dep_patterns()
        .chain(meta.run_depends.iter().map(String::as_str));

    for pattern in patterns {
        let Some(dep) = pkgpattern_name(pattern) else {
            tracing::warn!(package = name, pattern, "invalid dependency pattern");
            continue;
        };
        let Some(dep_spec) = shared.packages.get(dep) else {
            continue;
        };
        let installed = shared.installed.get(dep);
        if installed.is_some_and(|record| !record.is_converted()) {
            tracing::debug!(package = dep, required_by = name, "installed from another source");
            continue;
        }
        if !dep_spec.is_stale(installed, policy) {
            continue;
        }

        if let Some(position) = ctx.enqueue(dep) {
            tracing::debug!(package = dep, position, required_by = name, "queued dependency");
            shared.emit(AppEvent::Acquisition(AcquisitionEvent::JobQueued {
                package: dep.to_string(),
                position,
                required_by: Some(name.to_string()),
            }));
        }
    }
}
