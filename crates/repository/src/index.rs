//! The repository index and its commit protocol

use crate::digest::file_digest;
use crate::flush::write_atomic;
use crate::shlibs::broken_shlibs;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use vpkg_errors::{ConsistencyError, Error, MetadataError, StorageError};
use vpkg_events::{BrokenShlibInfo, EventEmitter, EventSender, RepositoryEvent};
use vpkg_types::{PackageMeta, NOARCH};

/// Outcome of [`RepositoryIndex::commit`]
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// Nothing was staged
    Empty,
    /// The stage was merged and the index flushed
    Committed { added: Vec<(String, String)> },
    /// Merging would break shared-library consumers. The stage went to
    /// `stage_file` and the committed index was not touched.
    Deferred {
        reason: ConsistencyError,
        staged: Vec<(String, String)>,
        stage_file: PathBuf,
    },
}

/// Committed packages plus the stage of newly built ones, keyed by name.
///
/// A staged entry shadows a committed entry with the same name.
#[derive(Debug)]
pub struct RepositoryIndex {
    dir: PathBuf,
    arch: String,
    index: BTreeMap<String, Arc<PackageMeta>>,
    stage: BTreeMap<String, Arc<PackageMeta>>,
    meta: Option<Value>,
    tx: Option<EventSender>,
}

impl EventEmitter for RepositoryIndex {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}

impl RepositoryIndex {
    /// An index with no committed entries
    #[must_use]
    pub fn empty(dir: impl Into<PathBuf>, arch: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            arch: arch.into(),
            index: BTreeMap::new(),
            stage: BTreeMap::new(),
            meta: None,
            tx: None,
        }
    }

    /// Load the committed index for `arch` from `dir`.
    ///
    /// A missing index file yields an empty index. A leftover stage file
    /// from a deferred commit is not loaded.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing index or meta file cannot be read or
    /// parsed.
    pub async fn open(dir: impl Into<PathBuf>, arch: impl Into<String>) -> Result<Self, Error> {
        let mut repo = Self::empty(dir, arch);

        if let Some(entries) =
            read_json::<BTreeMap<String, PackageMeta>>(&repo.index_path()).await?
        {
            repo.index = entries
                .into_iter()
                .map(|(name, meta)| (name, Arc::new(meta)))
                .collect();
        }
        repo.meta = read_json::<Value>(&repo.meta_path()).await?;

        tracing::debug!(
            dir = %repo.dir.display(),
            arch = %repo.arch,
            packages = repo.index.len(),
            "opened repository index"
        );
        Ok(repo)
    }

    #[must_use]
    pub fn with_events(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn arch(&self) -> &str {
        &self.arch
    }

    #[must_use]
    pub fn index_path(&self) -> PathBuf {
        self.dir.join(format!("{}-repodata.json", self.arch))
    }

    #[must_use]
    pub fn meta_path(&self) -> PathBuf {
        self.dir.join(format!("{}-meta.json", self.arch))
    }

    #[must_use]
    pub fn stage_path(&self) -> PathBuf {
        self.dir.join(format!("{}-stagedata.json", self.arch))
    }

    /// Current record for `name`, staged entries first
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Arc<PackageMeta>> {
        self.stage
            .get(name)
            .or_else(|| self.index.get(name))
            .map(Arc::clone)
    }

    /// Committed entries in name order
    pub fn committed(&self) -> impl Iterator<Item = (&str, &Arc<PackageMeta>)> {
        self.index.iter().map(|(name, meta)| (name.as_str(), meta))
    }

    #[must_use]
    pub fn staged_len(&self) -> usize {
        self.stage.len()
    }

    /// Put a prepared record into the stage under its package name
    pub fn stage(&mut self, meta: PackageMeta) -> Arc<PackageMeta> {
        let meta = Arc::new(meta);
        let name = meta.name().to_string();

        tracing::debug!(package = %name, pkgver = %meta.pkgver, "staged");
        self.emit_repository(RepositoryEvent::Staged {
            pkgver: meta.pkgver.clone(),
            arch: meta.architecture.clone(),
        });
        self.stage.insert(name, Arc::clone(&meta));
        meta
    }

    /// Merge the stage into the committed index and persist it, unless that
    /// would leave a required shared library without a provider. In that
    /// case the stage is written to its own file instead.
    ///
    /// The stage is empty afterwards in both cases.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be written. The committed index on
    /// disk is unchanged when that happens.
    pub async fn commit(&mut self) -> Result<CommitOutcome, Error> {
        if self.stage.is_empty() {
            return Ok(CommitOutcome::Empty);
        }

        let broken = broken_shlibs(&self.index, &self.stage);
        let staged: Vec<(String, String)> = self
            .stage
            .values()
            .map(|meta| (meta.pkgver.clone(), meta.architecture.clone()))
            .collect();

        if !broken.is_empty() {
            let stage_file = self.stage_path();
            tracing::warn!(
                broken = broken.len(),
                staged = staged.len(),
                stage_file = %stage_file.display(),
                "deferring commit, shared libraries would break"
            );
            write_atomic(&stage_file, &to_json(&self.stage)?).await?;
            self.stage.clear();

            self.emit_repository(RepositoryEvent::CommitDeferred {
                broken: broken
                    .iter()
                    .map(|b| BrokenShlibInfo {
                        shlib: b.shlib.clone(),
                        provider: b.provider.clone(),
                        users: b.users.clone(),
                    })
                    .collect(),
                staged: staged.clone(),
                stage_file: stage_file.clone(),
            });
            return Ok(CommitOutcome::Deferred {
                reason: ConsistencyError::BrokenShlibs { shlibs: broken },
                staged,
                stage_file,
            });
        }

        let mut merged = self.index.clone();
        merged.extend(
            self.stage
                .iter()
                .map(|(name, meta)| (name.clone(), Arc::clone(meta))),
        );

        match fs::remove_file(self.stage_path()).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StorageError::from_io_with_path(&e, &self.stage_path()).into()),
        }

        let index_path = self.index_path();
        write_atomic(&index_path, &to_json(&merged)?).await?;
        let meta = self
            .meta
            .clone()
            .unwrap_or_else(|| json!({ "public-key": "DEADBEEF" }));
        write_atomic(&self.meta_path(), &serde_json::to_vec_pretty(&meta)?).await?;

        self.index = merged;
        self.meta = Some(meta);
        self.stage.clear();

        for (pkgver, arch) in &staged {
            self.emit_repository(RepositoryEvent::IndexAdded {
                pkgver: pkgver.clone(),
                arch: arch.clone(),
            });
        }
        self.emit_repository(RepositoryEvent::Flushed {
            path: index_path,
            packages: self.index.len(),
        });

        Ok(CommitOutcome::Committed { added: staged })
    }
}

/// Turn a produced archive into a record ready for staging.
///
/// Reads the archive's properties, checks the architecture against `arch`
/// (`noarch` always matches), records the archive's digest and size, and
/// drops the keys the index does not keep.
///
/// # Errors
///
/// Returns an error if the archive is unreadable or built for another
/// architecture.
pub async fn prepare_entry(archive: &Path, arch: &str) -> Result<PackageMeta, Error> {
    let mut meta = vpkg_convert::read_package_meta(archive).await?;

    if meta.architecture != arch && meta.architecture != NOARCH {
        return Err(MetadataError::ArchMismatch {
            pkgver: meta.pkgver,
            arch: meta.architecture,
            expected: arch.to_string(),
        }
        .into());
    }

    let (digest, size) = file_digest(archive).await?;
    meta.filename_hash = Some(digest);
    meta.filename_size = Some(size);
    meta.strip_transient_keys();
    Ok(meta)
}

fn to_json(entries: &BTreeMap<String, Arc<PackageMeta>>) -> Result<Vec<u8>, Error> {
    let plain: BTreeMap<&str, &PackageMeta> = entries
        .iter()
        .map(|(name, meta)| (name.as_str(), meta.as_ref()))
        .collect();
    Ok(serde_json::to_vec_pretty(&plain)?)
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, Error> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StorageError::from_io_with_path(&e, path).into()),
    };
    serde_json::from_slice(&bytes).map(Some).map_err(|e| {
        StorageError::CorruptedData {
            path: path.display().to_string(),
            message: e.to_string(),
        }
        .into()
    })
}
