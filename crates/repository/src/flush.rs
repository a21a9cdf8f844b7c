//! Crash-safe replacement of index files

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;
use vpkg_errors::{Error, StorageError};

/// Mode of every file the repository writes
pub const FILE_MODE: u32 = 0o664;

/// Replace `dest` with `contents`.
///
/// The data goes to a uniquely named file in the same directory, is synced,
/// gets its final mode and is then renamed over `dest`. Readers observe
/// either the previous file or the new one, never a partial write.
///
/// # Errors
///
/// Returns an error if any step fails. The temporary file is removed on
/// failure and `dest` is left untouched.
pub async fn write_atomic(dest: &Path, contents: &[u8]) -> Result<(), Error> {
    let parent = dest.parent().ok_or_else(|| StorageError::IoError {
        message: format!("{} has no parent directory", dest.display()),
    })?;
    fs::create_dir_all(parent)
        .await
        .map_err(|e| StorageError::from_io_with_path(&e, parent))?;

    let file_name = dest
        .file_name()
        .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
    let temp_path = parent.join(format!(".{file_name}.{}.tmp", Uuid::new_v4()));

    if let Err(e) = write_synced(&temp_path, contents).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e);
    }

    if let Err(e) = fs::rename(&temp_path, dest).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(StorageError::AtomicRenameFailed {
            message: format!("{} -> {}: {e}", temp_path.display(), dest.display()),
        }
        .into());
    }

    tracing::debug!(path = %dest.display(), bytes = contents.len(), "flushed");
    Ok(())
}

async fn write_synced(path: &Path, contents: &[u8]) -> Result<(), Error> {
    let mut file = fs::File::create(path)
        .await
        .map_err(|e| StorageError::from_io_with_path(&e, path))?;
    file.write_all(contents).await?;
    file.sync_all().await?;
    fs::set_permissions(path, std::fs::Permissions::from_mode(FILE_MODE)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replaces_contents_and_sets_mode() {
        let temp = tempfile::tempdir().unwrap();
        let dest = temp.path().join("index.json");
        fs::write(&dest, b"old").await.unwrap();

        write_atomic(&dest, b"new").await.unwrap();

        assert_eq!(fs::read(&dest).await.unwrap(), b"new");
        let mode = fs::metadata(&dest).await.unwrap().permissions().mode();
        assert_eq!(mode & 0o777, FILE_MODE);

        let mut entries = fs::read_dir(temp.path()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name());
        }
        assert_eq!(names, vec![std::ffi::OsString::from("index.json")]);
    }

    #[tokio::test]
    async fn test_failed_rename_cleans_up() {
        let temp = tempfile::tempdir().unwrap();
        // A non-empty directory cannot be renamed over
        let dest = temp.path().join("index.json");
        fs::create_dir_all(dest.join("occupied")).await.unwrap();

        let error = write_atomic(&dest, b"new").await.unwrap_err();
        assert!(matches!(
            error,
            Error::Storage(StorageError::AtomicRenameFailed { .. })
        ));

        let mut entries = fs::read_dir(temp.path()).await.unwrap();
        let mut count = 0;
        while entries.next_entry().await.unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 1);
    }
}
