//! Content hashing of package archives

use blake3::Hasher;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use vpkg_errors::{Error, StorageError};

const CHUNK_SIZE: usize = 64 * 1024;

/// BLAKE3 digest (lowercase hex) and byte size of a file
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub async fn file_digest(path: &Path) -> Result<(String, u64), Error> {
    let mut file = File::open(path)
        .await
        .map_err(|e| StorageError::from_io_with_path(&e, path))?;

    let mut hasher = Hasher::new();
    let mut buffer = vec![0; CHUNK_SIZE];
    let mut size = 0u64;

    loop {
        let n = file.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
        size += n as u64;
    }

    Ok((hex::encode(hasher.finalize().as_bytes()), size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_known_digest() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("hello");
        tokio::fs::write(&path, b"hello world").await.unwrap();

        let (digest, size) = file_digest(&path).await.unwrap();
        assert_eq!(
            digest,
            "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24"
        );
        assert_eq!(size, 11);
    }
}
