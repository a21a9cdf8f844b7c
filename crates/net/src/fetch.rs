//! Artifact retrieval with progress reporting

use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use vpkg_errors::{Error, NetworkError, StorageError};

use crate::client::NetClient;

/// Bytes received so far and the advertised total, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    pub downloaded: u64,
    pub total: Option<u64>,
}

/// Downloads one artifact per call
#[derive(Clone)]
pub struct Fetcher {
    client: NetClient,
}

impl Fetcher {
    #[must_use]
    pub fn new(client: NetClient) -> Self {
        Self { client }
    }

    /// Retrieve `url` into `dest`, reporting progress once per received
    /// chunk. Returns the number of bytes written.
    ///
    /// The parent directory of `dest` is created if missing. The body is
    /// streamed into a `.part` sibling and renamed into place once complete.
    ///
    /// # Errors
    ///
    /// Returns a `NetworkError` for transport failures and non-success
    /// statuses, and a `StorageError` when the destination cannot be written.
    pub async fn fetch<F>(&self, url: &str, dest: &Path, mut on_progress: F) -> Result<u64, Error>
    where
        F: FnMut(DownloadProgress),
    {
        crate::parse_url(url)?;

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::from_io_with_path(&e, parent))?;
        }

        let response = self.client.get(url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::HttpError {
                status: status.as_u16(),
                message: status.to_string(),
            }
            .into());
        }

        let total = response.content_length();
        let part = part_path(dest);
        let result = stream_to_file(response, &part, total, &mut on_progress).await;

        match result {
            Ok(downloaded) => {
                fs::rename(&part, dest)
                    .await
                    .map_err(|e| StorageError::from_io_with_path(&e, dest))?;
                tracing::debug!(url, dest = %dest.display(), bytes = downloaded, "fetched");
                Ok(downloaded)
            }
            Err(e) => {
                let _ = fs::remove_file(&part).await;
                Err(e)
            }
        }
    }
}

async fn stream_to_file<F>(
    response: reqwest::Response,
    path: &Path,
    total: Option<u64>,
    on_progress: &mut F,
) -> Result<u64, Error>
where
    F: FnMut(DownloadProgress),
{
    let mut file = fs::File::create(path)
        .await
        .map_err(|e| StorageError::from_io_with_path(&e, path))?;
    let mut stream = response.bytes_stream();
    let mut downloaded = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| NetworkError::DownloadFailed(e.to_string()))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| StorageError::from_io_with_path(&e, path))?;

        downloaded += chunk.len() as u64;
        on_progress(DownloadProgress { downloaded, total });
    }

    file.flush()
        .await
        .map_err(|e| StorageError::from_io_with_path(&e, path))?;
    Ok(downloaded)
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}
