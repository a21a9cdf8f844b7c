#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Network operations for vpkg
//!
//! This crate downloads upstream release artifacts over HTTP with retry
//! logic and per-chunk progress callbacks.

mod client;
mod fetch;

pub use client::{NetClient, NetConfig};
pub use fetch::{DownloadProgress, Fetcher};

use url::Url;
use vpkg_errors::{Error, NetworkError};

/// Parse and validate a URL
///
/// # Errors
///
/// Returns an error if the URL string is malformed or is not http(s).
pub fn parse_url(url: &str) -> Result<Url, Error> {
    let parsed = Url::parse(url).map_err(|e| NetworkError::InvalidUrl(format!("{url}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(NetworkError::InvalidUrl(format!("unsupported scheme {other}: {url}")).into()),
    }
}
