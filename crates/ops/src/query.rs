//! Package listing

use crate::{ListEntry, OpsCtx};
use vpkg_errors::Error;

/// Installed packages that the converter produced
///
/// # Errors
///
/// Returns an error if the engine cannot report installed packages.
pub async fn list_installed(ctx: &OpsCtx) -> Result<Vec<ListEntry>, Error> {
    let installed = ctx.engine.installed().await?;
    Ok(installed
        .converted()
        .map(|meta| ListEntry {
            name: meta.name().to_string(),
            pkgver: Some(meta.pkgver.clone()),
        })
        .collect())
}

/// Every package in the package set with its installed version, if any
///
/// # Errors
///
/// Returns an error if the engine cannot report installed packages.
pub async fn list_package_set(ctx: &OpsCtx) -> Result<Vec<ListEntry>, Error> {
    let installed = ctx.engine.installed().await?;
    Ok(ctx
        .packages
        .iter()
        .map(|(name, _)| ListEntry {
            name: name.to_string(),
            pkgver: installed.get(name).map(|meta| meta.pkgver.clone()),
        })
        .collect())
}
