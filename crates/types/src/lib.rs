#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for vpkg
//!
//! Package specifications as declared by the user, metadata records as
//! produced by the converter, and the version ordering that relates them.

pub mod installed;
pub mod meta;
pub mod package;
pub mod version;

pub use installed::InstalledPackages;
pub use meta::PackageMeta;
pub use package::{PackageSet, PackageSpec, RevertPolicy, Staleness};
pub use version::{compare_versions, pkgpattern_name, split_pkgver};

/// Tag the converter stamps on every package it produces
pub const CONVERTER_TAG: &str = "xdeb";

/// Architecture name accepted for every target
pub const NOARCH: &str = "noarch";

/// Map the host architecture to the package naming used by the target
/// distribution.
#[must_use]
pub fn native_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86" => "i686",
        "arm" => "armv7l",
        other => other,
    }
}
