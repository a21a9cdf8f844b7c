//! Default filesystem locations for vpkg
//!
//! Each of these can be overridden in the `[paths]` section or through the
//! matching `VPKG_*` environment variable.

/// Scratch space for downloads and converter output
pub const WORK_DIR: &str = "/tmp/vpkg";

/// Local binary package repository
pub const BINPKGS_DIR: &str = "/var/lib/vpkg";

/// Shared-library map handed to the converter
pub const SHLIBS_FILE: &str = "/tmp/vpkg/shlibs";

/// Package-set file name under the user config directory
pub const PACKAGES_FILE: &str = "vpkg.toml";

/// Application config directory name under the user config directory
pub const CONFIG_DIR: &str = "vpkg";
