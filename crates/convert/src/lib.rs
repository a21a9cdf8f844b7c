#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Package conversion for vpkg
//!
//! Runs the external `xdeb` converter on a downloaded artifact and reads
//! the metadata record back out of the package archive it produces.

mod archive;
pub mod plist;
mod xdeb;

pub use archive::{read_package_meta, PROPS_ENTRY};
pub use xdeb::{Converter, ENV_BINPKGS, ENV_PKGROOT, ENV_SHLIBS};
