//! Platform-specific lookup
//!
//! This module knows how the relay tool is named on each platform and where
//! to look for it on disk.

mod detection;
mod locator;

pub use detection::HostPlatform;
pub use locator::{
    executable_name, resolve_executable, Located, LocatedFrom, Locator, SearchRoots,
    EXECUTABLE_STEM, RESOURCE_DIR_ENV,
};
