pub mod apt;
pub mod cache;
pub mod compression;
pub mod config;
pub mod error;
pub mod fetch;
pub mod location;
pub mod package;
pub mod primary;
pub mod rpm;
pub mod stanza;
pub mod utils;

#[cfg(test)]
mod testing;

pub use apt::AptArchive;
pub use cache::{cache_path, CacheEntry, CacheManager};
pub use compression::CompressionFormat;
pub use config::{Config, Verbosity};
pub use error::{InspectError, InspectResult};
pub use fetch::{Fetch, HttpFetcher};
pub use location::{ArchiveLocation, RpmLocation};
pub use package::{PackageIndex, PackageRecord};
pub use rpm::RpmArchive;

pub const INSPECT_VERSION: &str = env!("CARGO_PKG_VERSION");

use lazy_static::lazy_static;
use std::path::PathBuf;

lazy_static! {
    pub static ref INSPECT_CONFIG: PathBuf = {
        if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(config_home).join("repo-inspect")
        } else if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home).join(".config").join("repo-inspect")
        } else {
            std::env::temp_dir().join("repo-inspect").join("config")
        }
    };
    pub static ref INSPECT_CACHE: PathBuf = std::env::temp_dir().join("repo-inspect");
}
