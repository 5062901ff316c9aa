use crate::{
    cache::CacheManager,
    compression::open_decompressed,
    config::{Config, Verbosity},
    error::{InspectError, InspectResult},
    fetch::{Fetch, HttpFetcher},
    location::ArchiveLocation,
    package::{PackageIndex, PackageRecord},
    stanza::{find_stanza, release_components, StanzaScanner},
};
use log::{debug, Level};
use std::path::{Path, PathBuf};

pub const DEFAULT_REPO: &str = "https://ftp.debian.org/debian";
pub const DEFAULT_DIST: &str = "stable";
pub const DEFAULT_AREA: &str = "main";
pub const DEFAULT_ARCH: &str = "amd64";

pub struct AptArchive<F: Fetch = HttpFetcher> {
    location: ArchiveLocation,
    cache: CacheManager<F>,
    verbosity: Verbosity,
}

impl AptArchive<HttpFetcher> {
    pub fn from_config(location: ArchiveLocation, config: &Config) -> InspectResult<Self> {
        let fetcher = HttpFetcher::new(config)?;
        let cache = CacheManager::new(
            fetcher,
            config.cache_dir.clone(),
            config.max_cache_age(),
            config.log_level,
        );
        Ok(Self::new(location, cache, config.log_level))
    }
}

impl<F: Fetch> AptArchive<F> {
    pub fn new(location: ArchiveLocation, cache: CacheManager<F>, verbosity: Verbosity) -> Self {
        Self {
            location,
            cache,
            verbosity,
        }
    }

    pub fn packages_cache_path(&self) -> InspectResult<PathBuf> {
        self.cache.cache_path(&self.location.packages_url())
    }

    pub fn sources_cache_path(&self) -> InspectResult<PathBuf> {
        self.cache.cache_path(&self.location.sources_url())
    }

    pub fn components(&self) -> InspectResult<Vec<String>> {
        let release = self.cache.fetcher().fetch_text(&self.location.release_url())?;
        release_components(&release)
    }

    pub fn download_packages(&self, dest: &Path) -> InspectResult<u64> {
        self.cache.fetcher().download(&self.location.packages_url(), dest)
    }

    pub fn download_sources(&self, dest: &Path) -> InspectResult<u64> {
        self.cache.fetcher().download(&self.location.sources_url(), dest)
    }

    pub fn list_sources(&self) -> InspectResult<Vec<PackageRecord>> {
        let path = self.cache.resolve(&self.location.sources_url())?;
        self.scan_all(&path)
    }

    pub fn show_source(&self, name: &str) -> InspectResult<String> {
        let path = self.cache.resolve(&self.location.sources_url())?;
        self.scan_one(&path, name)
    }

    fn scan_all(&self, path: &Path) -> InspectResult<Vec<PackageRecord>> {
        let records = StanzaScanner::new(open_decompressed(path)?)
            .collect::<InspectResult<Vec<_>>>()?;
        if self.verbosity.allows(Level::Debug) {
            debug!("{} lists {} packages", path.display(), records.len());
        }
        Ok(records)
    }

    fn scan_one(&self, path: &Path, name: &str) -> InspectResult<String> {
        find_stanza(open_decompressed(path)?, name)?
            .ok_or_else(|| InspectError::PackageNotFound(name.to_string()))
    }
}

impl<F: Fetch> PackageIndex for AptArchive<F> {
    fn list_packages(&self) -> InspectResult<Vec<PackageRecord>> {
        let path = self.cache.resolve(&self.location.packages_url())?;
        self.scan_all(&path)
    }

    fn show_package(&self, name: &str) -> InspectResult<String> {
        let path = self.cache.resolve(&self.location.packages_url())?;
        self.scan_one(&path, name)
    }
}
