use crate::{
    cache::CacheManager,
    compression::open_decompressed,
    config::{Config, Verbosity},
    error::{InspectError, InspectResult},
    fetch::{Fetch, HttpFetcher},
    location::RpmLocation,
    package::{PackageIndex, PackageRecord},
    primary::{find_package, primary_location, PrimaryScanner},
};
use log::{debug, Level};
use std::path::{Path, PathBuf};

pub const DEFAULT_REPO: &str = "https://mirror.nsc.liu.se/centos-store/8.4.2105/BaseOS/Source/";

pub struct RpmArchive<F: Fetch = HttpFetcher> {
    location: RpmLocation,
    cache: CacheManager<F>,
    verbosity: Verbosity,
}

impl RpmArchive<HttpFetcher> {
    pub fn from_config(location: RpmLocation, config: &Config) -> InspectResult<Self> {
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

impl<F: Fetch> RpmArchive<F> {
    pub fn new(location: RpmLocation, cache: CacheManager<F>, verbosity: Verbosity) -> Self {
        Self {
            location,
            cache,
            verbosity,
        }
    }

    /// URL of the current primary package list. The file name changes with
    /// every repository update, so repomd.xml is fetched on each call.
    pub fn primary_url(&self) -> InspectResult<String> {
        let repomd = self.cache.fetcher().fetch_text(&self.location.repomd_url())?;
        let href = primary_location(&repomd)?;
        if self.verbosity.allows(Level::Debug) {
            debug!("primary package list of {} is {}", self.location.repo(), href);
        }
        Ok(self.location.resource_url(&href))
    }

    pub fn package_list_cache_path(&self) -> InspectResult<PathBuf> {
        self.cache.cache_path(&self.primary_url()?)
    }

    pub fn download_package_list(&self, dest: &Path) -> InspectResult<u64> {
        self.cache.fetcher().download(&self.primary_url()?, dest)
    }

    fn update_package_list_cache(&self) -> InspectResult<PathBuf> {
        self.cache.resolve(&self.primary_url()?)
    }
}

impl<F: Fetch> PackageIndex for RpmArchive<F> {
    fn list_packages(&self) -> InspectResult<Vec<PackageRecord>> {
        let path = self.update_package_list_cache()?;
        let records = PrimaryScanner::new(open_decompressed(&path)?)
            .map(|package| package?.record())
            .collect::<InspectResult<Vec<_>>>()?;
        if self.verbosity.allows(Level::Debug) {
            debug!("{} lists {} packages", path.display(), records.len());
        }
        Ok(records)
    }

    fn show_package(&self, name: &str) -> InspectResult<String> {
        let path = self.update_package_list_cache()?;
        find_package(open_decompressed(&path)?, name)?
            .ok_or_else(|| InspectError::PackageNotFound(name.to_string()))
    }
}
