use crate::{
    config::Verbosity,
    error::{InspectError, InspectResult},
    fetch::Fetch,
    utils::{format_duration, format_size},
};
use chrono::{DateTime, Local};
use log::{debug, info, Level};
use std::{
    io,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};
use url::Url;

/// Maps `url` to a file under `root`, mirroring the URL's scheme, host
/// (with `_port` when explicit) and path segments. Empty path segments,
/// including the one left by a trailing slash, become `_index`; real
/// segments starting with `_` get one more, so neither can stand for the
/// other. A query string stays on the last component after `%3F`; literal
/// `%` is written as `%25`.
pub fn cache_path(root: &Path, url: &str) -> InspectResult<PathBuf> {
    let parsed = Url::parse(url)?;
    let host = parsed
        .host_str()
        .ok_or(InspectError::InvalidUrl(url::ParseError::EmptyHost))?;

    let mut path = root.join(parsed.scheme());
    match parsed.port() {
        Some(port) => path.push(format!("{}_{}", host, port)),
        None => path.push(host),
    }

    let mut components: Vec<String> = parsed
        .path_segments()
        .map(|segments| segments.map(segment_name).collect())
        .unwrap_or_default();
    if let Some(query) = parsed.query() {
        let suffix = format!("%3F{}", escape_percent(query).replace('/', "%2F"));
        match components.last_mut() {
            Some(last) => last.push_str(&suffix),
            None => components.push(format!("_index{}", suffix)),
        }
    }
    for component in components {
        path.push(component);
    }
    Ok(path)
}

fn segment_name(segment: &str) -> String {
    if segment.is_empty() {
        "_index".to_string()
    } else if segment.starts_with('_') {
        format!("_{}", escape_percent(segment))
    } else {
        escape_percent(segment)
    }
}

fn escape_percent(text: &str) -> String {
    text.replace('%', "%25")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub path: PathBuf,
    pub modified: SystemTime,
}

impl CacheEntry {
    pub fn open(path: &Path) -> io::Result<Option<Self>> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => Ok(Some(Self {
                path: path.to_path_buf(),
                modified: meta.modified()?,
            })),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Modification times in the future count as age zero.
    pub fn age(&self, now: SystemTime) -> Duration {
        now.duration_since(self.modified).unwrap_or(Duration::ZERO)
    }

    pub fn is_fresh(&self, max_age: Duration, now: SystemTime) -> bool {
        self.age(now) <= max_age
    }
}

pub struct CacheManager<F: Fetch> {
    fetcher: F,
    root: PathBuf,
    max_age: Duration,
    verbosity: Verbosity,
}

impl<F: Fetch> CacheManager<F> {
    pub fn new(fetcher: F, root: PathBuf, max_age: Duration, verbosity: Verbosity) -> Self {
        Self {
            fetcher,
            root,
            max_age,
            verbosity,
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn cache_path(&self, url: &str) -> InspectResult<PathBuf> {
        cache_path(&self.root, url)
    }

    pub fn resolve(&self, url: &str) -> InspectResult<PathBuf> {
        let local = self.cache_path(url)?;
        let now = SystemTime::now();

        match CacheEntry::open(&local)? {
            Some(entry) if entry.is_fresh(self.max_age, now) => {
                if self.verbosity.allows(Level::Debug) {
                    let modified: DateTime<Local> = entry.modified.into();
                    debug!(
                        "reusing cached {} (age: {}, modified {})",
                        local.display(),
                        format_duration(entry.age(now).as_secs()),
                        modified.format("%Y-%m-%d %H:%M:%S")
                    );
                }
                Ok(local)
            }
            Some(entry) => {
                if self.verbosity.allows(Level::Info) {
                    info!(
                        "cached {} is stale (age: {}), downloading {}",
                        local.display(),
                        format_duration(entry.age(now).as_secs()),
                        url
                    );
                }
                self.refresh(url, &local)?;
                Ok(local)
            }
            None => {
                if self.verbosity.allows(Level::Info) {
                    info!("downloading {} to {}", url, local.display());
                }
                self.refresh(url, &local)?;
                Ok(local)
            }
        }
    }

    fn refresh(&self, url: &str, local: &Path) -> InspectResult<()> {
        let written = self.fetcher.download(url, local)?;
        if self.verbosity.allows(Level::Debug) {
            debug!("cached {} ({})", local.display(), format_size(written));
        }
        Ok(())
    }
}
