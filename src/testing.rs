use crate::error::{InspectError, InspectResult};
use crate::fetch::Fetch;
use flate2::{write::GzEncoder, Compression};
use std::cell::Cell;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

/// Serves registered bodies by exact URL; anything else is a 404.
pub struct FakeFetcher {
    bodies: HashMap<String, Vec<u8>>,
    downloads: Cell<usize>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self {
            bodies: HashMap::new(),
            downloads: Cell::new(0),
        }
    }

    pub fn with_text(mut self, url: &str, body: &str) -> Self {
        self.bodies.insert(url.to_string(), body.as_bytes().to_vec());
        self
    }

    pub fn with_gzip(mut self, url: &str, body: &str) -> Self {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(body.as_bytes()).unwrap();
        self.bodies.insert(url.to_string(), encoder.finish().unwrap());
        self
    }

    pub fn download_count(&self) -> usize {
        self.downloads.get()
    }

    fn body(&self, url: &str) -> InspectResult<&[u8]> {
        self.bodies
            .get(url)
            .map(Vec::as_slice)
            .ok_or_else(|| InspectError::Transport {
                status: 404,
                url: url.to_string(),
            })
    }
}

impl Fetch for FakeFetcher {
    fn fetch_text(&self, url: &str) -> InspectResult<String> {
        Ok(String::from_utf8(self.body(url)?.to_vec())?)
    }

    fn download(&self, url: &str, dest: &Path) -> InspectResult<u64> {
        let body = self.body(url)?;
        self.downloads.set(self.downloads.get() + 1);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(dest, body)?;
        Ok(body.len() as u64)
    }
}
