use crate::error::InspectResult;
use flate2::read::MultiGzDecoder;
use log::debug;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use xz2::read::XzDecoder;

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const XZ_MAGIC: &[u8] = &[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00];
const ZSTD_MAGIC: &[u8] = &[0x28, 0xb5, 0x2f, 0xfd];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompressionFormat {
    Gzip,
    Xz,
    Zstd,
    None,
}

impl CompressionFormat {
    pub fn from_path(path: &Path) -> Self {
        if let Some(ext) = path.extension().and_then(|s| s.to_str()) {
            match ext.to_lowercase().as_str() {
                "gz" | "gzip" => Self::Gzip,
                "xz" => Self::Xz,
                "zst" | "zstd" => Self::Zstd,
                _ => Self::None,
            }
        } else {
            Self::None
        }
    }

    pub fn from_magic(header: &[u8]) -> Option<Self> {
        if header.starts_with(GZIP_MAGIC) {
            Some(Self::Gzip)
        } else if header.starts_with(XZ_MAGIC) {
            Some(Self::Xz)
        } else if header.starts_with(ZSTD_MAGIC) {
            Some(Self::Zstd)
        } else {
            None
        }
    }

    /// Magic bytes win; an empty or unrecognised header falls back to the extension.
    pub fn detect(path: &Path, header: &[u8]) -> Self {
        Self::from_magic(header).unwrap_or_else(|| {
            if header.is_empty() {
                Self::from_path(path)
            } else {
                Self::None
            }
        })
    }
}

pub fn open_decompressed(path: &Path) -> InspectResult<Box<dyn BufRead>> {
    let mut file = BufReader::new(File::open(path)?);
    let format = CompressionFormat::detect(path, file.fill_buf()?);
    debug!("opening {} ({:?})", path.display(), format);

    let reader: Box<dyn BufRead> = match format {
        CompressionFormat::Gzip => Box::new(BufReader::new(MultiGzDecoder::new(file))),
        CompressionFormat::Xz => Box::new(BufReader::new(XzDecoder::new_multi_decoder(file))),
        CompressionFormat::Zstd => {
            Box::new(BufReader::new(zstd::stream::read::Decoder::with_buffer(file)?))
        }
        CompressionFormat::None => Box::new(file),
    };
    Ok(reader)
}
