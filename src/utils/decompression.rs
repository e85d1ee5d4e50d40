use anyhow::{Context, Result};
use bytes::Bytes;
use std::io::Read;

/// Container formats a subscription body may arrive in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    Gzip,
    Bzip2,
    Xz,
    Uncompressed,
}

impl CompressionFormat {
    /// Sniff the format from magic bytes
    pub fn sniff(data: &[u8]) -> Self {
        match infer::get(data).map(|kind| kind.mime_type()) {
            Some("application/gzip") => Self::Gzip,
            Some("application/x-bzip2") => Self::Bzip2,
            Some("application/x-xz") => Self::Xz,
            _ => Self::Uncompressed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
            Self::Xz => "xz",
            Self::Uncompressed => "plain",
        }
    }
}

/// Undoes transport-level compression that reqwest leaves in place
pub struct DecompressionService;

impl DecompressionService {
    pub fn detect_compression_format(data: &[u8]) -> CompressionFormat {
        CompressionFormat::sniff(data)
    }

    /// Inflate `data` when it carries a known magic, otherwise hand it back
    pub fn decompress(data: Bytes) -> Result<Vec<u8>> {
        let format = CompressionFormat::sniff(&data);
        match format {
            CompressionFormat::Uncompressed => Ok(data.to_vec()),
            CompressionFormat::Gzip => inflate(flate2::read::GzDecoder::new(&data[..]), format),
            CompressionFormat::Bzip2 => Self::bzip2(&data),
            CompressionFormat::Xz => Self::xz(&data),
        }
    }

    #[cfg(feature = "compression-bzip2")]
    fn bzip2(data: &[u8]) -> Result<Vec<u8>> {
        inflate(bzip2::read::BzDecoder::new(data), CompressionFormat::Bzip2)
    }

    #[cfg(not(feature = "compression-bzip2"))]
    fn bzip2(_data: &[u8]) -> Result<Vec<u8>> {
        anyhow::bail!("bzip2 body received but the compression-bzip2 feature is disabled")
    }

    #[cfg(feature = "compression-xz")]
    fn xz(data: &[u8]) -> Result<Vec<u8>> {
        inflate(xz2::read::XzDecoder::new(data), CompressionFormat::Xz)
    }

    #[cfg(not(feature = "compression-xz"))]
    fn xz(_data: &[u8]) -> Result<Vec<u8>> {
        anyhow::bail!("xz body received but the compression-xz feature is disabled")
    }
}

fn inflate<R: Read>(mut reader: R, format: CompressionFormat) -> Result<Vec<u8>> {
    let mut inflated = Vec::new();
    reader
        .read_to_end(&mut inflated)
        .with_context(|| format!("{} stream is truncated or corrupt", format.as_str()))?;
    Ok(inflated)
}
