//! Raw DEFLATE adapter (ZIP compression method 8)
//!
//! No zlib or gzip framing is added. The backend is `flate2`, compiled in by
//! the `deflate` feature; [`supports_compression`] reports whether it is
//! present so callers can pick between stored and compressed output up front.

use crate::error::{Result, XlsxError};

/// Compression level used when the caller does not pick one.
pub const DEFAULT_LEVEL: u32 = 6;

/// Capability probe for the raw DEFLATE primitive.
pub fn supports_compression() -> bool {
    cfg!(feature = "deflate")
}

/// Compress `data` with raw DEFLATE at the default level.
pub fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    deflate_with_level(data, DEFAULT_LEVEL)
}

/// Compress `data` with raw DEFLATE at `level` (clamped to 0..=9).
#[cfg(feature = "deflate")]
pub fn deflate_with_level(data: &[u8], level: u32) -> Result<Vec<u8>> {
    use flate2::write::DeflateEncoder;
    use flate2::Compression;
    use std::io::Write;

    let mut encoder = DeflateEncoder::new(
        Vec::with_capacity(data.len() / 2 + 64),
        Compression::new(level.min(9)),
    );
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

#[cfg(not(feature = "deflate"))]
pub fn deflate_with_level(_data: &[u8], _level: u32) -> Result<Vec<u8>> {
    Err(XlsxError::CompressionUnavailable)
}

/// Decompress a raw DEFLATE stream.
#[cfg(feature = "deflate")]
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    use flate2::read::DeflateDecoder;
    use std::io::Read;

    let mut decoder = DeflateDecoder::new(data);
    let mut out = Vec::with_capacity(data.len().saturating_mul(4));
    decoder
        .read_to_end(&mut out)
        .map_err(|e| XlsxError::InvalidArchive(format!("corrupt deflate stream: {}", e)))?;
    Ok(out)
}

#[cfg(not(feature = "deflate"))]
pub fn inflate(_data: &[u8]) -> Result<Vec<u8>> {
    Err(XlsxError::CompressionUnavailable)
}

/// Suspending variant of [`deflate_with_level`], run on the blocking pool.
#[cfg(feature = "async")]
pub async fn deflate_async(data: Vec<u8>, level: u32) -> Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || deflate_with_level(&data, level)).await?
}

/// Suspending variant of [`inflate`], run on the blocking pool.
#[cfg(feature = "async")]
pub async fn inflate_async(data: Vec<u8>) -> Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || inflate(&data)).await?
}
