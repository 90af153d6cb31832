//! Remote fetching and local persistence.
//!
//! - [`ImageSource`]: fetch seam for the origin IIIF server
//! - [`HttpImageSource`]: reqwest implementation
//! - [`RateLimiter`]: minimum spacing between origin requests
//! - [`write_atomic`]: write-then-rename so partial files never look complete

mod http_source;
mod rate_limit;
mod source;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::StorageError;

pub use http_source::{HttpImageSource, DEFAULT_TIMEOUT_SECS};
pub use rate_limit::RateLimiter;
pub use source::ImageSource;

/// Suffix of in-progress files.
pub const PARTIAL_SUFFIX: &str = ".part";

/// Temporary path used while `path` is being written.
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(OsString::new);
    name.push(PARTIAL_SUFFIX);
    path.with_file_name(name)
}

/// Write `data` to `path`, creating parent directories as needed.
///
/// The bytes land in a sibling `.part` file first and are renamed into place,
/// so `path` only ever exists with its complete contents.
pub async fn write_atomic(path: &Path, data: &[u8]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StorageError::io(parent, e))?;
    }

    let tmp = partial_path(path);
    if let Err(e) = tokio::fs::write(&tmp, data).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(StorageError::io(&tmp, e));
    }

    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| StorageError::io(path, e))
}
