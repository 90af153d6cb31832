use async_trait::async_trait;
use bytes::Bytes;

use crate::error::FetchError;

/// Trait for fetching resources from an IIIF image server.
///
/// Both `info.json` descriptors and rendered crops go through this single
/// method, which lets tests substitute an in-memory server and count requests.
/// Implementations must be thread-safe; tile fetches may run concurrently.
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// GET `url` and return the body verbatim.
    ///
    /// Any status other than 200 is an error.
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}

