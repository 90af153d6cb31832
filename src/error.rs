use std::path::PathBuf;

use thiserror::Error;

/// Errors in the run configuration.
///
/// These are fatal and are reported before any request reaches the origin server.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Output directory does not exist
    #[error("Output directory does not exist: {}", .0.display())]
    OutputDirMissing(PathBuf),

    /// Targets file does not exist
    #[error("Targets file does not exist: {}", .0.display())]
    TargetsFileMissing(PathBuf),

    /// Tile size must be a positive number of pixels
    #[error("Invalid tile size {0}: must be greater than 0")]
    InvalidTileSize(u32),

    /// A numeric option that must be positive was zero
    #[error("{name} must be greater than 0")]
    NotPositive { name: &'static str },

    /// Inter-request delay was negative or not a number
    #[error("Invalid sleep value {0}: must be a non-negative, representable number of seconds")]
    InvalidSleep(f64),

    /// Destination domain is not a valid URL
    #[error("Invalid domain '{domain}': {message}")]
    InvalidDomain { domain: String, message: String },

    /// A target's source URL is not a valid URL
    #[error("Invalid source URL '{url}' for '{identifier}': {message}")]
    InvalidSourceUrl {
        identifier: String,
        url: String,
        message: String,
    },

    /// Identifier cannot be used as a directory name
    #[error("Invalid identifier '{0}': must be non-empty and contain no path separators")]
    InvalidIdentifier(String),

    /// Custom crop has a partially specified region
    #[error("Invalid custom crop for '{identifier}': {message}")]
    InvalidCrop { identifier: String, message: String },

    /// Same identifier listed more than once
    #[error("Duplicate identifier '{0}' in targets file")]
    DuplicateIdentifier(String),

    /// Targets file could not be read
    #[error("Failed to read {}: {message}", .path.display())]
    Read { path: PathBuf, message: String },

    /// Targets file is not valid JSON for the expected shape
    #[error("Failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
}

/// Errors talking to the origin IIIF server.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// Network or connection error
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// Request exceeded the configured timeout
    #[error("Request to {url} timed out")]
    Timeout { url: String },

    /// info.json body is missing required fields or is not JSON
    #[error("Invalid descriptor from {url}: {message}")]
    InvalidDescriptor { url: String, message: String },

    /// The run was cancelled before this request was issued
    #[error("Cancelled")]
    Cancelled,
}

/// Errors reading or writing the local output tree.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// Filesystem operation failed (permissions, disk full, ...)
    #[error("I/O error at {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },

    /// Cached descriptor is not valid JSON
    #[error("Invalid cached descriptor {}: {message}", .path.display())]
    Json { path: PathBuf, message: String },
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

/// Errors from planning or materializing a single image.
#[derive(Debug, Clone, Error)]
pub enum PlanError {
    /// Remote fetch failed
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Local storage failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// `initialize` was called twice on the same plan
    #[error("Image '{0}' is already initialized")]
    AlreadyInitialized(String),

    /// Tiles were requested before the plan was initialized
    #[error("Image '{0}' has not been initialized")]
    NotInitialized(String),

    /// The task fetching a tile panicked
    #[error("Tile task panicked")]
    TaskPanicked,
}
