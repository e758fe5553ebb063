//! # Error Types Module
//!
//! Structured error types for the registration bot. Each external concern
//! (record store, file relay, rating web-hook, configuration) gets its own
//! enum so handlers can pick the right user-facing message.

use crate::registrant::Column;

/// Errors raised by the record store and the registry built on top of it
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Network, authentication or permission failure talking to the store
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The store answered but refused the request
    #[error("Store rejected request (status {status}): {body}")]
    Rejected { status: u16, body: String },

    /// The row captured earlier no longer belongs to the user
    #[error("Stale row reference: row {row} no longer holds user {user_id}")]
    StaleReference { user_id: u64, row: u32 },

    /// Row index outside the data range
    #[error("Row {0} does not exist")]
    RowOutOfRange(u32),

    /// Column not present in the store layout
    #[error("Column {0:?} is not mapped in the store layout")]
    UnmappedColumn(Column),

    /// The store returned data we could not interpret
    #[error("Malformed store response: {0}")]
    Malformed(String),

    /// Requests are short-circuited after repeated failures
    #[error("Store temporarily disabled after repeated failures")]
    CircuitOpen,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Errors raised while relaying an inbound file to remote storage
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("File of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Remote storage temporarily disabled after repeated failures")]
    CircuitOpen,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the rating web-hook relay
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Rating service is not configured")]
    NotConfigured,

    #[error("Rating service unreachable: {0}")]
    Transport(String),

    #[error("Rating service returned status {0}")]
    Status(u16),

    #[error("Rating service rejected the rating: {0}")]
    Rejected(String),

    #[error("Invalid response from rating service: {0}")]
    InvalidResponse(String),
}

/// Configuration-related errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Field catalog / store layout mismatches detected at startup
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Field {field} needs column {column:?}, which the store layout does not provide")]
    MissingColumn { field: String, column: Column },
}

/// Errors raised by the Google REST client shared by the Sheets and Drive
/// adapters
#[derive(Debug, thiserror::Error)]
pub enum GoogleError {
    #[error("Could not obtain access token: {0}")]
    Auth(String),

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Google API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Could not decode Google API response: {0}")]
    Decode(String),

    #[error("Google API temporarily disabled after repeated failures")]
    CircuitOpen,
}

impl GoogleError {
    /// Whether repeating the same idempotent request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            GoogleError::Transport(_) => true,
            GoogleError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<GoogleError> for StoreError {
    fn from(err: GoogleError) -> Self {
        match err {
            GoogleError::CircuitOpen => StoreError::CircuitOpen,
            GoogleError::Decode(message) => StoreError::Malformed(message),
            GoogleError::Status { status, body } if !matches!(status, 401 | 403 | 429) && status < 500 => {
                StoreError::Rejected { status, body }
            }
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

impl From<GoogleError> for UploadError {
    fn from(err: GoogleError) -> Self {
        match err {
            GoogleError::CircuitOpen => UploadError::CircuitOpen,
            other => UploadError::Upload(other.to_string()),
        }
    }
}
