use thiserror::Error;

/// Errors raised by the triage core (storage, filesystem, settings).
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Settings error: {0}")]
    Settings(#[from] serde_json::Error),

    /// A record was requested that was never seeded. Callers seed with
    /// `RecordStore::ensure` first, so this means an invariant was broken.
    #[error("No record for {filename} in {folder}")]
    NotFound { folder: String, filename: String },

    #[error("Unknown delete action stored: {0:?}")]
    InvalidDeleteAction(String),
}

pub type Result<T> = std::result::Result<T, Error>;
