//! Error types and handling for the WordNet engine.
//!
//! This module defines the main error type `Error` and a convenience
//! `Result` type alias used throughout the crate. Variants map onto the
//! error taxonomy of the specification: configuration, project metadata,
//! I/O, parse, database, and domain errors. Callers are expected to match
//! on variant, not on message text.

use thiserror::Error;

/// Custom Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type representing all possible errors raised by the
/// WordNet engine.
#[derive(Error, Debug)]
pub enum Error {
    // --- Configuration ---
    /// Could not determine or create the data directory.
    #[error("data directory not found or could not be determined")]
    DataDirNotFound,

    /// The project-index TOML is malformed or unreadable.
    #[error("invalid project index: {0}")]
    InvalidProjectIndex(String),

    // --- Project (external project-index resolution) ---
    #[error("unknown project: {0}")]
    UnknownProject(String),

    #[error("unknown project version: {project}:{version}")]
    UnknownProjectVersion { project: String, version: String },

    /// The project index explicitly marks a version as retired/erroring.
    #[error("project version unavailable: {0}")]
    ProjectVersionError(String),

    #[error("project version has no download URL: {project}:{version}")]
    MissingProjectUrl { project: String, version: String },

    // --- IO ---
    /// I/O operations failed (file read/write, archive extraction, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive error: {0}")]
    Archive(String),

    // --- Parse ---
    /// XML parsing failed (streaming reader).
    #[error("XML parsing error: {0}")]
    XmlParse(#[from] quick_xml::Error),

    /// XML deserialization failed (serde/DOM path).
    #[error("XML deserialization error: {0}")]
    XmlDeserialize(#[from] quick_xml::DeError),

    #[error("unsupported LMF version: {0}")]
    UnsupportedVersion(String),

    #[error("malformed TSV input: {0}")]
    TsvParse(String),

    /// Generic parsing error for non-XML, non-TSV data.
    #[error("failed to parse data: {0}")]
    ParseError(String),

    // --- Database ---
    /// SQLite database operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The store is held by another ingestion; the caller should retry later.
    #[error("database is busy (another ingestion may be in progress)")]
    Busy,

    // --- Domain ---
    #[error("no path exists between the given synsets")]
    NoPath,

    #[error("incompatible parts of speech for similarity comparison")]
    IncompatiblePos,

    #[error("invalid max depth for Leacock-Chodorow similarity: {0}")]
    InvalidMaxDepth(i64),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("lexicon already exists: {0}:{1} (pass force=true to overwrite)")]
    LexiconExists(String, String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A background task (`spawn_blocking`/`spawn`) panicked or was cancelled.
    #[error("async task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Unexpected internal error; indicates a bug rather than bad input.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::TsvParse(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::InvalidProjectIndex(err.to_string())
    }
}
