//! Error types shared by the score store and the corpus.

use thiserror::Error;

/// Failures of the durable score/history storage.
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored value out of range: {0}")]
    OutOfRange(i64),

    #[error("score database lock poisoned")]
    Poisoned,
}

/// Failures loading the embedded paragraph corpus.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("corpus file not found: {0}")]
    MissingFile(String),

    #[error("corpus file is not valid utf-8: {0}")]
    NotUtf8(String),

    #[error("unable to parse corpus: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("corpus contains no usable text")]
    Empty,
}

/// A reference text must contain at least one character.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("reference text must not be empty")]
pub struct EmptyReferenceText;
