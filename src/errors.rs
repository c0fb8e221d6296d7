use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordParseError {
    #[error("Syntax error: {0}")]
    SyntaxError(String),
    /// A record that started with a LOCUS line but couldn't be read to the
    /// end. The reader has skipped to the following record, `id` is
    /// whatever identifier was read before the error (possibly empty).
    #[error("Malformed record {id}: {reason}")]
    Malformed { id: String, reason: String },
    #[error("{0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("File was not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Unable to read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Chunk size must be at least 1")]
    ZeroChunkSize,
    #[error("The {0} list is empty")]
    EmptyList(&'static str),
}

/// Errors that end a run. Everything else (throttling, failed chunks,
/// unresolvable records) is recovered from and only shows up in the log.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Unable to read accession list {}: {source}", path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Unable to write output: {0}")]
    Output(#[source] io::Error),
}
