//! Error types.

use std::path::PathBuf;
use thiserror::Error;

/// Resolution failures inside the core.
///
/// Clients never see these: `NotFound` and `AmbiguousMatch` both collapse to
/// the uniform no-match answer and `LookupServiceUnavailable` degrades to an
/// unknown client country.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MirrorError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("ambiguous match: {0}")]
    AmbiguousMatch(String),

    #[error("country lookup unavailable: {0}")]
    LookupServiceUnavailable(String),
}

pub type Result<T> = std::result::Result<T, MirrorError>;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("protobuf error: {0}")]
    Protobuf(#[from] protobuf::Error),

    #[error("invalid {entity} {id}: {reason}")]
    Invalid {
        entity: &'static str,
        id: i64,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Options(#[from] getopts::Fail),

    #[error("invalid value {value:?} for --{option}")]
    InvalidValue { option: &'static str, value: String },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path}:{line}: expected prefix,product,category")]
    RepoMapLine { path: PathBuf, line: usize },
}
