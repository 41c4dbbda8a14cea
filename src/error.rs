use std::path::PathBuf;
use thiserror::Error;

/// Crate-wide result alias.
pub type R<T, E = AudioError> = std::result::Result<T, E>;

/// Everything that can go wrong while reading or writing an audio file.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("first 12 bytes match neither a WAVE nor an AIFF signature")]
    UnknownFormat,

    #[error("malformed chunk: {0}")]
    MalformedChunk(&'static str),

    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("channels in the sample buffer have unequal lengths")]
    ShapeMismatch,

    #[error("could not write {}: {source}", path.display())]
    WriteFailure {
        path: PathBuf,
        source: std::io::Error,
    },
}
