use std::io;
use thumbgrid_decode::DecodeError;

/// Errors produced by the disk journal and the tiered cache
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("cache is closed")]
    Closed,

    #[error("invalid cache key {0:?}: keys must match [a-z0-9_-]{{1,120}}")]
    InvalidKey(String),

    #[error("corrupt journal at line {line}: {reason}")]
    CorruptJournal { line: usize, reason: String },

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}
