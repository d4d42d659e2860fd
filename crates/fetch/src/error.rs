use std::io;
use thumbgrid_cache::CacheError;
use thumbgrid_decode::DecodeError;

/// Errors produced while acquiring image bytes
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(Box<ureq::Error>),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("unknown resource: {0}")]
    UnknownResource(String),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

impl From<ureq::Error> for FetchError {
    fn from(err: ureq::Error) -> Self {
        FetchError::Http(Box::new(err))
    }
}
