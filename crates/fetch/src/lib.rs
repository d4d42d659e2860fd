//! Thumbgrid fetch library
//!
//! Turns a logical image key into a decoded, downsampled bitmap. Keys name a
//! bundled resource, a local file, or a URL. URL responses are streamed into
//! a dedicated raw-bytes disk tier before decoding, so each image is
//! downloaded once.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod producer;
pub mod resources;
pub mod source;

pub use config::FetcherConfig;
pub use error::FetchError;
pub use fetcher::ImageFetcher;
pub use http::{build_agent, download_to, IO_BUFFER_SIZE};
pub use producer::BitmapProducer;
pub use resources::ResourceBundle;
pub use source::ImageSource;
