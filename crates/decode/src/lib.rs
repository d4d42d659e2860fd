//! Thumbgrid Decode Library
//!
//! Bitmap type, decode sample-factor calculation, and a downsampling decoder
//! that bounds the size of decoded images to a requested target.

pub mod bitmap;
pub mod decoder;
pub mod encoder;
pub mod sample;

pub use bitmap::{Bitmap, ImageSize};
pub use decoder::{
    decode_sampled, decode_sampled_file, decode_sampled_with_limit, read_dimensions, DecodeError,
    DEFAULT_MAX_DECODE_BYTES,
};
pub use encoder::{encode, CompressFormat};
pub use sample::{compute_sample_factor, sampled_size, PIXEL_OVERSHOOT_LIMIT};
