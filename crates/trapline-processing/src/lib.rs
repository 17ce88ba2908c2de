//! Trapline Processing Library
//!
//! CPU-bound image work and metadata extraction: content hashing over decoded
//! pixels, derivative resizing, and the exiftool-backed metadata extractor.

pub mod derivative;
pub mod exif;
pub mod hash;

// Re-export commonly used types
pub use derivative::{generate_derivatives, DeriveError};
pub use exif::{ExifToolExtractor, ExtractError, MetadataExtractor};
pub use hash::{pixel_hash, pixel_hash_bytes, HashError};
