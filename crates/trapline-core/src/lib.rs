//! Trapline Core Library
//!
//! This crate provides the domain models, configuration, validation, and
//! vendor-quirk hooks shared across all Trapline components.

pub mod config;
pub mod models;
pub mod quirks;
pub mod validate;

// Re-export commonly used types
pub use config::IngestConfig;
pub use models::{IngestEvent, ImageRecord, RecordIdentity, SizeVariant};
pub use quirks::{apply_vendor_quirks, builtin_quirks, VendorQuirk};
pub use validate::{classify, normalize_file_name, IngestKind};
