//! Shared types and wire formats for assetsync.
//!
//! Everything here is synchronous and side-effect free apart from reading a
//! manifest file from disk. Network sessions live in `assetsync-core`.

/// Audio package manifest and patch descriptors.
pub mod audio;
/// Versioned block-catalog manifest.
pub mod block;
/// Cache patch catalog.
pub mod cache_patch;
/// Decode error taxonomy.
pub mod error;
/// Content hashes and hex/numeric hash conversions.
pub mod hash;
/// Checked big-endian reader used by the binary decoders.
pub mod reader;
/// Text-listed manifest lines.
pub mod text_list;
/// Asset entries, patch references and the summary contract.
pub mod types;

// Re-exports
pub use audio::{AudioAsset, AudioLanguage, AudioManifest, AudioPatchInfo, PckType, RawAudioPatch};
pub use block::{BlockAsset, BlockEntry, BlockManifest};
pub use cache_patch::{CachePatchCatalog, CachePatchRecord};
pub use error::ManifestError;
pub use hash::*;
pub use text_list::parse_text_listing;
pub use types::*;
