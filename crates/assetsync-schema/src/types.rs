use serde::{Deserialize, Serialize};

use crate::hash::{ContentHash, encode_hex};

/// Which decode variant produced an asset entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetFamily {
    /// Block-catalog / framed binary payloads.
    Block,
    /// Scripted payloads (script bundles keyed by SHA-1).
    Scripted,
    /// CSV-style text listings.
    TextListed,
    /// Audio packages described by a JSON manifest.
    Audio,
    /// Entries resolved from a cache patch catalog.
    CachePatch,
}

impl std::fmt::Display for AssetFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Block => "block",
            Self::Scripted => "scripted",
            Self::TextListed => "text-listed",
            Self::Audio => "audio",
            Self::CachePatch => "cache-patch",
        };
        f.write_str(s)
    }
}

/// Describes the binary delta that turns an old asset into a new one.
///
/// The patch filename is derived from `patch_blob_hash` on every call, so it
/// can never drift from the hash it names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchRef {
    /// Identity of the asset the patch applies to.
    pub old_hash: ContentHash,
    /// Identity of the asset the patch produces.
    pub new_hash: ContentHash,
    /// Content hash of the patch blob itself.
    pub patch_blob_hash: ContentHash,
    /// Size of the patch blob in bytes.
    pub patch_size: u64,
}

impl PatchRef {
    /// `lowercase-hex(patch_blob_hash) + ".patch"`.
    pub fn patch_filename(&self) -> String {
        format!("{}.patch", encode_hex(self.patch_blob_hash.as_bytes()))
    }
}

/// Uniform capability set a shared aggregator uses to collect entries
/// across asset families without knowing their concrete type.
pub trait AssetIndexSummary: std::fmt::Debug + Send + Sync {
    /// Human-readable one-line description.
    fn print_summary(&self) -> String;

    /// Bytes that must be downloaded for this entry.
    fn asset_size(&self) -> u64;

    /// Current remote location.
    fn remote_url(&self) -> &str;

    /// Point the entry at a different location (mirror/CDN failover).
    fn set_remote_url(&mut self, url: String);

    /// Independent copy, for snapshotting a catalog before mutating it.
    fn clone_boxed(&self) -> Box<dyn AssetIndexSummary>;
}

impl Clone for Box<dyn AssetIndexSummary> {
    fn clone(&self) -> Self {
        self.clone_boxed()
    }
}

/// One downloadable asset, as produced by any decoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetEntry {
    /// Filename on the local side.
    pub local_name: String,
    /// Path relative to the family's remote root.
    pub relative_path: String,
    /// Digest of the asset content.
    pub content_hash: ContentHash,
    /// Size in bytes.
    pub size: u64,
    /// Family that produced the entry.
    pub family: AssetFamily,
    remote_url: String,
    patch: Option<PatchRef>,
}

impl AssetEntry {
    /// Create an entry with no remote URL and no patch.
    pub fn new(
        local_name: impl Into<String>,
        relative_path: impl Into<String>,
        content_hash: ContentHash,
        size: u64,
        family: AssetFamily,
    ) -> Self {
        Self {
            local_name: local_name.into(),
            relative_path: relative_path.into(),
            content_hash,
            size,
            family,
            remote_url: String::new(),
            patch: None,
        }
    }

    /// Builder-style remote URL.
    pub fn with_remote_url(mut self, url: impl Into<String>) -> Self {
        self.remote_url = url.into();
        self
    }

    /// Builder-style patch attachment.
    pub fn with_patch(mut self, patch: PatchRef) -> Self {
        self.patch = Some(patch);
        self
    }

    /// Patch descriptor, if the entry can be reached by delta.
    pub fn patch(&self) -> Option<&PatchRef> {
        self.patch.as_ref()
    }
}

impl AssetIndexSummary for AssetEntry {
    fn print_summary(&self) -> String {
        let mut s = format!(
            "[{}] {} ({} bytes, {})",
            self.family, self.relative_path, self.size, self.content_hash
        );
        if let Some(patch) = &self.patch {
            s.push_str(&format!(" via {} ({} bytes)", patch.patch_filename(), patch.patch_size));
        }
        s
    }

    fn asset_size(&self) -> u64 {
        self.size
    }

    fn remote_url(&self) -> &str {
        &self.remote_url
    }

    fn set_remote_url(&mut self, url: String) {
        self.remote_url = url;
    }

    fn clone_boxed(&self) -> Box<dyn AssetIndexSummary> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch(blob: &[u8]) -> PatchRef {
        PatchRef {
            old_hash: ContentHash::new(vec![1]),
            new_hash: ContentHash::new(vec![2]),
            patch_blob_hash: ContentHash::new(blob.to_vec()),
            patch_size: 10,
        }
    }

    #[test]
    fn patch_filename_tracks_blob_hash() {
        let mut p = patch(&[0xAB, 0xCD, 0x0F]);
        assert_eq!(p.patch_filename(), "abcd0f.patch");
        p.patch_blob_hash = ContentHash::new(vec![0xFF]);
        assert_eq!(p.patch_filename(), "ff.patch");
    }

    #[test]
    fn remote_url_is_mutable_through_trait() {
        let mut entry = AssetEntry::new("a", "dir/a", ContentHash::new(vec![0]), 3, AssetFamily::Block)
            .with_remote_url("https://cdn-a/dir/a");
        entry.set_remote_url("https://cdn-b/dir/a".to_string());
        assert_eq!(entry.remote_url(), "https://cdn-b/dir/a");
    }

    #[test]
    fn clone_boxed_is_independent() {
        let entry: Box<dyn AssetIndexSummary> = Box::new(
            AssetEntry::new("a", "a", ContentHash::new(vec![0]), 3, AssetFamily::Block)
                .with_remote_url("u1"),
        );
        let mut snapshot = entry.clone();
        snapshot.set_remote_url("u2".to_string());
        assert_eq!(entry.remote_url(), "u1");
        assert_eq!(snapshot.remote_url(), "u2");
    }

    #[test]
    fn summary_mentions_patch() {
        let entry = AssetEntry::new("a", "a", ContentHash::new(vec![0xAA]), 3, AssetFamily::CachePatch)
            .with_patch(patch(&[0x01]));
        let summary = entry.print_summary();
        assert!(summary.contains("[cache-patch] a"));
        assert!(summary.contains("01.patch"));
    }
}
