//! Flat catalog of cache-asset patches.
//!
//! Layout (big-endian):
//! ```text
//! [u32 count]
//! count × { [string oldName][string newName][string oldHashHex][string patchHashHex][u32 patchSize] }
//! ```
//! Asset identities are not stored directly; they are the hex suffix of the
//! `<basename>_<hexhash>` filenames.

use std::io::Read;
use std::path::Path;

use bytes::BufMut;

use crate::error::ManifestError;
use crate::hash::ContentHash;
use crate::reader::{ByteReader, put_string};
use crate::types::{AssetEntry, AssetFamily, AssetIndexSummary, PatchRef};

// four empty string prefixes + patch size
const MIN_RECORD_LEN: usize = 4 * 4 + 4;

/// A patchable asset: the new asset's entry (carrying its [`PatchRef`]) plus
/// what is known about the old asset it is derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePatchRecord {
    entry: AssetEntry,
    patch: PatchRef,
    old_name: String,
    old_content_hash: ContentHash,
}

impl CachePatchRecord {
    /// Entry for the new asset, with its patch attached.
    pub fn entry(&self) -> &AssetEntry {
        &self.entry
    }

    /// Filename of the asset the patch applies to.
    pub fn old_name(&self) -> &str {
        &self.old_name
    }

    /// MD5 of the old asset's content, used to check the local copy.
    pub fn old_content_hash(&self) -> &ContentHash {
        &self.old_content_hash
    }

    /// The patch descriptor.
    pub fn patch(&self) -> &PatchRef {
        &self.patch
    }

    /// Consume the record, keeping only the entry.
    pub fn into_entry(self) -> AssetEntry {
        self.entry
    }
}

impl AssetIndexSummary for CachePatchRecord {
    fn print_summary(&self) -> String {
        format!("{} <- {}", self.entry.print_summary(), self.old_name)
    }

    fn asset_size(&self) -> u64 {
        self.entry.asset_size()
    }

    fn remote_url(&self) -> &str {
        self.entry.remote_url()
    }

    fn set_remote_url(&mut self, url: String) {
        self.entry.set_remote_url(url);
    }

    fn clone_boxed(&self) -> Box<dyn AssetIndexSummary> {
        Box::new(self.clone())
    }
}

/// Ordered list of cache patch records. Lookups are linear scans.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CachePatchCatalog {
    records: Vec<CachePatchRecord>,
}

/// Extract the identity hash from a `<basename>_<hexhash>` filename.
///
/// Names must split into exactly two non-empty segments; names with extra
/// underscores are rejected rather than guessed at.
///
/// # Errors
///
/// Returns [`ManifestError::Format`] if the convention is not met or the
/// suffix is not hex.
pub fn identity_from_filename(name: &str) -> Result<ContentHash, ManifestError> {
    let segments: Vec<&str> = name.split('_').collect();
    match segments.as_slice() {
        [base, hash] if !base.is_empty() && !hash.is_empty() => ContentHash::from_hex(hash)
            .map_err(|e| ManifestError::format(format!("filename '{name}': {e}"))),
        [_] => Err(ManifestError::format(format!(
            "filename '{name}' has no '_<hash>' suffix"
        ))),
        _ => Err(ManifestError::format(format!(
            "filename '{name}' is not of the form <basename>_<hexhash>"
        ))),
    }
}

impl CachePatchCatalog {
    /// Decode a catalog from its binary form.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Format`] for a filename that breaks the
    /// `<basename>_<hexhash>` convention or a non-hex hash field, and
    /// [`ManifestError::Truncated`] if the stream ends early.
    pub fn parse(data: &[u8]) -> Result<Self, ManifestError> {
        let mut r = ByteReader::new(data);
        let count = r.read_u32("record count")?;
        let mut records = Vec::with_capacity(r.capacity_hint(count, MIN_RECORD_LEN));
        for _ in 0..count {
            records.push(read_record(&mut r)?);
        }
        Ok(Self { records })
    }

    /// Decode a catalog from any reader.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Io`] if reading fails, otherwise as
    /// [`CachePatchCatalog::parse`].
    pub fn from_reader(mut reader: impl Read) -> Result<Self, ManifestError> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::parse(&data)
    }

    /// Decode a catalog stored at `path`.
    ///
    /// # Errors
    ///
    /// As [`CachePatchCatalog::from_reader`].
    pub fn open(path: &Path) -> Result<Self, ManifestError> {
        Self::from_reader(std::fs::File::open(path)?)
    }

    /// Encode into the binary layout [`CachePatchCatalog::parse`] accepts.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.put_u32(self.records.len() as u32);
        for record in &self.records {
            let patch = record.patch();
            put_string(&mut out, &record.old_name);
            put_string(&mut out, &record.entry.local_name);
            put_string(&mut out, &record.old_content_hash.to_hex());
            put_string(&mut out, &patch.patch_blob_hash.to_hex());
            out.put_u32(patch.patch_size as u32);
        }
        out
    }

    /// Records in catalog order.
    pub fn records(&self) -> &[CachePatchRecord] {
        &self.records
    }

    /// Consume the catalog, keeping its records in order.
    pub fn into_records(self) -> Vec<CachePatchRecord> {
        self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the catalog holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First record whose old identity equals `old_hash`.
    pub fn find_by_old_hash(&self, old_hash: &[u8]) -> Option<&CachePatchRecord> {
        self.records
            .iter()
            .find(|r| r.patch().old_hash.as_bytes() == old_hash)
    }

    /// First record producing the asset named `new_name`.
    pub fn find_by_new_name(&self, new_name: &str) -> Option<&CachePatchRecord> {
        self.records.iter().find(|r| r.entry.local_name == new_name)
    }

    /// Sum of patch sizes, i.e. what applying every patch would download.
    pub fn total_patch_size(&self) -> u64 {
        self.records.iter().map(|r| r.patch().patch_size).sum()
    }
}

fn read_record(r: &mut ByteReader<'_>) -> Result<CachePatchRecord, ManifestError> {
    let old_name = r.read_string("old filename")?;
    let new_name = r.read_string("new filename")?;
    let old_hash_hex = r.read_string("old content hash")?;
    let patch_hash_hex = r.read_string("patch hash")?;
    let patch_size = u64::from(r.read_u32("patch size")?);

    let old_hash = identity_from_filename(&old_name)?;
    let new_hash = identity_from_filename(&new_name)?;
    let old_content_hash = ContentHash::from_hex(&old_hash_hex)?;
    let patch_blob_hash = ContentHash::from_hex(&patch_hash_hex)?;

    let patch = PatchRef {
        old_hash,
        new_hash: new_hash.clone(),
        patch_blob_hash,
        patch_size,
    };
    let entry = AssetEntry::new(
        new_name.clone(),
        new_name,
        new_hash,
        patch_size,
        AssetFamily::CachePatch,
    )
    .with_patch(patch.clone());

    Ok(CachePatchRecord {
        entry,
        patch,
        old_name,
        old_content_hash,
    })
}
