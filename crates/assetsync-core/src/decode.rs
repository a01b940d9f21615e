//! Payload decoders selected by [`PayloadFormat`].

use assetsync_schema::reader::{ByteReader, put_string};
use assetsync_schema::{
    AssetEntry, AssetFamily, BlockManifest, CachePatchCatalog, CachePatchRecord, ContentHash, HashAlgorithm,
    ManifestError, parse_text_listing,
};
use bytes::BufMut;

use crate::family::PayloadFormat;

/// Versioning tags carried by an index resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataTags {
    pub magic: u32,
    pub type_id: u32,
    pub revision: u32,
}

/// Decoded index resource: which payload to fetch, and its tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPointer {
    pub tags: MetadataTags,
    pub filename: String,
}

#[derive(Debug)]
pub(crate) enum Decoded {
    Assets(Vec<AssetEntry>),
    Pointer(IndexPointer),
}

// hash + size + path prefix
const MIN_FRAMED_LEN: usize = 16 + 8 + 4;
// name prefix + hash + size
const MIN_SCRIPTED_LEN: usize = 4 + 20 + 8;

pub(crate) fn decode(format: PayloadFormat, data: &[u8], family: AssetFamily) -> Result<Decoded, ManifestError> {
    match format {
        PayloadFormat::FramedBinary => decode_framed_binary(data, family).map(Decoded::Assets),
        PayloadFormat::Scripted => decode_scripted(data, family).map(Decoded::Assets),
        PayloadFormat::TextListed => parse_text_listing(data, family).map(Decoded::Assets),
        PayloadFormat::IndexPointer => decode_index_pointer(data).map(Decoded::Pointer),
        PayloadFormat::BlockCatalog => decode_block_catalog(data, family).map(Decoded::Assets),
        PayloadFormat::CachePatch => decode_cache_patch(data).map(Decoded::Assets),
    }
}

/// Decode a block catalog into one entry per block file.
///
/// Blocks are the download unit, so each entry is named and hashed after
/// the block; the assets packed inside stay reachable through
/// [`BlockManifest::blocks`].
pub fn decode_block_catalog(data: &[u8], family: AssetFamily) -> Result<Vec<AssetEntry>, ManifestError> {
    let manifest = BlockManifest::parse(data)?;
    Ok(manifest
        .blocks()
        .iter()
        .map(|block| AssetEntry::new(block.name.clone(), block.name.clone(), block.hash.clone(), block.size, family))
        .collect())
}

pub fn decode_cache_patch(data: &[u8]) -> Result<Vec<AssetEntry>, ManifestError> {
    Ok(CachePatchCatalog::parse(data)?
        .into_records()
        .into_iter()
        .map(CachePatchRecord::into_entry)
        .collect())
}

pub fn decode_framed_binary(data: &[u8], family: AssetFamily) -> Result<Vec<AssetEntry>, ManifestError> {
    let mut r = ByteReader::new(data);
    let count = r.read_u32("record count")?;
    let mut entries = Vec::with_capacity(r.capacity_hint(count, MIN_FRAMED_LEN));
    for _ in 0..count {
        let hash = r.read_array::<16>("record hash")?;
        let size = r.read_u64("record size")?;
        let path = r.read_string("record path")?;
        let local_name = path.rsplit('/').next().unwrap_or(&path).to_string();
        entries.push(AssetEntry::new(
            local_name,
            path,
            ContentHash::validated(hash.to_vec(), HashAlgorithm::Md5)?,
            size,
            family,
        ));
    }
    Ok(entries)
}

pub fn decode_scripted(data: &[u8], family: AssetFamily) -> Result<Vec<AssetEntry>, ManifestError> {
    let mut r = ByteReader::new(data);
    let count = r.read_u32("record count")?;
    let mut entries = Vec::with_capacity(r.capacity_hint(count, MIN_SCRIPTED_LEN));
    for _ in 0..count {
        let name = r.read_string("script name")?;
        let hash = r.read_array::<20>("script hash")?;
        let size = r.read_u64("script size")?;
        entries.push(AssetEntry::new(
            name.clone(),
            name,
            ContentHash::validated(hash.to_vec(), HashAlgorithm::Sha1)?,
            size,
            family,
        ));
    }
    Ok(entries)
}

pub fn decode_index_pointer(data: &[u8]) -> Result<IndexPointer, ManifestError> {
    let mut r = ByteReader::new(data);
    let tags = MetadataTags {
        magic: r.read_u32("index magic")?,
        type_id: r.read_u32("index type id")?,
        revision: r.read_u32("index revision")?,
    };
    let filename = r.read_string("metadata filename")?;
    if filename.is_empty() {
        return Err(ManifestError::format("index names an empty metadata filename"));
    }
    Ok(IndexPointer { tags, filename })
}

/// Encode entries in the [`PayloadFormat::FramedBinary`] layout.
///
/// Entries whose hash is not 16 bytes are written as-is and will fail to
/// decode; callers are expected to pass MD5 hashes.
pub fn encode_framed_binary(entries: &[AssetEntry]) -> Vec<u8> {
    let mut out = Vec::new();
    out.put_u32(entries.len() as u32);
    for entry in entries {
        out.put_slice(entry.content_hash.as_bytes());
        out.put_u64(entry.size);
        put_string(&mut out, &entry.relative_path);
    }
    out
}

/// Encode entries in the [`PayloadFormat::Scripted`] layout.
pub fn encode_scripted(entries: &[AssetEntry]) -> Vec<u8> {
    let mut out = Vec::new();
    out.put_u32(entries.len() as u32);
    for entry in entries {
        put_string(&mut out, &entry.local_name);
        out.put_slice(entry.content_hash.as_bytes());
        out.put_u64(entry.size);
    }
    out
}

/// Encode an index resource.
pub fn encode_index_pointer(pointer: &IndexPointer) -> Vec<u8> {
    let mut out = Vec::new();
    out.put_u32(pointer.tags.magic);
    out.put_u32(pointer.tags.type_id);
    out.put_u32(pointer.tags.revision);
    put_string(&mut out, &pointer.filename);
    out
}
