//! Versioned block-catalog manifest.
//!
//! Layout (big-endian):
//! ```text
//! [16B signature][u32 × 4 version][u32 blockCount]
//! blockCount × { [string name][16B hash][u64 size][u32 assetCount]
//!                assetCount × { [string name][16B hash][u64 size] } }
//! ```

use std::collections::HashMap;

use bytes::BufMut;

use crate::error::ManifestError;
use crate::hash::{ContentHash, HashAlgorithm};
use crate::reader::{ByteReader, put_string};

/// Length of the leading signature.
pub const SIGNATURE_LEN: usize = 16;

/// Highest value any version component may take.
pub const MAX_VERSION_COMPONENT: u32 = 64;

const BLOCK_HASH_LEN: usize = 16;
// name prefix + hash + size + asset count
const MIN_BLOCK_LEN: usize = 4 + BLOCK_HASH_LEN + 8 + 4;
// name prefix + hash + size
const MIN_ASSET_LEN: usize = 4 + BLOCK_HASH_LEN + 8;

/// An asset stored inside a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockAsset {
    /// Asset name.
    pub name: String,
    /// MD5 of the asset content.
    pub hash: ContentHash,
    /// Asset size in bytes.
    pub size: u64,
}

/// One block record with its contained assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockEntry {
    /// Block name.
    pub name: String,
    /// MD5 of the block file.
    pub hash: ContentHash,
    /// Block file size in bytes.
    pub size: u64,
    /// Assets packed into the block, in manifest order.
    pub assets: Vec<BlockAsset>,
}

/// Decoded block manifest. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockManifest {
    signature: [u8; SIGNATURE_LEN],
    version: [u32; 4],
    blocks: Vec<BlockEntry>,
    catalog: HashMap<String, usize>,
}

impl BlockManifest {
    /// Build a manifest from already-decoded parts, validating them the same
    /// way [`BlockManifest::parse`] does.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Format`] if the signature is not 16 bytes, a
    /// version component is out of range, or two blocks claim the same key.
    pub fn new(signature: &[u8], version: [u32; 4], blocks: Vec<BlockEntry>) -> Result<Self, ManifestError> {
        let signature: [u8; SIGNATURE_LEN] = signature.try_into().map_err(|_| {
            ManifestError::format(format!(
                "signature must be {SIGNATURE_LEN} bytes, got {}",
                signature.len()
            ))
        })?;
        check_version(&version)?;
        let catalog = build_catalog(&blocks)?;
        Ok(Self {
            signature,
            version,
            blocks,
            catalog,
        })
    }

    /// Decode a manifest from its binary form.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Format`] for a short signature, an out-of-range
    /// version component, bad UTF-8 or duplicate catalog keys, and
    /// [`ManifestError::Truncated`] if a declared count runs past the end.
    pub fn parse(data: &[u8]) -> Result<Self, ManifestError> {
        if data.len() < SIGNATURE_LEN {
            return Err(ManifestError::format(format!(
                "signature must be {SIGNATURE_LEN} bytes, stream holds {}",
                data.len()
            )));
        }

        let mut r = ByteReader::new(data);
        let signature = r.read_array::<SIGNATURE_LEN>("signature")?;

        let mut version = [0u32; 4];
        for component in &mut version {
            *component = r.read_u32("version")?;
        }
        check_version(&version)?;

        let block_count = r.read_u32("block count")?;
        let mut blocks = Vec::with_capacity(r.capacity_hint(block_count, MIN_BLOCK_LEN));
        for _ in 0..block_count {
            blocks.push(read_block(&mut r)?);
        }

        let catalog = build_catalog(&blocks)?;
        Ok(Self {
            signature,
            version,
            blocks,
            catalog,
        })
    }

    /// Encode into the binary layout [`BlockManifest::parse`] accepts.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.put_slice(&self.signature);
        for component in self.version {
            out.put_u32(component);
        }
        out.put_u32(self.blocks.len() as u32);
        for block in &self.blocks {
            put_string(&mut out, &block.name);
            out.put_slice(block.hash.as_bytes());
            out.put_u64(block.size);
            out.put_u32(block.assets.len() as u32);
            for asset in &block.assets {
                put_string(&mut out, &asset.name);
                out.put_slice(asset.hash.as_bytes());
                out.put_u64(asset.size);
            }
        }
        out
    }

    /// The 16-byte signature.
    pub fn signature(&self) -> &[u8; SIGNATURE_LEN] {
        &self.signature
    }

    /// The four version components.
    pub fn version(&self) -> [u32; 4] {
        self.version
    }

    /// Dotted rendering of the version, e.g. `2.3.0.1`.
    pub fn version_string(&self) -> String {
        let [a, b, c, d] = self.version;
        format!("{a}.{b}.{c}.{d}")
    }

    /// Blocks in manifest order.
    pub fn blocks(&self) -> &[BlockEntry] {
        &self.blocks
    }

    /// Index of the block whose name or lowercase hex hash is `key`.
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.catalog.get(key).copied()
    }

    /// Block whose name or lowercase hex hash is `key`.
    pub fn block(&self, key: &str) -> Option<&BlockEntry> {
        self.index_of(key).map(|i| &self.blocks[i])
    }

    /// Sum of all block sizes. Recomputed on each call.
    pub fn total_size(&self) -> u64 {
        self.blocks.iter().map(|b| b.size).sum()
    }
}

fn check_version(version: &[u32; 4]) -> Result<(), ManifestError> {
    if let Some(bad) = version.iter().find(|c| **c > MAX_VERSION_COMPONENT) {
        return Err(ManifestError::format(format!(
            "version component {bad} outside [0,{MAX_VERSION_COMPONENT}]"
        )));
    }
    Ok(())
}

fn read_hash(r: &mut ByteReader<'_>, context: &'static str) -> Result<ContentHash, ManifestError> {
    let bytes = r.read_array::<BLOCK_HASH_LEN>(context)?;
    ContentHash::validated(bytes.to_vec(), HashAlgorithm::Md5)
}

fn read_block(r: &mut ByteReader<'_>) -> Result<BlockEntry, ManifestError> {
    let name = r.read_string("block name")?;
    let hash = read_hash(r, "block hash")?;
    let size = r.read_u64("block size")?;
    let asset_count = r.read_u32("asset count")?;

    let mut assets = Vec::with_capacity(r.capacity_hint(asset_count, MIN_ASSET_LEN));
    for _ in 0..asset_count {
        assets.push(BlockAsset {
            name: r.read_string("asset name")?,
            hash: read_hash(r, "asset hash")?,
            size: r.read_u64("asset size")?,
        });
    }

    Ok(BlockEntry {
        name,
        hash,
        size,
        assets,
    })
}

fn build_catalog(blocks: &[BlockEntry]) -> Result<HashMap<String, usize>, ManifestError> {
    let mut catalog = HashMap::with_capacity(blocks.len() * 2);
    for (index, block) in blocks.iter().enumerate() {
        for key in [block.name.clone(), block.hash.to_hex()] {
            match catalog.insert(key.clone(), index) {
                Some(previous) if previous != index => {
                    return Err(ManifestError::format(format!(
                        "duplicate block key '{key}' (blocks {previous} and {index})"
                    )));
                }
                _ => {}
            }
        }
    }
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn md5(seed: u8) -> ContentHash {
        ContentHash::new(vec![seed; 16])
    }

    fn sample() -> BlockManifest {
        let blocks = vec![
            BlockEntry {
                name: "00_base.blk".into(),
                hash: md5(0xA1),
                size: 1000,
                assets: vec![
                    BlockAsset { name: "ui/atlas".into(), hash: md5(1), size: 400 },
                    BlockAsset { name: "ui/font".into(), hash: md5(2), size: 600 },
                ],
            },
            BlockEntry {
                name: "01_extra.blk".into(),
                hash: md5(0xB2),
                size: 24,
                assets: vec![],
            },
        ];
        BlockManifest::new(b"XMF-SIGNATURE-01", [2, 3, 0, 64], blocks).unwrap()
    }

    #[test]
    fn encode_then_parse_preserves_header_and_order() {
        let manifest = sample();
        let decoded = BlockManifest::parse(&manifest.encode()).unwrap();

        assert_eq!(decoded.signature(), b"XMF-SIGNATURE-01");
        assert_eq!(decoded.version(), [2, 3, 0, 64]);
        let names: Vec<_> = decoded.blocks().iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["00_base.blk", "01_extra.blk"]);
        assert_eq!(decoded, manifest);
    }

    #[test]
    fn catalog_resolves_name_and_hash() {
        let manifest = sample();
        assert_eq!(manifest.index_of("01_extra.blk"), Some(1));
        assert_eq!(manifest.index_of(&md5(0xA1).to_hex()), Some(0));
        assert_eq!(manifest.block("00_base.blk").unwrap().assets.len(), 2);
        assert!(manifest.index_of("missing").is_none());
    }

    #[test]
    fn total_size_sums_blocks() {
        assert_eq!(sample().total_size(), 1024);
    }

    #[test]
    fn version_out_of_range_is_format_error() {
        let mut bytes = sample().encode();
        // third version component lives at 16 + 2*4
        bytes[24..28].copy_from_slice(&65u32.to_be_bytes());
        assert!(matches!(BlockManifest::parse(&bytes), Err(ManifestError::Format(_))));

        assert!(BlockManifest::new(&[0; 16], [0, 0, 0, 64], vec![]).is_ok());
        assert!(BlockManifest::new(&[0; 16], [0, 65, 0, 0], vec![]).is_err());
    }

    #[test]
    fn short_signature_is_format_error() {
        assert!(matches!(BlockManifest::parse(&[0; 10]), Err(ManifestError::Format(_))));
        assert!(matches!(
            BlockManifest::new(&[0; 15], [0; 4], vec![]),
            Err(ManifestError::Format(_))
        ));
    }

    #[test]
    fn truncated_asset_list_fails_whole_load() {
        let bytes = sample().encode();
        for cut in [bytes.len() - 1, bytes.len() - 30, 17 + 16] {
            let err = BlockManifest::parse(&bytes[..cut]).unwrap_err();
            assert!(err.is_truncated(), "cut at {cut}: {err}");
        }
    }

    #[test]
    fn duplicate_block_name_is_rejected() {
        let block = BlockEntry { name: "dup".into(), hash: md5(1), size: 1, assets: vec![] };
        let other = BlockEntry { hash: md5(2), ..block.clone() };
        let err = BlockManifest::new(&[0; 16], [0; 4], vec![block, other]).unwrap_err();
        assert!(err.to_string().contains("duplicate block key"));
    }

    #[test]
    fn version_string_is_dotted() {
        assert_eq!(sample().version_string(), "2.3.0.64");
    }
}
