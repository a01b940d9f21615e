//! Per-family configuration table.
//!
//! Asset families share one fetch/decode/dispose skeleton and differ only in
//! the data below: where the payload lives, how its filename is found, which
//! decoder reads it and which tag the produced entries carry.

use assetsync_schema::AssetFamily;
use serde::{Deserialize, Serialize};

/// How a session finds the payload filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum MetadataLocator {
    /// The payload has a fixed filename.
    Direct { filename: String },
    /// A small index resource names the payload and carries its tags.
    Indexed { index_filename: String },
}

/// Decoder applied to a fetched payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PayloadFormat {
    /// `[u32 count]{[16B md5][u64 size][string path]}`.
    FramedBinary,
    /// `[u32 count]{[string name][20B sha1][u64 size]}`.
    Scripted,
    /// `name,hexHash,size` lines.
    TextListed,
    /// `[u32 magic][u32 typeId][u32 revision][string filename]`.
    IndexPointer,
    /// Signed, versioned block catalog; one entry per block file.
    BlockCatalog,
    /// Cache patch list; one patched entry per record.
    CachePatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyConfig {
    /// Short name used on the command line and in logs.
    pub name: String,
    /// Path segment appended to the base URL, e.g. `/client/Windows/Block`.
    pub remote_path: String,
    pub locator: MetadataLocator,
    pub format: PayloadFormat,
    /// Tag attached to every produced entry.
    pub family: AssetFamily,
}

impl FamilyConfig {
    pub fn new(
        name: impl Into<String>,
        remote_path: impl Into<String>,
        locator: MetadataLocator,
        format: PayloadFormat,
        family: AssetFamily,
    ) -> Self {
        Self {
            name: name.into(),
            remote_path: remote_path.into(),
            locator,
            format,
            family,
        }
    }

    /// Built-in table of remote metadata families.
    pub fn builtin() -> Vec<Self> {
        vec![
            Self::new(
                "block",
                "/client/Windows/Block",
                MetadataLocator::Indexed {
                    index_filename: "M_BlockV.bytes".into(),
                },
                PayloadFormat::BlockCatalog,
                AssetFamily::Block,
            ),
            Self::new(
                "script",
                "/client/Windows/Script",
                MetadataLocator::Indexed {
                    index_filename: "M_ScriptV.bytes".into(),
                },
                PayloadFormat::Scripted,
                AssetFamily::Scripted,
            ),
            Self::new(
                "design",
                "/client/Windows/Design",
                MetadataLocator::Direct {
                    filename: "DesignV.bytes".into(),
                },
                PayloadFormat::FramedBinary,
                AssetFamily::Block,
            ),
            Self::new(
                "hotfix",
                "/client/Windows/Hotfix",
                MetadataLocator::Direct {
                    filename: "HotfixList.csv".into(),
                },
                PayloadFormat::TextListed,
                AssetFamily::TextListed,
            ),
            Self::new(
                "cache-patch",
                "/client/Windows/CachePatch",
                MetadataLocator::Direct {
                    filename: "CachePatch.bytes".into(),
                },
                PayloadFormat::CachePatch,
                AssetFamily::CachePatch,
            ),
        ]
    }

    /// Configuration of the nested session that fetches this family's index.
    pub(crate) fn index_session(&self, index_filename: &str) -> Self {
        Self {
            name: format!("{}-index", self.name),
            remote_path: self.remote_path.clone(),
            locator: MetadataLocator::Direct {
                filename: index_filename.to_string(),
            },
            format: PayloadFormat::IndexPointer,
            family: self.family,
        }
    }
}
