//! Audio package manifest and its patch descriptors.
//!
//! Records come from a JSON array. Patch descriptors arrive separately with
//! decimal-encoded identities and are matched onto records by name.

use serde::{Deserialize, Serialize};

use crate::error::ManifestError;
use crate::hash::{ContentHash, decode_hex, normalize_numeric_hash};
use crate::types::{AssetIndexSummary, PatchRef};

/// Voice-over language of an audio package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioLanguage {
    /// Language-independent sound banks.
    Common,
    /// Chinese voice-over.
    Chinese,
    /// Japanese voice-over.
    Japanese,
}

/// Content-wave tag of an audio package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum PckType {
    MustHave,
    All,
    External,
    Banks0,
    Banks1,
    Banks2,
    Banks3,
    Banks4,
    Banks5,
    Banks6,
    Banks7,
    Banks8,
    Banks9,
    Wave1_0,
    Wave1_1,
    Wave1_2,
    Wave1_3,
    Wave1_4,
    Wave1_5,
    Wave1_6,
    Wave2_0,
    Wave2_1,
    Wave2_2,
    Wave2_3,
    Wave2_4,
    Wave2_5,
    Wave2_6,
    Wave2_7,
    Wave2_8,
    Wave3_0,
    Wave3_1,
    Wave3_2,
    Wave3_3,
    Wave3_4,
    Wave3_5,
    Wave3_6,
    Wave3_7,
    Wave3_8,
    Event,
    Story,
    Dialogue,
    Music,
}

/// Patch descriptor for an audio package, identities already normalized to hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPatchInfo {
    /// Normalized identity of the old package.
    pub old_hash: String,
    /// Normalized identity of the new package.
    pub new_hash: String,
    /// Normalized identity of the patch blob.
    pub patch_hash: String,
    /// Patch blob size in bytes.
    pub patch_size: u64,
}

/// Patch descriptor as delivered by the structured-data collaborator.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAudioPatch {
    /// Name of the record the patch belongs to.
    pub name: String,
    /// Decimal-encoded old identity.
    pub old_hash: String,
    /// Decimal-encoded new identity.
    pub new_hash: String,
    /// Decimal-encoded patch blob identity.
    pub patch_hash: String,
    /// Decimal patch size.
    pub patch_size: String,
}

impl AudioPatchInfo {
    /// Normalize a raw descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Format`] if `patch_size` is not a `u64`.
    pub fn from_raw(raw: &RawAudioPatch) -> Result<Self, ManifestError> {
        let patch_size = raw.patch_size.trim().parse().map_err(|e| {
            ManifestError::format(format!("patch for '{}': bad size '{}': {e}", raw.name, raw.patch_size))
        })?;
        Ok(Self {
            old_hash: normalize_numeric_hash(&raw.old_hash),
            new_hash: normalize_numeric_hash(&raw.new_hash),
            patch_hash: normalize_numeric_hash(&raw.patch_hash),
            patch_size,
        })
    }

    /// Convert to the family-independent [`PatchRef`].
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Format`] if an identity fell back to its raw
    /// (non-numeric, non-hex) form.
    pub fn to_patch_ref(&self) -> Result<PatchRef, ManifestError> {
        Ok(PatchRef {
            old_hash: ContentHash::new(decode_hex(&self.old_hash)?),
            new_hash: ContentHash::new(decode_hex(&self.new_hash)?),
            patch_blob_hash: ContentHash::new(decode_hex(&self.patch_hash)?),
            patch_size: self.patch_size,
        })
    }

    /// `patch_hash + ".patch"`.
    pub fn patch_filename(&self) -> String {
        format!("{}.patch", self.patch_hash.to_ascii_lowercase())
    }
}

/// One audio package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioAsset {
    /// Package name, the key patches are matched on.
    pub name: String,
    /// Path relative to the audio root.
    pub path: String,
    /// MD5 of the package.
    pub hash: ContentHash,
    /// Package size in bytes.
    pub size: u64,
    /// Voice-over language.
    pub language: AudioLanguage,
    /// Content-wave tag.
    pub pck_type: PckType,
    /// Whether the package needs a sound-bank map.
    pub need_map: bool,
    #[serde(skip)]
    remote_url: String,
    #[serde(skip)]
    patch: Option<AudioPatchInfo>,
}

impl AudioAsset {
    /// Attach the patch descriptor. A record accepts exactly one.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::PatchAlreadyAttached`] on a second call.
    pub fn attach_patch(&mut self, info: AudioPatchInfo) -> Result<(), ManifestError> {
        if self.patch.is_some() {
            return Err(ManifestError::PatchAlreadyAttached(self.name.clone()));
        }
        self.patch = Some(info);
        Ok(())
    }

    /// The attached patch descriptor, if any.
    pub fn patch(&self) -> Option<&AudioPatchInfo> {
        self.patch.as_ref()
    }
}

impl AssetIndexSummary for AudioAsset {
    fn print_summary(&self) -> String {
        let mut s = format!(
            "[audio:{:?}/{:?}] {} ({} bytes, {})",
            self.language, self.pck_type, self.path, self.size, self.hash
        );
        if let Some(patch) = &self.patch {
            s.push_str(&format!(" via {} ({} bytes)", patch.patch_filename(), patch.patch_size));
        }
        s
    }

    fn asset_size(&self) -> u64 {
        self.patch.as_ref().map_or(self.size, |p| p.patch_size)
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

/// Ordered audio package list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioManifest {
    assets: Vec<AudioAsset>,
}

impl AudioManifest {
    /// Wrap already-decoded records.
    pub fn new(assets: Vec<AudioAsset>) -> Self {
        Self { assets }
    }

    /// Decode the JSON array form.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Json`] for malformed documents or unknown
    /// enumeration tags.
    pub fn from_json(json: &str) -> Result<Self, ManifestError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Records in manifest order.
    pub fn assets(&self) -> &[AudioAsset] {
        &self.assets
    }

    /// Record by name.
    pub fn get(&self, name: &str) -> Option<&AudioAsset> {
        self.assets.iter().find(|a| a.name == name)
    }

    /// Mutable record by name, for URL rewrites and patch attachment.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut AudioAsset> {
        self.assets.iter_mut().find(|a| a.name == name)
    }

    /// Match raw patch descriptors onto records by name.
    ///
    /// Returns the names of descriptors that matched no record. Attachment
    /// is all-or-nothing: every descriptor is checked before any record is
    /// touched.
    ///
    /// # Errors
    ///
    /// Fails if a descriptor has a bad size, or if its record already carries
    /// a patch or is named by two descriptors. No record changes on failure.
    pub fn attach_patches(&mut self, patches: &[RawAudioPatch]) -> Result<Vec<String>, ManifestError> {
        let mut unmatched = Vec::new();
        let mut planned: Vec<(usize, AudioPatchInfo)> = Vec::with_capacity(patches.len());
        for raw in patches {
            let info = AudioPatchInfo::from_raw(raw)?;
            let Some(index) = self.assets.iter().position(|a| a.name == raw.name) else {
                unmatched.push(raw.name.clone());
                continue;
            };
            let claimed = planned.iter().any(|(i, _)| *i == index);
            if claimed || self.assets[index].patch.is_some() {
                return Err(ManifestError::PatchAlreadyAttached(raw.name.clone()));
            }
            planned.push((index, info));
        }

        for (index, info) in planned {
            self.assets[index].attach_patch(info)?;
        }
        Ok(unmatched)
    }

    /// Decode a JSON array of raw patch descriptors and attach them.
    ///
    /// # Errors
    ///
    /// As [`AudioManifest::attach_patches`], plus [`ManifestError::Json`].
    pub fn attach_patches_json(&mut self, json: &str) -> Result<Vec<String>, ManifestError> {
        let patches: Vec<RawAudioPatch> = serde_json::from_str(json)?;
        self.attach_patches(&patches)
    }

    /// Sum of what each record would download (patch size when patched).
    pub fn total_download_size(&self) -> u64 {
        self.assets.iter().map(AssetIndexSummary::asset_size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"[
        {"name": "Banks0.pck", "path": "AudioAssets/Banks0.pck", "hash": "00112233445566778899aabbccddeeff",
         "size": 5000, "language": "Common", "pckType": "Banks0", "needMap": true},
        {"name": "Vo1.pck", "path": "AudioAssets/Japanese/Vo1.pck", "hash": "ffeeddccbbaa99887766554433221100",
         "size": 9000, "language": "Japanese", "pckType": "Wave2_4", "needMap": false}
    ]"#;

    fn raw(name: &str, size: &str) -> RawAudioPatch {
        RawAudioPatch {
            name: name.into(),
            old_hash: "1".into(),
            new_hash: 0x0102_0304_0506_0708_u64.to_string(),
            patch_hash: 255.to_string(),
            patch_size: size.into(),
        }
    }

    #[test]
    fn decodes_records_in_order() {
        let manifest = AudioManifest::from_json(MANIFEST).unwrap();
        assert_eq!(manifest.assets().len(), 2);
        let vo = &manifest.assets()[1];
        assert_eq!(vo.language, AudioLanguage::Japanese);
        assert_eq!(vo.pck_type, PckType::Wave2_4);
        assert!(!vo.need_map);
        assert!(vo.patch().is_none());
    }

    #[test]
    fn unknown_language_is_rejected() {
        let bad = MANIFEST.replace("\"Japanese\"", "\"Klingon\"");
        assert!(matches!(AudioManifest::from_json(&bad), Err(ManifestError::Json(_))));
    }

    #[test]
    fn patch_identities_are_normalized() {
        let info = AudioPatchInfo::from_raw(&raw("Vo1.pck", "42")).unwrap();
        assert_eq!(info.old_hash, "0000000000000001");
        assert_eq!(info.new_hash, "0102030405060708");
        assert_eq!(info.patch_filename(), "00000000000000ff.patch");

        let patch = info.to_patch_ref().unwrap();
        assert_eq!(patch.patch_filename(), info.patch_filename());
        assert_eq!(patch.patch_size, 42);
    }

    #[test]
    fn attach_is_once_only() {
        let mut manifest = AudioManifest::from_json(MANIFEST).unwrap();
        let unmatched = manifest
            .attach_patches(&[raw("Vo1.pck", "42"), raw("Missing.pck", "1")])
            .unwrap();
        assert_eq!(unmatched, ["Missing.pck"]);
        assert_eq!(manifest.get("Vo1.pck").unwrap().patch().unwrap().patch_size, 42);

        let err = manifest.attach_patches(&[raw("Vo1.pck", "7")]).unwrap_err();
        assert!(matches!(err, ManifestError::PatchAlreadyAttached(ref n) if n == "Vo1.pck"));
        assert_eq!(manifest.get("Vo1.pck").unwrap().patch().unwrap().patch_size, 42);
    }

    #[test]
    fn bad_descriptor_attaches_nothing() {
        let mut manifest = AudioManifest::from_json(MANIFEST).unwrap();
        let err = manifest
            .attach_patches(&[raw("Banks0.pck", "10"), raw("Vo1.pck", "oops")])
            .unwrap_err();
        assert!(matches!(err, ManifestError::Format(_)));
        assert!(manifest.assets().iter().all(|a| a.patch().is_none()));

        // corrected list goes through on retry
        let unmatched = manifest
            .attach_patches(&[raw("Banks0.pck", "10"), raw("Vo1.pck", "20")])
            .unwrap();
        assert!(unmatched.is_empty());
        assert_eq!(manifest.get("Banks0.pck").unwrap().patch().unwrap().patch_size, 10);
        assert_eq!(manifest.get("Vo1.pck").unwrap().patch().unwrap().patch_size, 20);
    }

    #[test]
    fn duplicate_descriptor_in_one_batch_attaches_nothing() {
        let mut manifest = AudioManifest::from_json(MANIFEST).unwrap();
        let err = manifest
            .attach_patches(&[raw("Vo1.pck", "1"), raw("Vo1.pck", "2")])
            .unwrap_err();
        assert!(matches!(err, ManifestError::PatchAlreadyAttached(ref n) if n == "Vo1.pck"));
        assert!(manifest.get("Vo1.pck").unwrap().patch().is_none());
    }

    #[test]
    fn non_numeric_identity_falls_back_but_fails_conversion() {
        let mut r = raw("Vo1.pck", "1");
        r.old_hash = "not-a-hash".into();
        let info = AudioPatchInfo::from_raw(&r).unwrap();
        assert_eq!(info.old_hash, "not-a-hash");
        assert!(info.to_patch_ref().is_err());
    }

    #[test]
    fn download_size_prefers_patch() {
        let mut manifest = AudioManifest::from_json(MANIFEST).unwrap();
        assert_eq!(manifest.total_download_size(), 14_000);
        manifest
            .attach_patches_json(r#"[{"name":"Vo1.pck","oldHash":"1","newHash":"2","patchHash":"3","patchSize":"100"}]"#)
            .unwrap();
        assert_eq!(manifest.total_download_size(), 5_100);
    }
}
