//! `name,hexHash,size` text listings.
//!
//! Fields may not contain commas; a line with any other field count is
//! rejected instead of being split permissively.

use crate::error::ManifestError;
use crate::hash::ContentHash;
use crate::types::{AssetEntry, AssetFamily};

/// Decode a UTF-8 listing into entries, one per non-blank line.
///
/// `\n` and `\r\n` line endings are both accepted.
///
/// # Errors
///
/// Returns [`ManifestError::Format`] naming the 1-based line number for
/// invalid UTF-8, a wrong field count, a non-hex hash or a non-integer size.
pub fn parse_text_listing(data: &[u8], family: AssetFamily) -> Result<Vec<AssetEntry>, ManifestError> {
    let text = std::str::from_utf8(data)
        .map_err(|e| ManifestError::format(format!("listing is not valid UTF-8: {e}")))?;

    let mut entries = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        entries.push(parse_line(line, index + 1, family)?);
    }
    Ok(entries)
}

fn parse_line(line: &str, line_no: usize, family: AssetFamily) -> Result<AssetEntry, ManifestError> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let [name, hash, size] = fields.as_slice() else {
        return Err(ManifestError::format(format!(
            "line {line_no}: expected 3 fields (name,hash,size), got {}",
            fields.len()
        )));
    };

    if name.is_empty() {
        return Err(ManifestError::format(format!("line {line_no}: empty name")));
    }
    let content_hash = ContentHash::from_hex(hash)
        .map_err(|e| ManifestError::format(format!("line {line_no}: {e}")))?;
    let size: u64 = size
        .parse()
        .map_err(|e| ManifestError::format(format!("line {line_no}: bad size '{size}': {e}")))?;

    Ok(AssetEntry::new(*name, *name, content_hash, size, family))
}
