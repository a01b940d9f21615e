//! Error taxonomy shared by every manifest decoder.

use thiserror::Error;

/// Errors raised while decoding a manifest or attaching data to it.
///
/// Manifest construction is all-or-nothing: any of these aborts the whole
/// load and no partially populated value is returned.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The payload is structurally wrong (bad signature, version out of
    /// range, malformed filename convention, malformed text line).
    #[error("Format error: {0}")]
    Format(String),

    /// The stream ended before a declared length or count was satisfied.
    #[error("Truncated stream while reading {context}: needed {needed} bytes, {remaining} left")]
    Truncated {
        /// What was being read when the stream ran out.
        context: &'static str,
        /// Bytes the read required.
        needed: usize,
        /// Bytes still available.
        remaining: usize,
    },

    /// The structured-data collaborator rejected the document.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading the manifest from disk failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A patch descriptor was already attached to the named record.
    #[error("Patch already attached to '{0}'")]
    PatchAlreadyAttached(String),
}

impl ManifestError {
    /// Shorthand for [`ManifestError::Format`].
    pub fn format(msg: impl std::fmt::Display) -> Self {
        Self::Format(msg.to_string())
    }

    /// Whether this error means the payload was cut short.
    pub fn is_truncated(&self) -> bool {
        matches!(self, Self::Truncated { .. })
    }
}
