//! Two-phase remote metadata session: fetch, then decode, then dispose.
//!
//! A session owns its payload buffer and its decoded entries; nothing is
//! shared between sessions, so any number of them may run concurrently.

use std::sync::Arc;

use assetsync_schema::{AssetEntry, AssetIndexSummary, ManifestError};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::decode::{Decoded, IndexPointer, MetadataTags, decode};
use crate::family::{FamilyConfig, MetadataLocator};
use crate::io::download::{DownloadRequest, Transport, TransportError};
use crate::reporter::Reporter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotFetched,
    Fetched,
    Deserialized,
    Disposed,
}

/// Result of a fetch that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Fetched,
    /// The token fired; nothing was kept and the session can be retried.
    Cancelled,
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Cannot {operation} while session is {state:?}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },
}

pub struct RemoteMetadataSession {
    config: FamilyConfig,
    base_url: String,
    headers: Vec<(String, String)>,
    reporter: Option<Arc<dyn Reporter>>,
    state: SessionState,
    buffer: Option<Vec<u8>>,
    metadata_filename: Option<String>,
    tags: Option<MetadataTags>,
    pointer: Option<IndexPointer>,
    assets: Vec<AssetEntry>,
}

impl std::fmt::Debug for RemoteMetadataSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteMetadataSession")
            .field("family", &self.config.name)
            .field("base_url", &self.base_url)
            .field("state", &self.state)
            .field("buffer_len", &self.buffer.as_ref().map(Vec::len))
            .field("metadata_filename", &self.metadata_filename)
            .field("tags", &self.tags)
            .field("assets", &self.assets.len())
            .finish_non_exhaustive()
    }
}

impl RemoteMetadataSession {
    pub fn new(config: FamilyConfig, base_url: impl Into<String>) -> Self {
        Self {
            config,
            base_url: base_url.into(),
            headers: Vec::new(),
            reporter: None,
            state: SessionState::NotFetched,
            buffer: None,
            metadata_filename: None,
            tags: None,
            pointer: None,
            assets: Vec::new(),
        }
    }

    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn config(&self) -> &FamilyConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Filename of the fetched payload (the index-resolved name for indexed families).
    pub fn metadata_filename(&self) -> Option<&str> {
        self.metadata_filename.as_deref()
    }

    /// Revision/magic/type tags from the index, for indexed families.
    pub fn tags(&self) -> Option<MetadataTags> {
        self.tags
    }

    /// Size of the owned payload buffer, if one is held.
    pub fn buffered_len(&self) -> Option<usize> {
        self.buffer.as_ref().map(Vec::len)
    }

    /// Decoded entries; empty until [`RemoteMetadataSession::deserialize`] succeeds.
    pub fn assets(&self) -> &[AssetEntry] {
        &self.assets
    }

    /// Independent copies of the entries for a cross-family aggregator.
    pub fn summaries(&self) -> Vec<Box<dyn AssetIndexSummary>> {
        self.assets.iter().map(AssetIndexSummary::clone_boxed).collect()
    }

    /// `base_url + remote_path + '/' + filename`.
    pub fn remote_url(&self, filename: &str) -> String {
        format!("{}{}/{}", self.base_url, self.config.remote_path, filename)
    }

    /// Download the metadata payload into the session's buffer.
    ///
    /// Indexed families first fetch and decode their index through a nested
    /// session to learn the payload filename and tags. Cancellation is
    /// observed at every network step. The payload is downloaded into a
    /// scratch buffer and only swapped in once complete, so a failed or
    /// cancelled fetch leaves the session exactly as it was.
    pub async fn get_remote_metadata(
        &mut self,
        transport: &dyn Transport,
        cancel: &CancellationToken,
    ) -> Result<FetchOutcome, SyncError> {
        match self.state {
            SessionState::NotFetched | SessionState::Fetched => {}
            state => {
                return Err(SyncError::InvalidState {
                    operation: "fetch metadata",
                    state,
                });
            }
        }

        let (filename, tags) = match &self.config.locator {
            MetadataLocator::Direct { filename } => (filename.clone(), None),
            MetadataLocator::Indexed { index_filename } => {
                match self.resolve_index(index_filename, transport, cancel).await? {
                    Some(pointer) => (pointer.filename, Some(pointer.tags)),
                    None => return Ok(FetchOutcome::Cancelled),
                }
            }
        };

        match self.download_file(&filename, transport, cancel).await? {
            Some(buffer) => {
                self.commit_fetch(filename, buffer, tags);
                Ok(FetchOutcome::Fetched)
            }
            None => Ok(FetchOutcome::Cancelled),
        }
    }

    /// Fetch and decode the index through a nested session. `None` means
    /// the token fired.
    async fn resolve_index(
        &self,
        index_filename: &str,
        transport: &dyn Transport,
        cancel: &CancellationToken,
    ) -> Result<Option<IndexPointer>, SyncError> {
        let mut index = RemoteMetadataSession::new(
            self.config.index_session(index_filename),
            self.base_url.clone(),
        )
        .with_headers(self.headers.clone());
        index.reporter.clone_from(&self.reporter);

        let downloaded = index.download_file(index_filename, transport, cancel).await;
        let pointer = match downloaded {
            Ok(Some(buffer)) => {
                index.commit_fetch(index_filename.to_string(), buffer, None);
                let decoded = index.deserialize().map(|_| ());
                let pointer = index.pointer.take();
                index.dispose();
                decoded?;
                pointer
            }
            Ok(None) => {
                index.dispose();
                return Ok(None);
            }
            Err(e) => {
                index.dispose();
                return Err(e);
            }
        };

        if let Some(pointer) = &pointer {
            debug!(
                family = %self.config.name,
                filename = %pointer.filename,
                revision = pointer.tags.revision,
                "resolved metadata index"
            );
        }
        Ok(pointer)
    }

    /// Download one file into a fresh buffer without touching session state.
    async fn download_file(
        &self,
        filename: &str,
        transport: &dyn Transport,
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<u8>>, SyncError> {
        let url = self.remote_url(filename);
        debug!(family = %self.config.name, %url, "fetching metadata");

        let mut buffer = Vec::new();
        let request = DownloadRequest::new(&url, cancel)
            .with_headers(&self.headers)
            .with_reporter(self.reporter.as_deref());

        // Race the transport against the token so a stalled transfer is
        // abandoned even if the transport never checks it.
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(TransportError::Cancelled),
            res = transport.download(request, &mut buffer) => res,
        };

        match result {
            Ok(()) => {
                debug!(family = %self.config.name, bytes = buffer.len(), "metadata fetched");
                Ok(Some(buffer))
            }
            Err(TransportError::Cancelled) => {
                debug!(family = %self.config.name, %url, "fetch cancelled");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn commit_fetch(&mut self, filename: String, buffer: Vec<u8>, tags: Option<MetadataTags>) {
        self.buffer = Some(buffer);
        self.metadata_filename = Some(filename);
        self.tags = tags;
        self.pointer = None;
        self.assets.clear();
        self.state = SessionState::Fetched;
    }

    /// Decode the fetched payload. Only valid in [`SessionState::Fetched`].
    ///
    /// The buffer is consumed either way. On failure the session returns to
    /// [`SessionState::NotFetched`] with no entries, so a retry must re-fetch.
    pub fn deserialize(&mut self) -> Result<&[AssetEntry], SyncError> {
        if self.state != SessionState::Fetched {
            return Err(SyncError::InvalidState {
                operation: "deserialize",
                state: self.state,
            });
        }

        let buffer = self.buffer.take().unwrap_or_default();
        match decode(self.config.format, &buffer, self.config.family) {
            Ok(Decoded::Assets(mut assets)) => {
                for asset in &mut assets {
                    let url = self.remote_url(&asset.relative_path);
                    asset.set_remote_url(url);
                }
                info!(family = %self.config.name, assets = assets.len(), "metadata decoded");
                self.assets = assets;
                self.state = SessionState::Deserialized;
                Ok(&self.assets)
            }
            Ok(Decoded::Pointer(pointer)) => {
                self.tags = Some(pointer.tags);
                self.pointer = Some(pointer);
                self.state = SessionState::Deserialized;
                Ok(&self.assets)
            }
            Err(e) => {
                warn!(family = %self.config.name, error = %e, "metadata decode failed");
                self.reset_fetch();
                Err(e.into())
            }
        }
    }

    /// Release the buffer and entries. Idempotent; never fails.
    pub fn dispose(&mut self) {
        if self.state == SessionState::Disposed {
            return;
        }
        self.reset_fetch();
        self.assets = Vec::new();
        self.state = SessionState::Disposed;
    }

    fn reset_fetch(&mut self) {
        self.buffer = None;
        self.metadata_filename = None;
        self.tags = None;
        self.pointer = None;
        self.assets.clear();
        self.state = SessionState::NotFetched;
    }
}
