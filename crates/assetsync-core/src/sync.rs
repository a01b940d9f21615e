//! Drive many independent sessions through fetch and decode.

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::io::download::Transport;
use crate::session::{FetchOutcome, RemoteMetadataSession, SyncError};

#[derive(Debug)]
pub enum SyncStatus {
    Synced { assets: usize, bytes: u64 },
    Cancelled,
    Failed(SyncError),
}

#[derive(Debug)]
pub struct FamilyReport {
    pub family: String,
    pub status: SyncStatus,
}

/// Fetch and decode every session, at most `concurrency` at a time.
///
/// Reports come back in the same order as `sessions`.
pub async fn sync_all(
    sessions: &mut [RemoteMetadataSession],
    transport: &dyn Transport,
    cancel: &CancellationToken,
    concurrency: usize,
) -> Vec<FamilyReport> {
    let mut reports: Vec<(usize, FamilyReport)> = stream::iter(sessions.iter_mut().enumerate())
        .map(|(index, session)| async move {
            let status = sync_one(session, transport, cancel).await;
            let family = session.config().name.clone();
            (index, FamilyReport { family, status })
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    reports.sort_by_key(|(index, _)| *index);
    let reports: Vec<FamilyReport> = reports.into_iter().map(|(_, r)| r).collect();

    let synced = reports
        .iter()
        .filter(|r| matches!(r.status, SyncStatus::Synced { .. }))
        .count();
    info!(synced, total = reports.len(), "metadata sync finished");
    reports
}

async fn sync_one(
    session: &mut RemoteMetadataSession,
    transport: &dyn Transport,
    cancel: &CancellationToken,
) -> SyncStatus {
    match session.get_remote_metadata(transport, cancel).await {
        Ok(FetchOutcome::Fetched) => {}
        Ok(FetchOutcome::Cancelled) => return SyncStatus::Cancelled,
        Err(e) => {
            warn!(family = %session.config().name, error = %e, "metadata fetch failed");
            return SyncStatus::Failed(e);
        }
    }

    match session.deserialize() {
        Ok(assets) => SyncStatus::Synced {
            assets: assets.len(),
            bytes: assets.iter().map(|a| a.size).sum(),
        },
        Err(e) => SyncStatus::Failed(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::{FamilyConfig, MetadataLocator, PayloadFormat};
    use crate::io::download::{DownloadRequest, TransportError};
    use assetsync_schema::AssetFamily;
    use async_trait::async_trait;

    struct EchoTransport;

    #[async_trait]
    impl Transport for EchoTransport {
        async fn download(&self, request: DownloadRequest<'_>, dest: &mut Vec<u8>) -> Result<(), TransportError> {
            if request.url.ends_with("bad.csv") {
                return Err(TransportError::Status { url: request.url.to_string(), status: 500 });
            }
            dest.extend_from_slice(b"a,00,4\nb,01,6\n");
            Ok(())
        }
    }

    fn session(name: &str, filename: &str) -> RemoteMetadataSession {
        let config = FamilyConfig::new(
            name,
            "/x",
            MetadataLocator::Direct { filename: filename.into() },
            PayloadFormat::TextListed,
            AssetFamily::TextListed,
        );
        RemoteMetadataSession::new(config, "https://cdn")
    }

    #[tokio::test]
    async fn reports_keep_session_order() {
        let mut sessions = vec![session("one", "a.csv"), session("two", "bad.csv"), session("three", "c.csv")];
        let reports = sync_all(&mut sessions, &EchoTransport, &CancellationToken::new(), 2).await;

        let names: Vec<_> = reports.iter().map(|r| r.family.as_str()).collect();
        assert_eq!(names, ["one", "two", "three"]);
        assert!(matches!(reports[0].status, SyncStatus::Synced { assets: 2, bytes: 10 }));
        assert!(matches!(reports[1].status, SyncStatus::Failed(SyncError::Transport(_))));
        assert_eq!(sessions[2].assets().len(), 2);
    }

    #[tokio::test]
    async fn cancelled_token_cancels_every_session() {
        let mut sessions = vec![session("one", "a.csv"), session("two", "b.csv")];
        let cancel = CancellationToken::new();
        cancel.cancel();
        let reports = sync_all(&mut sessions, &EchoTransport, &cancel, 4).await;
        assert!(reports.iter().all(|r| matches!(r.status, SyncStatus::Cancelled)));
        assert!(sessions.iter().all(|s| s.assets().is_empty()));
    }
}
