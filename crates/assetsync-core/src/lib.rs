#[cfg(feature = "parsing")]
pub mod config;
pub mod decode;
pub mod family;
pub mod io;
pub mod session;
pub mod sync;

pub mod reporter;

pub use decode::{IndexPointer, MetadataTags};
pub use family::{FamilyConfig, MetadataLocator, PayloadFormat};
pub use io::download::{DownloadRequest, Transport, TransportError};
#[cfg(feature = "network")]
pub use io::download::HttpTransport;
pub use reporter::{NullReporter, Reporter, TracingReporter};
pub use session::{FetchOutcome, RemoteMetadataSession, SessionState, SyncError};
pub use sync::{FamilyReport, SyncStatus, sync_all};

/// User Agent string for metadata requests
pub const USER_AGENT: &str = concat!("assetsync-core/", env!("CARGO_PKG_VERSION"));
