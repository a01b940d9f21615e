//! Reporter trait for dependency injection
//!
//! Lets the transport report download progress without being coupled to a
//! particular terminal or GUI front end.

pub trait Reporter: Send + Sync {
    /// Updates the progress of a download.
    fn downloading(&self, url: &str, current: u64, total: Option<u64>);

    /// Marks a download as complete.
    fn done(&self, url: &str, bytes: u64);

    /// Marks a download as failed with a specific reason.
    fn failed(&self, url: &str, reason: &str);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn downloading(&self, url: &str, current: u64, total: Option<u64>) {
        (**self).downloading(url, current, total);
    }
    fn done(&self, url: &str, bytes: u64) {
        (**self).done(url, bytes);
    }
    fn failed(&self, url: &str, reason: &str) {
        (**self).failed(url, reason);
    }
}

/// A no-op reporter for silent operations (e.g., testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn downloading(&self, _: &str, _: u64, _: Option<u64>) {}
    fn done(&self, _: &str, _: u64) {}
    fn failed(&self, _: &str, _: &str) {}
}

/// Reporter that forwards progress to `tracing` at debug level.
#[derive(Debug, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn downloading(&self, url: &str, current: u64, total: Option<u64>) {
        tracing::trace!(url, current, total, "downloading");
    }
    fn done(&self, url: &str, bytes: u64) {
        tracing::debug!(url, bytes, "download complete");
    }
    fn failed(&self, url: &str, reason: &str) {
        tracing::debug!(url, reason, "download failed");
    }
}
