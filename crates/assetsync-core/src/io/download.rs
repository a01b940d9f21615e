//! Transport collaborator: fills a buffer from a URL or fails.
//!
//! The core only sees the [`Transport`] trait; [`HttpTransport`] is the
//! reqwest-backed implementation used outside of tests.

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::Reporter;

#[derive(Error, Debug)]
pub enum TransportError {
    #[cfg(feature = "network")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("download cancelled")]
    Cancelled,
}

/// Request for a download operation
pub struct DownloadRequest<'a> {
    pub url: &'a str,
    pub headers: &'a [(String, String)],
    pub reporter: Option<&'a dyn Reporter>,
    pub cancel: &'a CancellationToken,
}

impl<'a> DownloadRequest<'a> {
    pub fn new(url: &'a str, cancel: &'a CancellationToken) -> Self {
        Self {
            url,
            headers: &[],
            reporter: None,
            cancel,
        }
    }

    pub fn with_headers(mut self, headers: &'a [(String, String)]) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_reporter(mut self, reporter: Option<&'a dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }
}

impl std::fmt::Debug for DownloadRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadRequest")
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Append the full body at `request.url` to `dest`.
    ///
    /// Either the whole body is appended and `Ok(())` returned, or an error
    /// is returned; callers must discard `dest` on error. Cancellation is
    /// reported as [`TransportError::Cancelled`].
    async fn download(&self, request: DownloadRequest<'_>, dest: &mut Vec<u8>) -> Result<(), TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn download(&self, request: DownloadRequest<'_>, dest: &mut Vec<u8>) -> Result<(), TransportError> {
        (**self).download(request, dest).await
    }
}

/// Streams HTTP bodies with reqwest.
#[cfg(feature = "network")]
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    user_agent: String,
}

#[cfg(feature = "network")]
impl HttpTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            user_agent: crate::USER_AGENT.to_string(),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

#[cfg(feature = "network")]
#[async_trait]
impl Transport for HttpTransport {
    async fn download(&self, request: DownloadRequest<'_>, dest: &mut Vec<u8>) -> Result<(), TransportError> {
        use futures::StreamExt;

        let url = request.url;
        let cancel = request.cancel;

        let mut builder = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, &self.user_agent);
        for (name, value) in request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(TransportError::Cancelled),
            resp = builder.send() => resp?,
        };

        let status = response.status();
        if !status.is_success() {
            if let Some(rep) = request.reporter {
                rep.failed(url, status.as_str());
            }
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let total_size = response.content_length();
        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;

        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(TransportError::Cancelled),
                next = stream.next() => next,
            };
            let Some(chunk) = next else { break };
            let chunk = chunk?;
            dest.extend_from_slice(&chunk);
            downloaded += chunk.len() as u64;
            if let Some(rep) = request.reporter {
                rep.downloading(url, downloaded, total_size);
            }
        }

        if let Some(expected) = total_size {
            if downloaded != expected {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("{url}: expected {expected} bytes, got {downloaded}"),
                )
                .into());
            }
        }

        if let Some(rep) = request.reporter {
            rep.done(url, downloaded);
        }
        Ok(())
    }
}

#[cfg(all(test, feature = "network"))]
mod tests {
    use super::*;
    use mockito::Server;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingReporter {
        events: Mutex<Vec<String>>,
    }

    impl Reporter for RecordingReporter {
        fn downloading(&self, _: &str, current: u64, _: Option<u64>) {
            self.events.lock().unwrap().push(format!("progress {current}"));
        }
        fn done(&self, _: &str, bytes: u64) {
            self.events.lock().unwrap().push(format!("done {bytes}"));
        }
        fn failed(&self, _: &str, reason: &str) {
            self.events.lock().unwrap().push(format!("failed {reason}"));
        }
    }

    #[tokio::test]
    async fn downloads_full_body_with_headers() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/client/Block/M_BlockV.bytes")
            .match_header("x-rpc-channel", "os")
            .with_status(200)
            .with_body(b"payload-bytes")
            .create_async()
            .await;

        let transport = HttpTransport::new(reqwest::Client::new());
        let url = format!("{}/client/Block/M_BlockV.bytes", server.url());
        let cancel = CancellationToken::new();
        let headers = vec![("x-rpc-channel".to_string(), "os".to_string())];
        let reporter = RecordingReporter::default();
        let mut dest = Vec::new();

        transport
            .download(
                DownloadRequest::new(&url, &cancel)
                    .with_headers(&headers)
                    .with_reporter(Some(&reporter)),
                &mut dest,
            )
            .await
            .unwrap();

        assert_eq!(dest, b"payload-bytes");
        let events = reporter.events.lock().unwrap();
        assert_eq!(events.last().unwrap(), "done 13");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let transport = HttpTransport::new(reqwest::Client::new());
        let url = format!("{}/missing", server.url());
        let cancel = CancellationToken::new();
        let mut dest = Vec::new();

        let err = transport
            .download(DownloadRequest::new(&url, &cancel), &mut dest)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits() {
        let transport = HttpTransport::new(reqwest::Client::new());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut dest = Vec::new();

        let err = transport
            .download(DownloadRequest::new("http://127.0.0.1:9/never", &cancel), &mut dest)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Cancelled));
        assert!(dest.is_empty());
    }
}
