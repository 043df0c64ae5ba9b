//! Document handle management: upload, sign, release.
//!
//! A [`DocumentHandle`] is created once per request and consumed by
//! [`DocumentHandles::release`], so the type system rules out a second
//! release. The orchestrator calls `release` after the whole strategy chain,
//! whichever tier concluded it.
//!
//! From the moment the upload returns an id, the stored file is owned by a
//! `ReleaseGuard`. If the guard is dropped without an explicit release
//! (the caller dropped the `analyze` future, or a panic unwound through it)
//! the delete is spawned onto the current runtime instead.

use crate::error::AnalysisError;
use crate::observer::{PipelineObserver, SharedObserver};
use crate::request::AnalysisRequest;
use crate::upstream::UpstreamApi;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A stored document and the signed URL the agent reads it from.
pub struct DocumentHandle {
    pub remote_id: String,
    pub signed_url: String,
    guard: ReleaseGuard,
}

impl fmt::Debug for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentHandle")
            .field("remote_id", &self.remote_id)
            .field("signed_url", &self.signed_url)
            .finish()
    }
}

/// Deletes a stored file exactly once, in the background if never released.
struct ReleaseGuard {
    upstream: Arc<dyn UpstreamApi>,
    observer: SharedObserver,
    remote_id: String,
    armed: bool,
}

impl ReleaseGuard {
    fn new(upstream: Arc<dyn UpstreamApi>, observer: SharedObserver, remote_id: String) -> Self {
        Self {
            upstream,
            observer,
            remote_id,
            armed: true,
        }
    }

    /// Delete the file and disarm.
    ///
    /// The guard stays armed while the delete is in flight, so cancelling
    /// this future still leaves a background delete behind.
    async fn release(mut self) {
        delete_quietly(
            self.upstream.as_ref(),
            self.observer.as_ref(),
            &self.remote_id,
        )
        .await;
        self.armed = false;
    }
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let remote_id = std::mem::take(&mut self.remote_id);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                warn!("Analysis abandoned; releasing document {} in background", remote_id);
                let upstream = Arc::clone(&self.upstream);
                let observer = Arc::clone(&self.observer);
                runtime.spawn(async move {
                    delete_quietly(upstream.as_ref(), observer.as_ref(), &remote_id).await;
                });
            }
            Err(_) => {
                warn!("No runtime to release document {}; it may be orphaned", remote_id);
                self.observer
                    .on_release_failed(&remote_id, "no async runtime available for cleanup");
            }
        }
    }
}

/// Acquires and releases [`DocumentHandle`]s against one upstream.
pub struct DocumentHandles {
    upstream: Arc<dyn UpstreamApi>,
    observer: SharedObserver,
}

impl DocumentHandles {
    pub fn new(upstream: Arc<dyn UpstreamApi>, observer: SharedObserver) -> Self {
        Self { upstream, observer }
    }

    /// Upload the request's document and obtain a signed URL for it.
    ///
    /// If signing fails after a successful upload, the stored file is
    /// released before the error is returned.
    pub async fn acquire(&self, request: &AnalysisRequest) -> Result<DocumentHandle, AnalysisError> {
        let remote_id = self
            .upstream
            .upload(&request.file_name, &request.document)
            .await?;
        debug!("Uploaded '{}' as {}", request.file_name, remote_id);
        let guard = ReleaseGuard::new(
            Arc::clone(&self.upstream),
            Arc::clone(&self.observer),
            remote_id.clone(),
        );

        match self.upstream.signed_url(&remote_id).await {
            Ok(signed_url) => {
                info!(
                    "Document {} ready ({} bytes)",
                    remote_id,
                    request.document.len()
                );
                self.observer
                    .on_uploaded(&remote_id, request.document.len() as u64);
                Ok(DocumentHandle {
                    remote_id,
                    signed_url,
                    guard,
                })
            }
            Err(e) => {
                guard.release().await;
                Err(e)
            }
        }
    }

    /// Delete the stored document. Never fails observably.
    ///
    /// A failed delete is logged and reported to the observer; the caller's
    /// result is unaffected.
    pub async fn release(&self, handle: DocumentHandle) {
        handle.guard.release().await;
    }
}

async fn delete_quietly(
    upstream: &dyn UpstreamApi,
    observer: &dyn PipelineObserver,
    remote_id: &str,
) {
    match upstream.delete(remote_id).await {
        Ok(()) => debug!("Released document {}", remote_id),
        Err(e) => {
            warn!("Failed to release document {}: {}", remote_id, e);
            observer.on_release_failed(remote_id, &e.to_string());
        }
    }
}
