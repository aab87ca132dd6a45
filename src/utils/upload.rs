use std::sync::Arc;

use serde::Serialize;
use tokio::io::AsyncRead;
use tracing::{debug, info, warn};

use crate::error::UploadError;
use crate::utils::buffer::{skip, Chunk, ReplayBuffer};
use crate::utils::config::UploadConfig;
use crate::utils::constants::STATUS_RESUME_INCOMPLETE;
use crate::utils::outcome::{classify, Accepted, Metadata};
use crate::utils::pacer::{Backoff, DefaultRetryPolicy, Pacer, RetryPolicy};
use crate::utils::request::chunk_request;
use crate::utils::session::{NewUpload, UploadSession};
use crate::utils::status::Probe;
use crate::utils::transport::{HttpRequest, HttpResponse, Transport};

/// Drives resumable uploads for one remote.
pub struct Uploader<P = Backoff> {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) pacer: Arc<P>,
    pub(crate) policy: Arc<dyn RetryPolicy>,
    pub(crate) config: UploadConfig,
}

impl<P> Clone for Uploader<P> {
    fn clone(&self) -> Self {
        Uploader {
            transport: Arc::clone(&self.transport),
            pacer: Arc::clone(&self.pacer),
            policy: Arc::clone(&self.policy),
            config: self.config.clone(),
        }
    }
}

impl<P: Pacer> Uploader<P> {
    pub fn new(transport: Arc<dyn Transport>, pacer: Arc<P>, config: UploadConfig) -> Self {
        Uploader {
            transport,
            pacer,
            policy: Arc::new(DefaultRetryPolicy),
            config,
        }
    }

    pub fn with_retry_policy(mut self, policy: Arc<dyn RetryPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Same transport, pacer and policy with another remote's settings.
    pub fn with_config(&self, config: UploadConfig) -> Self {
        Uploader {
            config,
            ..self.clone()
        }
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Negotiate a session and upload `source` into it.
    pub async fn upload_object<M, R>(
        &self,
        new: &NewUpload<'_, M>,
        source: &mut R,
    ) -> Result<Metadata, UploadError>
    where
        M: Serialize + Sync + ?Sized,
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        let mut session = self.initiate(new).await?;
        self.upload(&mut session, source).await
    }

    /// Upload the chunks from `source`, which must be positioned at
    /// `session.committed()`. Each chunk is retried under the pacer.
    pub async fn upload<R>(
        &self,
        session: &mut UploadSession,
        source: &mut R,
    ) -> Result<Metadata, UploadError>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        // Re-read on every upload so per-remote overrides apply.
        let chunk_size = self.config.chunk_size;
        if chunk_size == 0 {
            return Err(UploadError::InvalidConfig(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        let capacity = usize::try_from(chunk_size.min(session.remaining())).map_err(|_| {
            UploadError::InvalidConfig(format!("chunk_size {chunk_size} does not fit in memory"))
        })?;
        let mut buffer = ReplayBuffer::with_capacity(capacity);
        let total = session.total_size;
        let mut start = session.committed;
        let mut last_status = None;

        // A zero-byte payload still sends one (empty) request to finalise.
        loop {
            let req_size = chunk_size.min(total - start);
            let chunk = buffer.next_chunk(source, start, req_size).await?;
            debug!(remote = %session.remote, start, len = req_size, "Sending chunk");
            match self.transfer_chunk(session, &chunk).await {
                Ok(Accepted::Incomplete(next)) => {
                    last_status = Some(STATUS_RESUME_INCOMPLETE);
                    start = next;
                    session.advance(next);
                }
                Ok(Accepted::Completed(metadata)) => {
                    session.advance(start + req_size);
                    session.complete(metadata);
                    break;
                }
                Err(err) => return Err(self.escalate(err)),
            }
            if start >= total {
                break;
            }
        }

        match session.result() {
            Some(metadata) => {
                info!(remote = %session.remote, size = total, "Upload complete");
                Ok(metadata.clone())
            }
            None => Err(UploadError::IncompleteUpload { last_status }),
        }
    }

    /// Continue a session started earlier, possibly by another process.
    ///
    /// The server's committed offset decides where sending resumes; bytes it
    /// already holds are read from `source` and discarded.
    pub async fn resume<R>(
        &self,
        session: &mut UploadSession,
        source: &mut R,
    ) -> Result<Metadata, UploadError>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        let offset = match self.probe(session).await? {
            Probe::Finished(Some(metadata)) => {
                session.advance(session.total_size);
                session.complete(metadata.clone());
                return Ok(metadata);
            }
            // Nothing to resend; the loop sends the finalising empty request.
            Probe::Finished(None) => session.total_size,
            Probe::Committed(offset) => offset,
        };
        if offset > session.total_size {
            return Err(UploadError::InvalidRange(format!(
                "server holds {offset} of {} bytes",
                session.total_size
            )));
        }
        if offset < session.committed {
            warn!(remote = %session.remote, offset, committed = session.committed, "Server lost committed bytes");
            return Err(UploadError::IncompleteUpload {
                last_status: Some(STATUS_RESUME_INCOMPLETE),
            });
        }
        info!(remote = %session.remote, offset, "Resuming upload");
        skip(source, offset - session.committed).await?;
        session.advance(offset);
        self.upload(session, source).await
    }

    /// Send one chunk under the pacer, replaying it on every attempt.
    async fn transfer_chunk(
        &self,
        session: &UploadSession,
        chunk: &Chunk,
    ) -> Result<Accepted, UploadError> {
        let transport = &*self.transport;
        let uri = &session.uri;
        let media_type = session.content_type.as_str();
        let total = session.total_size;
        self.pacer
            .call(&*self.policy, move || {
                let payload = chunk.replay();
                async move {
                    let request = chunk_request(uri, media_type, chunk.start, total, payload)?;
                    let resp = transport.execute(request).await?;
                    classify(&resp, chunk.start + chunk.len()).into_result()
                }
            })
            .await
    }

    /// Single round trip under the pacer; `accept` turns a response into the
    /// call's result, so unwanted statuses can be retried.
    pub(crate) async fn call<F>(
        &self,
        request: HttpRequest,
        accept: F,
    ) -> Result<HttpResponse, UploadError>
    where
        F: Fn(HttpResponse) -> Result<HttpResponse, UploadError> + Send + Sync,
    {
        let transport = &*self.transport;
        let request = &request;
        let accept = &accept;
        self.pacer
            .call(&*self.policy, move || async move {
                accept(transport.execute(request.clone()).await?)
            })
            .await
    }

    /// A retryable error that outlived the pacer's budget means the session
    /// cannot be trusted any more: restart the whole upload.
    fn escalate(&self, err: UploadError) -> UploadError {
        if self.policy.should_retry(&err) {
            warn!(error = %err, "Retries exhausted, upload must be restarted");
            UploadError::IncompleteUpload {
                last_status: err.status(),
            }
        } else {
            err
        }
    }
}
