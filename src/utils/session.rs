use bytes::Bytes;
use reqwest::header::LOCATION;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::error::UploadError;
use crate::utils::operations::resolve_session_uri;
use crate::utils::outcome::{status_error, Metadata};
use crate::utils::pacer::Pacer;
use crate::utils::request::negotiation_request;
use crate::utils::upload::Uploader;

/// What to upload and where.
#[derive(Debug)]
pub struct NewUpload<'a, M: ?Sized> {
    /// Name used in logs only.
    pub remote: &'a str,
    pub size: u64,
    pub content_type: &'a str,
    /// Existing object to overwrite; `None` or empty creates a new one.
    pub file_id: Option<&'a str>,
    pub metadata: &'a M,
}

/// Handle for one negotiated upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadSession {
    pub remote: String,
    pub uri: Url,
    pub total_size: u64,
    pub content_type: String,
    pub(crate) committed: u64,
    result: Option<Metadata>,
}

impl UploadSession {
    /// Handle for a session URI obtained earlier, e.g. persisted by a
    /// previous process. Pair with [`Uploader::resume`].
    pub fn attach(
        remote: impl Into<String>,
        uri: Url,
        total_size: u64,
        content_type: impl Into<String>,
    ) -> Self {
        UploadSession {
            remote: remote.into(),
            uri,
            total_size,
            content_type: content_type.into(),
            committed: 0,
            result: None,
        }
    }

    /// Bytes acknowledged by the server so far.
    pub fn committed(&self) -> u64 {
        self.committed
    }

    pub fn remaining(&self) -> u64 {
        self.total_size - self.committed
    }

    pub fn result(&self) -> Option<&Metadata> {
        self.result.as_ref()
    }

    pub fn into_result(self) -> Option<Metadata> {
        self.result
    }

    pub fn is_complete(&self) -> bool {
        self.result.is_some()
    }

    /// Never moves the committed offset backwards.
    pub(crate) fn advance(&mut self, offset: u64) {
        self.committed = self.committed.max(offset.min(self.total_size));
    }

    pub(crate) fn complete(&mut self, metadata: Metadata) {
        self.result = Some(metadata);
    }
}

impl<P: Pacer> Uploader<P> {
    /// Negotiate a resumable session. The returned handle targets the
    /// server-issued session URI.
    pub async fn initiate<M>(&self, new: &NewUpload<'_, M>) -> Result<UploadSession, UploadError>
    where
        M: Serialize + Sync + ?Sized,
    {
        let body = Bytes::from(serde_json::to_vec(new.metadata)?);
        let request =
            negotiation_request(&self.config, new.file_id, new.content_type, new.size, body)?;
        let url = request.url.clone();
        let resp = self
            .call(request, |resp| {
                if resp.status.is_success() {
                    Ok(resp)
                } else {
                    Err(status_error(&resp))
                }
            })
            .await?;

        let location = resp
            .header_str(LOCATION)
            .ok_or(UploadError::MissingSessionUri)?;
        let uri = resolve_session_uri(&url, location)?;
        debug!(remote = new.remote, %uri, size = new.size, "Negotiated upload session");
        Ok(UploadSession::attach(new.remote, uri, new.size, new.content_type))
    }
}
