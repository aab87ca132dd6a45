use reqwest::header::RANGE;
use tracing::debug;

use crate::error::UploadError;
use crate::utils::constants::STATUS_RESUME_INCOMPLETE;
use crate::utils::operations::parse_committed_range;
use crate::utils::outcome::{is_success, status_error, Metadata};
use crate::utils::pacer::Pacer;
use crate::utils::request::status_request;
use crate::utils::session::UploadSession;
use crate::utils::transport::HttpResponse;
use crate::utils::upload::Uploader;

/// Server-side view of a session.
#[derive(Debug, Clone, PartialEq)]
pub enum Probe {
    /// Bytes the server holds; more data expected.
    Committed(u64),
    /// Upload finished. Carries the object record when the reply had one.
    Finished(Option<Metadata>),
}

impl<P: Pacer> Uploader<P> {
    /// Query the server for how many bytes of `session` it has committed.
    ///
    /// Independent of the local cursor; used to recover interrupted uploads.
    pub async fn transfer_status(&self, session: &UploadSession) -> Result<u64, UploadError> {
        Ok(match self.probe(session).await? {
            Probe::Committed(offset) => offset,
            Probe::Finished(_) => session.total_size,
        })
    }

    pub(crate) async fn probe(&self, session: &UploadSession) -> Result<Probe, UploadError> {
        let request = status_request(&session.uri, session.total_size)?;
        let resp = self
            .call(request, |resp| {
                if resp.status.is_client_error() || resp.status.is_server_error() {
                    Err(status_error(&resp))
                } else {
                    Ok(resp)
                }
            })
            .await?;
        let probe = interpret_status(&resp)?;
        debug!(remote = %session.remote, ?probe, "Queried transfer status");
        Ok(probe)
    }
}

fn interpret_status(resp: &HttpResponse) -> Result<Probe, UploadError> {
    if is_success(resp.status) {
        return Ok(Probe::Finished(serde_json::from_slice(&resp.body).ok()));
    }
    if resp.status.as_u16() != STATUS_RESUME_INCOMPLETE {
        return Err(UploadError::UnexpectedStatus(resp.status.as_u16()));
    }
    // Missing or non-UTF-8 headers fail the pattern like any other value.
    let range = resp.header_str(RANGE).unwrap_or_default();
    Ok(Probe::Committed(parse_committed_range(range)?))
}
