use reqwest::StatusCode;

use crate::error::UploadError;
use crate::utils::constants::STATUS_RESUME_INCOMPLETE;
use crate::utils::transport::HttpResponse;

/// Final object record returned by the service; owned by the caller.
pub type Metadata = serde_json::Value;

/// What one chunk response means for the transfer loop.
#[derive(Debug)]
pub enum TransferOutcome {
    /// Chunk accepted; the server expects data from this offset next.
    Incomplete(u64),
    Completed(Metadata),
    Error(UploadError),
}

/// A chunk reply the server did not reject.
#[derive(Debug)]
pub enum Accepted {
    Incomplete(u64),
    Completed(Metadata),
}

impl TransferOutcome {
    /// Move the error case into `Err` so it goes through the retry policy.
    pub fn into_result(self) -> Result<Accepted, UploadError> {
        match self {
            TransferOutcome::Incomplete(next) => Ok(Accepted::Incomplete(next)),
            TransferOutcome::Completed(metadata) => Ok(Accepted::Completed(metadata)),
            TransferOutcome::Error(err) => Err(err),
        }
    }
}

/// Classify a chunk response. `next_offset` is where the loop continues
/// after a resume-incomplete reply.
pub fn classify(resp: &HttpResponse, next_offset: u64) -> TransferOutcome {
    match resp.status.as_u16() {
        STATUS_RESUME_INCOMPLETE => TransferOutcome::Incomplete(next_offset),
        // Created for a new object, OK when an existing one was updated.
        200 | 201 => match serde_json::from_slice(&resp.body) {
            Ok(metadata) => TransferOutcome::Completed(metadata),
            Err(err) => TransferOutcome::Error(err.into()),
        },
        _ => TransferOutcome::Error(status_error(resp)),
    }
}

pub fn status_error(resp: &HttpResponse) -> UploadError {
    UploadError::Status {
        status: resp.status.as_u16(),
        body: resp.body_text(),
    }
}

pub fn is_success(status: StatusCode) -> bool {
    status == StatusCode::OK || status == StatusCode::CREATED
}
