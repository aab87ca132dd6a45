use std::io::Error as IoError;

use color_eyre::eyre::Report;
use reqwest::header::InvalidHeaderValue;
use thiserror::Error;
use url::ParseError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("IO error")]
    IoError(#[from] IoError),

    #[error("Transport error: {0}")]
    Transport(#[source] BoxError),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Upload session response carried no Location header")]
    MissingSessionUri,

    #[error("UrlParseError error")]
    UrlParseError(#[from] ParseError),

    #[error("Invalid header value")]
    InvalidHeader(#[from] InvalidHeaderValue),

    #[error("Unable to parse range {0:?}")]
    InvalidRange(String),

    #[error("JSON error")]
    Json(#[from] serde_json::Error),

    #[error("Unexpected HTTP return code {0}")]
    UnexpectedStatus(u16),

    #[error("Source ended early: expected {expected} bytes, got {actual}")]
    ShortRead { expected: u64, actual: u64 },

    #[error("Incomplete upload - retry, last status {}", .last_status.map_or_else(|| "none".to_string(), |s| s.to_string()))]
    IncompleteUpload { last_status: Option<u16> },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unexpected error")]
    UnexpectedError(#[source] Report),
}

impl UploadError {
    /// Wrap any transport-level failure (connection reset, TLS, timeout).
    pub fn transport<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        UploadError::Transport(err.into())
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            UploadError::Status { status, .. } | UploadError::UnexpectedStatus(status) => {
                Some(*status)
            }
            UploadError::IncompleteUpload { last_status } => *last_status,
            _ => None,
        }
    }

    /// True when the whole upload has to be negotiated again from scratch.
    pub fn is_restart_required(&self) -> bool {
        matches!(
            self,
            UploadError::IncompleteUpload { .. } | UploadError::Status { status: 404, .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(UploadError::IncompleteUpload { last_status: Some(308) }, true)]
    #[case(UploadError::Status { status: 404, body: String::new() }, true)]
    #[case(UploadError::Status { status: 500, body: String::new() }, false)]
    #[case(UploadError::MissingSessionUri, false)]
    #[case(UploadError::transport("connection reset"), false)]
    fn test_is_restart_required(#[case] err: UploadError, #[case] expected: bool) {
        assert_eq!(expected, err.is_restart_required());
    }

    #[test]
    fn test_incomplete_upload_message() {
        let err = UploadError::IncompleteUpload { last_status: Some(308) };
        assert_eq!("Incomplete upload - retry, last status 308", err.to_string());
        let err = UploadError::IncompleteUpload { last_status: None };
        assert_eq!("Incomplete upload - retry, last status none", err.to_string());
    }
}
