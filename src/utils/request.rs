use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_RANGE, CONTENT_TYPE};
use reqwest::Method;
use url::Url;

use crate::error::UploadError;
use crate::utils::config::UploadConfig;
use crate::utils::constants::*;
use crate::utils::operations::{content_range, parse_endpoint, upload_url};
use crate::utils::transport::HttpRequest;

pub const X_UPLOAD_CONTENT_TYPE: HeaderName = HeaderName::from_static("x-upload-content-type");
pub const X_UPLOAD_CONTENT_LENGTH: HeaderName = HeaderName::from_static("x-upload-content-length");

/// Session negotiation request: POST to create, PATCH to update `file_id`.
pub fn negotiation_request(
    config: &UploadConfig,
    file_id: Option<&str>,
    content_type: &str,
    size: u64,
    metadata: Bytes,
) -> Result<HttpRequest, UploadError> {
    let endpoint = parse_endpoint(&config.endpoint)?;
    let update = file_id.is_some_and(|id| !id.is_empty());
    let mut url = upload_url(&endpoint, file_id)?;
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("alt", "json")
            .append_pair("uploadType", "resumable")
            .append_pair("fields", &config.fields);
        if config.team_drive {
            query.append_pair("supportsAllDrives", "true");
        }
        if config.keep_revision_forever {
            query.append_pair("keepRevisionForever", "true");
        }
        if update {
            query.append_pair("setModifiedDate", "true");
        }
        for (key, value) in &config.extra_params {
            query.append_pair(key, value);
        }
    }

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    headers.insert(X_UPLOAD_CONTENT_TYPE, HeaderValue::from_str(content_type)?);
    headers.insert(X_UPLOAD_CONTENT_LENGTH, HeaderValue::from(size));

    Ok(HttpRequest {
        method: if update { Method::PATCH } else { Method::POST },
        url,
        headers,
        body: metadata,
    })
}

/// Request carrying `payload` at `start`. An empty payload becomes a
/// `bytes */total` request.
pub fn chunk_request(
    session_uri: &Url,
    media_type: &str,
    start: u64,
    total: u64,
    payload: Bytes,
) -> Result<HttpRequest, UploadError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_RANGE,
        HeaderValue::from_str(&content_range(start, payload.len() as u64, total))?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_str(media_type)?);
    Ok(HttpRequest {
        method: Method::POST,
        url: session_uri.clone(),
        headers,
        body: payload,
    })
}

/// Zero-length request asking how much of the session the server holds.
pub fn status_request(session_uri: &Url, total: u64) -> Result<HttpRequest, UploadError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_RANGE,
        HeaderValue::from_str(&content_range(0, 0, total))?,
    );
    Ok(HttpRequest {
        method: Method::POST,
        url: session_uri.clone(),
        headers,
        body: Bytes::new(),
    })
}
