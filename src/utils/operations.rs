use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::error::UploadError;

/// Matches the `Range` header of a 308 status reply. `$1` is the last byte
/// index the server holds.
static RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:bytes=)?0-(\d+)$").expect("valid range regex"));

pub fn parse_endpoint(endpoint: &str) -> Result<Url, UploadError> {
    let url = Url::parse(endpoint)?;
    if url.cannot_be_a_base() {
        return Err(UploadError::InvalidConfig(format!(
            "endpoint {endpoint:?} is not a base URL"
        )));
    }
    Ok(url)
}

/// Endpoint for a create (`file_id` empty) or an update in place.
pub fn upload_url(endpoint: &Url, file_id: Option<&str>) -> Result<Url, UploadError> {
    let mut url = endpoint.clone();
    if let Some(id) = file_id.filter(|id| !id.is_empty()) {
        url.path_segments_mut()
            .map_err(|_| UploadError::InvalidConfig(format!("endpoint {endpoint} is not a base URL")))?
            .pop_if_empty()
            .push(id);
    }
    Ok(url)
}

/// Resolve a `Location` value against the negotiation URL.
pub fn resolve_session_uri(request_url: &Url, location: &str) -> Result<Url, UploadError> {
    let location = location.trim();
    if location.is_empty() {
        return Err(UploadError::MissingSessionUri);
    }
    Ok(request_url.join(location)?)
}

/// Committed byte count from a `Range: 0-N` header (inclusive `N`).
pub fn parse_committed_range(range: &str) -> Result<u64, UploadError> {
    RANGE_RE
        .captures(range.trim())
        .and_then(|caps| caps[1].parse::<u64>().ok())
        .and_then(|last| last.checked_add(1))
        .ok_or_else(|| UploadError::InvalidRange(range.to_string()))
}

/// `Content-Range` value for `len` bytes at `start`. A zero length queries
/// (or finalises) the session without carrying data.
pub fn content_range(start: u64, len: u64, total: u64) -> String {
    if len == 0 {
        format!("bytes */{total}")
    } else {
        format!("bytes {}-{}/{}", start, start + len - 1, total)
    }
}
