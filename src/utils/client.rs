use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{redirect, Client};

use crate::error::UploadError;
use crate::utils::constants::*;

/// Get HTTP client for the upload protocol.
///
/// Redirects are disabled: a 308 is the protocol's "resume incomplete" reply,
/// not a redirect, and must reach the transfer loop unchanged.
pub fn get_http_client(access_token: Option<&str>) -> Result<Client, UploadError> {
    let mut headers = HeaderMap::new();
    if let Some(token) = access_token {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(redirect::Policy::none())
        .default_headers(headers)
        .build()
        .map_err(UploadError::transport)
}
