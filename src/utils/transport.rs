use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::header::HeaderMap;
use reqwest::{Method, Response, StatusCode};
use tracing::warn;
use url::Url;

use crate::error::UploadError;
use crate::utils::constants::STATUS_RESUME_INCOMPLETE;

/// One outgoing request of the upload protocol.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn header_str(&self, name: impl reqwest::header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Body as text for error reports.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Executes a single HTTP round trip. Failures that never produced a status
/// code must be reported as [`UploadError::Transport`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, UploadError>;
}

#[async_trait]
impl Transport for reqwest::Client {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, UploadError> {
        let resp = self
            .request(request.method, request.url)
            .headers(request.headers)
            .body(request.body)
            .send()
            .await
            .map_err(UploadError::transport)?;
        let status = resp.status();
        let headers = resp.headers().clone();
        // Once the status line arrived the reply is classified by it, whatever
        // happens to the body. A 308 body is never looked at.
        let body = if status.as_u16() == STATUS_RESUME_INCOMPLETE {
            Bytes::new()
        } else {
            read_body(resp).await
        };
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Read as much of the body as arrives before the stream ends or fails.
async fn read_body(mut resp: Response) -> Bytes {
    let mut body = BytesMut::new();
    loop {
        match resp.chunk().await {
            Ok(Some(chunk)) => body.extend_from_slice(&chunk),
            Ok(None) => break,
            Err(err) => {
                warn!(status = %resp.status(), read = body.len(), error = %err, "Response body truncated");
                break;
            }
        }
    }
    body.freeze()
}
