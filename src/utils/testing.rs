//! In-memory stand-ins for the network and the backoff delay.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_RANGE, LOCATION, RANGE};
use reqwest::StatusCode;
use serde_json::json;

use crate::error::UploadError;
use crate::utils::pacer::{Backoff, PacerConfig};
use crate::utils::request::X_UPLOAD_CONTENT_LENGTH;
use crate::utils::transport::{HttpRequest, HttpResponse, Transport};

/// Zero-delay pacer with `retries` attempts per call.
pub fn instant_pacer(retries: u32) -> Arc<Backoff> {
    Arc::new(Backoff::new(PacerConfig {
        min_sleep: Duration::ZERO,
        max_sleep: Duration::ZERO,
        retries,
        ..Default::default()
    }))
}

fn response(status: u16, headers: &[(&str, &str)], body: &str) -> HttpResponse {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        map.insert(
            HeaderName::from_bytes(name.as_bytes()).unwrap(),
            HeaderValue::from_str(value).unwrap(),
        );
    }
    HttpResponse {
        status: StatusCode::from_u16(status).unwrap(),
        headers: map,
        body: Bytes::copy_from_slice(body.as_bytes()),
    }
}

enum Scripted {
    Respond(HttpResponse),
    Fail(&'static str),
}

/// Replays a fixed list of replies and records every request.
#[derive(Default)]
pub struct FakeServer {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FakeServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, status: u16, headers: &[(&str, &str)], body: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted::Respond(response(status, headers, body)));
        self
    }

    /// Next request fails without a status, like a dropped connection.
    pub fn fail(self, reason: &'static str) -> Self {
        self.script.lock().unwrap().push_back(Scripted::Fail(reason));
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeServer {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, UploadError> {
        self.requests.lock().unwrap().push(request);
        match self.script.lock().unwrap().pop_front() {
            Some(Scripted::Respond(resp)) => Ok(resp),
            Some(Scripted::Fail(reason)) => Err(UploadError::transport(reason)),
            None => Err(UploadError::transport("no scripted response left")),
        }
    }
}

#[derive(Default)]
struct Received {
    data: Vec<u8>,
    chunks: Vec<(u64, u64)>,
    ranges: Vec<String>,
}

/// Minimal server side of the resumable protocol: negotiates, appends
/// contiguous chunks, answers status queries.
#[derive(Default)]
pub struct ProtocolServer {
    state: Mutex<Received>,
    stop_after_chunks: Option<usize>,
}

impl ProtocolServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply 503 to every data chunk after the first `n`.
    pub fn stop_after_chunks(mut self, n: usize) -> Self {
        self.stop_after_chunks = Some(n);
        self
    }

    pub fn received(&self) -> Vec<u8> {
        self.state.lock().unwrap().data.clone()
    }

    /// `(start, len)` of every accepted data chunk.
    pub fn chunks(&self) -> Vec<(u64, u64)> {
        self.state.lock().unwrap().chunks.clone()
    }

    /// `Content-Range` of every accepted data chunk.
    pub fn ranges(&self) -> Vec<String> {
        self.state.lock().unwrap().ranges.clone()
    }

    fn progress(state: &Received, total: u64) -> HttpResponse {
        let held = state.data.len() as u64;
        if held == total {
            let body = json!({"id": "obj", "size": total}).to_string();
            return response(201, &[], &body);
        }
        if held == 0 {
            return response(308, &[], "");
        }
        let range = format!("bytes=0-{}", held - 1);
        response(308, &[(RANGE.as_str(), range.as_str())], "")
    }
}

#[async_trait]
impl Transport for ProtocolServer {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, UploadError> {
        if request.headers.contains_key(X_UPLOAD_CONTENT_LENGTH) {
            return Ok(response(
                200,
                &[(LOCATION.as_str(), "https://upload.example.com/session/1")],
                "",
            ));
        }

        let content_range = request.headers[CONTENT_RANGE].to_str().unwrap().to_string();
        let (range, total) = content_range
            .strip_prefix("bytes ")
            .and_then(|r| r.split_once('/'))
            .unwrap();
        let total: u64 = total.parse().unwrap();
        let mut state = self.state.lock().unwrap();
        if range == "*" {
            return Ok(Self::progress(&state, total));
        }

        if self
            .stop_after_chunks
            .is_some_and(|n| state.chunks.len() >= n)
        {
            return Ok(response(503, &[], "backend unavailable"));
        }
        let (start, end) = range.split_once('-').unwrap();
        let (start, end): (u64, u64) = (start.parse().unwrap(), end.parse().unwrap());
        if start != state.data.len() as u64 || end - start + 1 != request.body.len() as u64 {
            return Ok(response(400, &[], "non-contiguous range"));
        }
        state.data.extend_from_slice(&request.body);
        state.chunks.push((start, end - start + 1));
        state.ranges.push(content_range.clone());
        Ok(Self::progress(&state, total))
    }
}
