use std::future::Future;
use std::time::Duration;

use color_eyre::eyre::Report;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::{sleep_until, Instant};
use tracing::warn;

use crate::error::UploadError;
use crate::utils::constants::*;

/// Decides whether a failed call is worth another attempt.
pub trait RetryPolicy: Send + Sync {
    fn should_retry(&self, err: &UploadError) -> bool;
}

/// Retries connection failures, throttling and 5xx replies.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultRetryPolicy;

impl RetryPolicy for DefaultRetryPolicy {
    fn should_retry(&self, err: &UploadError) -> bool {
        match err {
            UploadError::Transport(_) => true,
            UploadError::Status { status, body } => match status {
                408 | 429 | 500 | 502 | 503 | 504 => true,
                403 => body.contains("rateLimitExceeded") || body.contains("userRateLimitExceeded"),
                _ => false,
            },
            _ => false,
        }
    }
}

/// Invokes an operation, re-invoking it after a delay while the policy asks
/// for a retry and the attempt budget lasts. One instance is shared by every
/// upload in the process.
pub trait Pacer: Send + Sync {
    fn call<T, F, Fut>(
        &self,
        policy: &dyn RetryPolicy,
        op: F,
    ) -> impl Future<Output = Result<T, UploadError>> + Send
    where
        T: Send,
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, UploadError>> + Send;
}

#[derive(Debug, Clone, PartialEq)]
pub struct PacerConfig {
    pub min_sleep: Duration,
    pub max_sleep: Duration,
    pub decay_constant: u32,
    /// Attempts per call, including the first.
    pub retries: u32,
    pub max_connections: usize,
}

impl Default for PacerConfig {
    fn default() -> Self {
        PacerConfig {
            min_sleep: MIN_SLEEP,
            max_sleep: MAX_SLEEP,
            decay_constant: DECAY_CONSTANT,
            retries: LOW_LEVEL_RETRIES,
            max_connections: MAX_CONNECTIONS,
        }
    }
}

#[derive(Debug)]
struct State {
    sleep: Duration,
    last_call: Option<Instant>,
}

/// Exponential backoff pacer.
///
/// Call starts are spaced by the current sleep. A retryable failure doubles
/// the sleep up to `max_sleep`; a success decays it toward `min_sleep`.
#[derive(Debug)]
pub struct Backoff {
    config: PacerConfig,
    state: Mutex<State>,
    connections: Option<Semaphore>,
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::new(PacerConfig::default())
    }
}

impl Backoff {
    pub fn new(config: PacerConfig) -> Self {
        let connections = (config.max_connections > 0).then(|| Semaphore::new(config.max_connections));
        Backoff {
            state: Mutex::new(State {
                sleep: config.min_sleep,
                last_call: None,
            }),
            connections,
            config,
        }
    }

    pub async fn current_sleep(&self) -> Duration {
        self.state.lock().await.sleep
    }

    async fn begin_call(&self) {
        let mut state = self.state.lock().await;
        if let Some(last) = state.last_call {
            sleep_until(last + state.sleep).await;
        }
        state.last_call = Some(Instant::now());
    }

    async fn end_call(&self, retry: bool) {
        let mut state = self.state.lock().await;
        state.sleep = if retry {
            state
                .sleep
                .saturating_mul(2)
                .max(self.config.min_sleep)
                .min(self.config.max_sleep)
        } else {
            let factor = 1u32 << self.config.decay_constant.min(16);
            (state.sleep * (factor - 1) / factor).max(self.config.min_sleep)
        };
    }
}

impl Pacer for Backoff {
    async fn call<T, F, Fut>(&self, policy: &dyn RetryPolicy, mut op: F) -> Result<T, UploadError>
    where
        T: Send,
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, UploadError>> + Send,
    {
        let mut attempt = 1;
        loop {
            self.begin_call().await;
            let result = {
                let _permit = match &self.connections {
                    Some(connections) => Some(
                        connections
                            .acquire()
                            .await
                            .map_err(|e| UploadError::UnexpectedError(Report::new(e)))?,
                    ),
                    None => None,
                };
                op().await
            };
            let retry = result.as_ref().err().is_some_and(|err| policy.should_retry(err));
            self.end_call(retry).await;
            match result {
                Err(err) if retry && attempt < self.config.retries => {
                    warn!(attempt, retries = self.config.retries, error = %err, "Retrying call");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}
