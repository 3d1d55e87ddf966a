//! Scripted completion backend for unit tests

use async_trait::async_trait;
use parking_lot::Mutex;
use precis_common::{PrecisError, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::llm_trait::CompletionClient;
use crate::types::CompletionRequest;

type Responder = Box<dyn Fn(&CompletionRequest) -> Result<String> + Send + Sync>;

/// Replays queued replies, or answers through a responder once the queue is empty
pub(crate) struct ScriptedClient {
    replies: Mutex<VecDeque<Result<String>>>,
    responder: Responder,
    delay: Duration,
    calls: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    pub(crate) fn sequence(replies: Vec<Result<String>>) -> Self {
        Self::with_responder(replies, |_| Err(PrecisError::upstream("script exhausted")))
    }

    pub(crate) fn always(reply: &str) -> Self {
        let reply = reply.to_string();
        Self::with_responder(Vec::new(), move |_| Ok(reply.clone()))
    }

    pub(crate) fn responder<F>(responder: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Result<String> + Send + Sync + 'static,
    {
        Self::with_responder(Vec::new(), responder)
    }

    fn with_responder<F>(replies: Vec<Result<String>>, responder: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            replies: Mutex::new(replies.into()),
            responder: Box::new(responder),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Simulated round-trip latency
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of overlapping `complete` calls seen so far
    pub(crate) fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub(crate) fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);
        let queued = self.replies.lock().pop_front();
        let reply = match queued {
            Some(reply) => reply,
            None => (self.responder)(&request),
        };
        self.requests.lock().push(request);
        reply
    }

    async fn test_connection(&self) -> Result<bool> {
        Ok(true)
    }

    fn provider(&self) -> &str {
        "scripted"
    }
}

/// `n` distinct words, for building replies of a known length
pub(crate) fn words(n: usize) -> String {
    (1..=n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
}
