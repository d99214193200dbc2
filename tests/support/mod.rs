#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use raw_sqs_connector::client::{QueueClient, RawMessage};
use raw_sqs_connector::errors::RawSqsError;
use raw_sqs_connector::rate_limit::RateLimiter;

#[derive(Default)]
struct FakeState {
    responses: VecDeque<Result<Vec<RawMessage>, String>>,
    received_from: Vec<String>,
    deleted: Vec<String>,
    released: Vec<(String, Duration)>,
    size: u64,
    fail_deletes: bool,
}

/// In-memory stand-in for SQS. Each receive consumes one scripted response;
/// an exhausted script behaves like an empty queue.
#[derive(Clone, Default)]
pub struct FakeQueueClient {
    state: Arc<Mutex<FakeState>>,
}

impl FakeQueueClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond_with(&self, messages: Vec<RawMessage>) -> &Self {
        self.state.lock().unwrap().responses.push_back(Ok(messages));
        self
    }

    pub fn fail_with(&self, message: &str) -> &Self {
        self.state
            .lock()
            .unwrap()
            .responses
            .push_back(Err(message.to_string()));
        self
    }

    /// Makes every later delete fail as SQS would on an expired receipt handle.
    pub fn fail_deletes(&self) {
        self.state.lock().unwrap().fail_deletes = true;
    }

    pub fn set_size(&self, size: u64) {
        self.state.lock().unwrap().size = size;
    }

    pub fn receive_calls(&self) -> usize {
        self.state.lock().unwrap().received_from.len()
    }

    pub fn received_from(&self) -> Vec<String> {
        self.state.lock().unwrap().received_from.clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }

    pub fn released(&self) -> Vec<(String, Duration)> {
        self.state.lock().unwrap().released.clone()
    }

    pub fn total_calls(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.received_from.len() + state.deleted.len() + state.released.len()
    }
}

#[async_trait]
impl QueueClient for FakeQueueClient {
    async fn receive_messages(
        &self,
        queue_url: &str,
        max_messages: i32,
    ) -> Result<Vec<RawMessage>, RawSqsError> {
        assert_eq!(max_messages, 1, "the connector polls one message at a time");
        let mut state = self.state.lock().unwrap();
        state.received_from.push(queue_url.to_string());
        match state.responses.pop_front() {
            Some(Ok(messages)) => Ok(messages),
            Some(Err(message)) => Err(RawSqsError::Transport {
                action: "receive",
                message,
            }),
            None => Ok(Vec::new()),
        }
    }

    async fn delete_message(
        &self,
        _queue_url: &str,
        receipt_handle: &str,
    ) -> Result<(), RawSqsError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_deletes {
            return Err(RawSqsError::Transport {
                action: "delete",
                message: "receipt handle has expired".to_string(),
            });
        }
        state.deleted.push(receipt_handle.to_string());
        Ok(())
    }

    async fn change_visibility(
        &self,
        _queue_url: &str,
        receipt_handle: &str,
        visibility: Duration,
    ) -> Result<(), RawSqsError> {
        self.state
            .lock()
            .unwrap()
            .released
            .push((receipt_handle.to_string(), visibility));
        Ok(())
    }

    async fn approximate_size(&self, _queue_url: &str) -> Result<u64, RawSqsError> {
        Ok(self.state.lock().unwrap().size)
    }
}

/// Limiter that grants or denies every attempt and records what it was asked.
#[derive(Clone)]
pub struct CountingRateLimiter {
    allow: bool,
    calls: Arc<AtomicUsize>,
    last_limit: Arc<AtomicU32>,
}

impl CountingRateLimiter {
    pub fn allowing() -> Self {
        Self::new(true)
    }

    pub fn denying() -> Self {
        Self::new(false)
    }

    fn new(allow: bool) -> Self {
        CountingRateLimiter {
            allow,
            calls: Arc::new(AtomicUsize::new(0)),
            last_limit: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_limit(&self) -> u32 {
        self.last_limit.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateLimiter for CountingRateLimiter {
    async fn attempt(&self, _key: &str, max_attempts: u32, _decay: Duration) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_limit.store(max_attempts, Ordering::SeqCst);
        self.allow
    }
}

pub fn message(body: &str, receipt_handle: &str) -> RawMessage {
    RawMessage {
        body: Some(body.to_string()),
        receipt_handle: Some(receipt_handle.to_string()),
        message_id: Some(format!("id-{receipt_handle}")),
        receive_count: Some(1),
    }
}

pub fn message_delivered(body: &str, receipt_handle: &str, receive_count: u32) -> RawMessage {
    RawMessage {
        receive_count: Some(receive_count),
        ..message(body, receipt_handle)
    }
}
