use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::client::QueueClient;
use crate::errors::RawSqsError;
use crate::job::{Job, JobDescriptor, RawSqsJob};
use crate::rate_limit::{
    InMemoryRateLimiter, RATE_LIMIT_DECAY, RATE_LIMIT_KEY, RateLimitSource, RateLimiter,
};

/// Operations a worker expects from a queue backend.
#[async_trait]
pub trait Queue: Send + Sync {
    type Job: Job;

    /// Approximate number of pending jobs on `queue` (the default queue when `None`).
    async fn size(&self, queue: Option<&str>) -> Result<u64, RawSqsError>;

    async fn push(&self, job: &str, data: Value, queue: Option<&str>)
    -> Result<String, RawSqsError>;

    async fn push_raw(&self, payload: &str, queue: Option<&str>) -> Result<String, RawSqsError>;

    async fn later(
        &self,
        delay: Duration,
        job: &str,
        data: Value,
        queue: Option<&str>,
    ) -> Result<String, RawSqsError>;

    /// Takes the next job off `queue`, if any.
    async fn pop(&self, queue: Option<&str>) -> Result<Option<Self::Job>, RawSqsError>;
}

/// A consume-only queue over SQS messages whose bodies are plain JSON.
///
/// Each message is wrapped as an instance of the configured job class. Pushing
/// and delaying jobs are rejected.
pub struct RawSqsQueue {
    client: Arc<dyn QueueClient>,
    default_queue: String,
    prefix: String,
    job_class: String,
    rate_limit: Option<RateLimitSource>,
    rate_limiter: Arc<dyn RateLimiter>,
}

impl RawSqsQueue {
    /// Creates a queue polling `default_queue` under `prefix`.
    ///
    /// `prefix` is the account URL, e.g.
    /// `https://sqs.eu-west-1.amazonaws.com/123456789012`.
    pub fn new(
        client: impl QueueClient + 'static,
        default_queue: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self::with_shared_client(Arc::new(client), default_queue, prefix)
    }

    pub fn with_shared_client(
        client: Arc<dyn QueueClient>,
        default_queue: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        RawSqsQueue {
            client,
            default_queue: default_queue.into(),
            prefix: prefix.into(),
            job_class: String::new(),
            rate_limit: None,
            rate_limiter: Arc::new(InMemoryRateLimiter::new()),
        }
    }

    pub fn set_job_class(&mut self, job_class: impl Into<String>) -> &mut Self {
        self.job_class = job_class.into();
        self
    }

    /// Limits polls to `rate_limit` per minute.
    pub fn set_rate_limit(&mut self, rate_limit: impl Into<RateLimitSource>) -> &mut Self {
        self.rate_limit = Some(rate_limit.into());
        self
    }

    /// Replaces the default process-local limiter, e.g. with one backed by a
    /// shared store so several workers draw from the same budget.
    pub fn set_rate_limiter(&mut self, rate_limiter: Arc<dyn RateLimiter>) -> &mut Self {
        self.rate_limiter = rate_limiter;
        self
    }

    pub fn job_class(&self) -> &str {
        &self.job_class
    }

    pub fn rate_limit(&self) -> Option<&RateLimitSource> {
        self.rate_limit.as_ref()
    }

    /// Resolves `queue` to a full queue URL.
    pub fn queue_url(&self, queue: Option<&str>) -> String {
        resolve_queue_url(&self.prefix, queue.unwrap_or(&self.default_queue))
    }

    async fn query_sqs(&self, queue_url: &str) -> Result<Option<RawSqsJob>, RawSqsError> {
        let mut messages = self.client.receive_messages(queue_url, 1).await?;
        if messages.is_empty() {
            tracing::debug!(queue_url, "no messages received");
            return Ok(None);
        }

        let message = messages.swap_remove(0);
        let body = message.body.as_deref().ok_or(RawSqsError::MissingBody)?;
        let payload = JobDescriptor::from_body(&self.job_class, body)?;

        tracing::debug!(
            queue_url,
            message_id = message.message_id.as_deref().unwrap_or_default(),
            job_class = %self.job_class,
            "received message"
        );

        Ok(Some(RawSqsJob::new(
            self.client.clone(),
            queue_url.to_string(),
            message,
            payload,
        )))
    }
}

impl std::fmt::Debug for RawSqsQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawSqsQueue")
            .field("default_queue", &self.default_queue)
            .field("prefix", &self.prefix)
            .field("job_class", &self.job_class)
            .field("rate_limit", &self.rate_limit)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Queue for RawSqsQueue {
    type Job = RawSqsJob;

    async fn size(&self, queue: Option<&str>) -> Result<u64, RawSqsError> {
        self.client.approximate_size(&self.queue_url(queue)).await
    }

    async fn push(
        &self,
        _job: &str,
        _data: Value,
        _queue: Option<&str>,
    ) -> Result<String, RawSqsError> {
        Err(RawSqsError::not_permitted("push"))
    }

    async fn push_raw(&self, _payload: &str, _queue: Option<&str>) -> Result<String, RawSqsError> {
        Err(RawSqsError::not_permitted("pushRaw"))
    }

    async fn later(
        &self,
        _delay: Duration,
        _job: &str,
        _data: Value,
        _queue: Option<&str>,
    ) -> Result<String, RawSqsError> {
        Err(RawSqsError::not_permitted("later"))
    }

    async fn pop(&self, queue: Option<&str>) -> Result<Option<RawSqsJob>, RawSqsError> {
        let queue_url = self.queue_url(queue);

        let Some(limit) = self.rate_limit.as_ref().and_then(RateLimitSource::resolve) else {
            return self.query_sqs(&queue_url).await;
        };

        if !self
            .rate_limiter
            .attempt(RATE_LIMIT_KEY, limit, RATE_LIMIT_DECAY)
            .await
        {
            tracing::info!(
                queue_url = %queue_url,
                key = RATE_LIMIT_KEY,
                limit,
                "rate limit reached, skipping poll"
            );
            return Ok(None);
        }

        self.query_sqs(&queue_url).await
    }
}

/// Joins `prefix` and `queue`, unless `queue` is already a URL.
pub fn resolve_queue_url(prefix: &str, queue: &str) -> String {
    if queue.starts_with("https://") || queue.starts_with("http://") {
        return queue.to_string();
    }
    format!("{}/{}", prefix.trim_end_matches('/'), queue)
}
