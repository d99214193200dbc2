use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::client::{QueueClient, RawMessage};
use crate::errors::RawSqsError;

/// Handler entry point recorded in every descriptor.
pub const CALL_QUEUED_HANDLER: &str = "CallQueuedHandler@call";

/// The envelope a worker dispatches.
///
/// Serializes to `{"displayName", "job", "data": {"commandName", "command"}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDescriptor {
    pub display_name: String,
    pub job: String,
    pub data: CommandEnvelope,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandEnvelope {
    pub command_name: String,
    /// A serialized [`JobCommand`].
    pub command: String,
}

/// An instance of the configured job class, built from a message body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobCommand {
    pub class: String,
    pub data: Map<String, Value>,
}

impl JobCommand {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    /// Deserializes the body fields into a typed job.
    pub fn deserialize_data<T: DeserializeOwned>(&self) -> Result<T, RawSqsError> {
        Ok(serde_json::from_value(Value::Object(self.data.clone()))?)
    }
}

impl JobDescriptor {
    /// Wraps a raw JSON body as an instance of `job_class`.
    pub fn from_body(job_class: &str, body: &str) -> Result<Self, RawSqsError> {
        let data = match serde_json::from_str::<Value>(body)? {
            Value::Object(data) => data,
            _ => return Err(RawSqsError::NonObjectBody),
        };

        let command = JobCommand {
            class: job_class.to_string(),
            data,
        };

        Ok(JobDescriptor {
            display_name: job_class.to_string(),
            job: CALL_QUEUED_HANDLER.to_string(),
            data: CommandEnvelope {
                command_name: job_class.to_string(),
                command: serde_json::to_string(&command)?,
            },
        })
    }

    /// Reconstructs the command stored in the envelope.
    pub fn command(&self) -> Result<JobCommand, RawSqsError> {
        Ok(serde_json::from_str(&self.data.command)?)
    }
}

/// A popped unit of work.
#[async_trait]
pub trait Job: Send + Sync {
    fn payload(&self) -> &JobDescriptor;

    fn job_id(&self) -> Option<&str>;

    /// How many times the job has been delivered, including this one.
    fn attempts(&self) -> u32;

    fn command(&self) -> Result<JobCommand, RawSqsError> {
        self.payload().command()
    }

    /// Acknowledges the job so it is not delivered again.
    async fn delete(&mut self) -> Result<(), RawSqsError>;

    /// Puts the job back on the queue, visible again after `delay`.
    async fn release(&mut self, delay: Duration) -> Result<(), RawSqsError>;
}

/// Job handle returned by [`RawSqsQueue::pop`](crate::queue::RawSqsQueue).
///
/// Keeps the receipt handle of the underlying message so the job can be
/// deleted or released once the worker is done with it.
pub struct RawSqsJob {
    client: Arc<dyn QueueClient>,
    queue_url: String,
    message: RawMessage,
    payload: JobDescriptor,
    deleted: bool,
    released: bool,
}

impl RawSqsJob {
    pub(crate) fn new(
        client: Arc<dyn QueueClient>,
        queue_url: String,
        message: RawMessage,
        payload: JobDescriptor,
    ) -> Self {
        RawSqsJob {
            client,
            queue_url,
            message,
            payload,
            deleted: false,
            released: false,
        }
    }

    pub fn raw_body(&self) -> &str {
        self.message.body.as_deref().unwrap_or_default()
    }

    pub fn receipt_handle(&self) -> Option<&str> {
        self.message.receipt_handle.as_deref()
    }

    /// Full URL of the queue the job was popped from.
    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    fn require_receipt_handle(&self) -> Result<&str, RawSqsError> {
        self.receipt_handle().ok_or(RawSqsError::MissingReceiptHandle)
    }
}

impl std::fmt::Debug for RawSqsJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawSqsJob")
            .field("queue_url", &self.queue_url)
            .field("message", &self.message)
            .field("payload", &self.payload)
            .field("deleted", &self.deleted)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Job for RawSqsJob {
    fn payload(&self) -> &JobDescriptor {
        &self.payload
    }

    fn job_id(&self) -> Option<&str> {
        self.message.message_id.as_deref()
    }

    fn attempts(&self) -> u32 {
        self.message.receive_count.unwrap_or(1)
    }

    async fn delete(&mut self) -> Result<(), RawSqsError> {
        let receipt_handle = self.require_receipt_handle()?;
        self.client
            .delete_message(&self.queue_url, receipt_handle)
            .await?;
        self.deleted = true;
        Ok(())
    }

    async fn release(&mut self, delay: Duration) -> Result<(), RawSqsError> {
        let receipt_handle = self.require_receipt_handle()?;
        self.client
            .change_visibility(&self.queue_url, receipt_handle, delay)
            .await?;
        self.released = true;
        Ok(())
    }
}
