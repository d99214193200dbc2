use thiserror::Error;

/// Error types for raw SQS connector operations.
///
/// A rate-limited poll and an empty receive are not errors; both surface as
/// `Ok(None)` from [`Queue::pop`](crate::queue::Queue::pop).
#[derive(Debug, Error)]
pub enum RawSqsError {
    /// Error that occurs while building the connector or its SQS client.
    ///
    /// Typically a missing or malformed configuration value.
    #[error("failed to initialize raw SQS connector: {0}")]
    InitializationError(String),

    /// The connector only consumes messages; producing them is rejected
    /// before any request is made.
    #[error("{operation} is not permitted for raw-sqs connector")]
    OperationNotPermitted { operation: &'static str },

    /// A request to SQS failed.
    #[error("failed to {action} SQS message: {message}")]
    Transport {
        action: &'static str,
        message: String,
    },

    #[error("received an SQS message with no body")]
    MissingBody,

    #[error("SQS message body is not valid JSON: {0}")]
    InvalidBody(#[from] serde_json::Error),

    #[error("SQS message body must be a JSON object")]
    NonObjectBody,

    #[error("SQS message has no receipt handle")]
    MissingReceiptHandle,

    #[error("{0}")]
    JobFailed(#[from] JobFailure),
}

impl RawSqsError {
    pub(crate) fn not_permitted(operation: &'static str) -> Self {
        RawSqsError::OperationNotPermitted { operation }
    }

    pub(crate) fn transport(action: &'static str, message: impl ToString) -> Self {
        RawSqsError::Transport {
            action,
            message: message.to_string(),
        }
    }
}

/// Failure reported by a job handler.
///
/// Handlers return this to have the worker release the job back onto the
/// queue instead of deleting it.
#[derive(Debug, Error)]
#[error("job failed: {0}")]
pub struct JobFailure(String);

impl JobFailure {
    /// Creates a new `JobFailure` with the provided message.
    pub fn new(message: impl Into<String>) -> Self {
        JobFailure(message.into())
    }

    /// The handler's description of what went wrong.
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl From<String> for JobFailure {
    fn from(s: String) -> Self {
        JobFailure::new(s)
    }
}

impl From<&str> for JobFailure {
    fn from(s: &str) -> Self {
        JobFailure::new(s)
    }
}
