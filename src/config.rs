use serde::Deserialize;

use crate::client::{create_sqs_client_from_env, create_sqs_client_with_credentials};
use crate::errors::RawSqsError;
use crate::queue::RawSqsQueue;

/// Connection settings for a [`RawSqsQueue`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Queue polled when `pop` is called without a queue name.
    pub queue: String,

    /// Account URL the queue name is appended to.
    pub prefix: String,

    pub region: Option<String>,

    pub key: Option<String>,

    pub secret: Option<String>,

    /// Endpoint override, e.g. a local SQS emulator.
    pub endpoint: Option<String>,

    /// Class name every message is wrapped as.
    pub job_class: String,

    /// Maximum polls per minute.
    pub rate_limit: Option<u32>,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        ConnectorConfig {
            queue: "default".to_string(),
            prefix: String::new(),
            region: None,
            key: None,
            secret: None,
            endpoint: None,
            job_class: String::new(),
            rate_limit: None,
        }
    }
}

impl ConnectorConfig {
    /// Reads the configuration from the process environment.
    ///
    /// - `RAW_SQS_QUEUE` (default `default`)
    /// - `RAW_SQS_PREFIX` (required)
    /// - `RAW_SQS_JOB_CLASS` (required)
    /// - `RAW_SQS_RATE_LIMIT`
    /// - `RAW_SQS_ENDPOINT`
    /// - `AWS_REGION` or `AWS_DEFAULT_REGION`
    /// - `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`
    pub fn from_env() -> Result<Self, RawSqsError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RawSqsError> {
        let var = |name: &str| lookup(name).filter(|value| !value.is_empty());
        let required = |name: &str| {
            var(name).ok_or_else(|| RawSqsError::InitializationError(format!("{name} must be set")))
        };

        let rate_limit = var("RAW_SQS_RATE_LIMIT")
            .map(|value| {
                value.parse::<u32>().map_err(|e| {
                    RawSqsError::InitializationError(format!(
                        "RAW_SQS_RATE_LIMIT must be a non-negative integer: {e}"
                    ))
                })
            })
            .transpose()?;

        Ok(ConnectorConfig {
            queue: var("RAW_SQS_QUEUE").unwrap_or_else(|| "default".to_string()),
            prefix: required("RAW_SQS_PREFIX")?,
            region: var("AWS_REGION").or_else(|| var("AWS_DEFAULT_REGION")),
            key: var("AWS_ACCESS_KEY_ID"),
            secret: var("AWS_SECRET_ACCESS_KEY"),
            endpoint: var("RAW_SQS_ENDPOINT"),
            job_class: required("RAW_SQS_JOB_CLASS")?,
            rate_limit,
        })
    }
}

/// Builds a [`RawSqsQueue`] from `config`.
///
/// Uses the explicit key and secret when both are set, and the default AWS
/// credential chain otherwise.
pub async fn connect(config: &ConnectorConfig) -> Result<RawSqsQueue, RawSqsError> {
    if config.job_class.is_empty() {
        return Err(RawSqsError::InitializationError(
            "job class must be set".to_string(),
        ));
    }

    let endpoint = config.endpoint.as_deref();
    let client = match (&config.key, &config.secret) {
        (Some(key), Some(secret)) => {
            let region = config.region.as_deref().ok_or_else(|| {
                RawSqsError::InitializationError(
                    "region must be set when credentials are given".to_string(),
                )
            })?;
            create_sqs_client_with_credentials(key, secret, region, endpoint)
        }
        _ => create_sqs_client_from_env(endpoint).await,
    };

    let mut queue = RawSqsQueue::new(client, config.queue.clone(), config.prefix.clone());
    queue.set_job_class(config.job_class.clone());
    if let Some(rate_limit) = config.rate_limit {
        queue.set_rate_limit(rate_limit);
    }

    tracing::debug!(
        queue = %config.queue,
        job_class = %config.job_class,
        rate_limit = ?config.rate_limit,
        "raw sqs connector configured"
    );

    Ok(queue)
}
