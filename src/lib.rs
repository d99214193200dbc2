//! # Raw SQS Connector
//!
//! A consume-only job queue over AWS SQS. Messages whose bodies are plain JSON
//! objects are popped one at a time and wrapped as jobs of a configured class,
//! ready for a worker loop to dispatch.
//!
//! ## Features
//!
//! - Single-message polling with tokio and the AWS SDK
//! - Job descriptors built from raw JSON bodies
//! - Optional per-minute rate limit, fixed or computed on every poll
//! - Worker loop with trait-based dispatchers and shared resources
//! - Delete on success, release on failure, graceful shutdown
//! - `push`, `push_raw` and `later` are rejected
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use raw_sqs_connector::{config::{ConnectorConfig, connect}, worker::start_worker};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConnectorConfig::from_env()?;
//!     let queue = connect(&config).await?;
//!     let shared_data = "shared state".to_string();
//!
//!     start_worker(Arc::new(queue), shared_data, |command, shared| async move {
//!         println!("Processing {} with shared: {}", command.class, shared);
//!         Ok(())
//!     })
//!     .await;
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod errors;
pub mod job;
pub mod queue;
pub mod rate_limit;
pub mod worker;
