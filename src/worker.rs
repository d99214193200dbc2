use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{oneshot, watch};

use crate::errors::RawSqsError;
use crate::job::{Job, JobCommand};
use crate::queue::Queue;

mod config;
mod functions;

pub use config::WorkerConfig;
pub use functions::{JobDispatcher, JobHandlerFn};

/// What a single [`run_once`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkOutcome {
    /// No job was available, or the poll was rate limited.
    Idle,
    /// The handler succeeded and the job was deleted.
    Processed,
    /// The handler failed and the job was released.
    Failed,
    /// The handler failed on the job's last allowed attempt and the job was deleted.
    Discarded,
}

struct Registration {
    queue_name: Option<String>,
    dispatcher: Arc<dyn JobDispatcher>,
    config: WorkerConfig,
}

/// Polls a [`Queue`] and hands every job to a registered dispatcher.
pub struct Worker<Q>
where
    Q: Queue + 'static,
{
    queue: Arc<Q>,
    registrations: Vec<Registration>,
}

impl<Q> Worker<Q>
where
    Q: Queue + 'static,
{
    pub fn new(queue: Arc<Q>) -> Self {
        Worker {
            queue,
            registrations: Vec::new(),
        }
    }

    /// Registers `handler` for jobs popped from `queue_name` (the queue's
    /// default when `None`).
    ///
    /// # Arguments
    ///
    /// * `queue_name` - Queue to poll
    /// * `handler` - Async function called with each job's command and a clone of `shared_resources`
    /// * `shared_resources` - Resources shared between handler calls
    /// * `config` - Loop settings; defaults when `None`
    pub fn add_handler_fn<F, Fut, TShared>(
        &mut self,
        queue_name: Option<&str>,
        handler: F,
        shared_resources: TShared,
        config: Option<WorkerConfig>,
    ) where
        F: Fn(JobCommand, TShared) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Result<(), RawSqsError>> + Send + 'static,
        TShared: Send + Sync + Clone + 'static,
    {
        self.add_dispatcher(
            queue_name,
            Arc::new(JobHandlerFn::new(handler, shared_resources)),
            config,
        );
    }

    pub fn add_dispatcher(
        &mut self,
        queue_name: Option<&str>,
        dispatcher: Arc<dyn JobDispatcher>,
        config: Option<WorkerConfig>,
    ) {
        self.registrations.push(Registration {
            queue_name: queue_name.map(str::to_string),
            dispatcher,
            config: config.unwrap_or_default(),
        });
    }

    /// Runs every registered handler until the process exits.
    pub async fn start_all_handlers(self) {
        let (_stop_tx, stop_rx) = watch::channel(false);
        self.run_until(stop_rx).await;
    }

    /// Runs every registered handler until `shutdown` fires (or its sender is
    /// dropped). Jobs already being handled are finished first.
    pub async fn start_all_handlers_with_shutdown(self, shutdown: oneshot::Receiver<()>) {
        let (stop_tx, stop_rx) = watch::channel(false);
        tokio::spawn(async move {
            let _ = shutdown.await;
            tracing::info!("shutdown requested, stopping workers");
            let _ = stop_tx.send(true);
        });
        self.run_until(stop_rx).await;
    }

    async fn run_until(self, stop_rx: watch::Receiver<bool>) {
        let Worker {
            queue,
            registrations,
        } = self;

        let handles = registrations.into_iter().map(|registration| {
            let queue = queue.clone();
            let stop_rx = stop_rx.clone();
            tokio::spawn(run_loop(queue, registration, stop_rx))
        });

        for result in join_all(handles).await {
            if let Err(e) = result {
                tracing::error!(error = %e, "worker task ended abnormally");
            }
        }
    }
}

async fn run_loop<Q>(queue: Arc<Q>, registration: Registration, mut stop_rx: watch::Receiver<bool>)
where
    Q: Queue + 'static,
{
    let Registration {
        queue_name,
        dispatcher,
        config,
    } = registration;

    while !*stop_rx.borrow() {
        let outcome = run_once(
            queue.as_ref(),
            queue_name.as_deref(),
            dispatcher.as_ref(),
            &config,
        )
        .await;

        let pause = match outcome {
            Ok(WorkOutcome::Idle | WorkOutcome::Failed) => true,
            Ok(WorkOutcome::Processed | WorkOutcome::Discarded) => false,
            Err(e) => {
                tracing::error!(queue = ?queue_name, error = %e, "worker iteration failed");
                true
            }
        };

        if pause {
            tokio::select! {
                _ = tokio::time::sleep(config.sleep_when_empty) => {}
                _ = stop_rx.changed() => {}
            }
        }
    }
}

/// Pops one job from `queue_name` and dispatches it.
///
/// A successful job is deleted; a failed one is released after
/// `config.release_delay`, or deleted once it has been delivered
/// `config.max_attempts` times. Errors from popping or deleting are returned;
/// handler failures are not.
pub async fn run_once<Q>(
    queue: &Q,
    queue_name: Option<&str>,
    dispatcher: &dyn JobDispatcher,
    config: &WorkerConfig,
) -> Result<WorkOutcome, RawSqsError>
where
    Q: Queue + ?Sized,
{
    let Some(mut job) = queue.pop(queue_name).await? else {
        return Ok(WorkOutcome::Idle);
    };

    let result = match job.command() {
        Ok(command) => dispatcher.dispatch(command).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => {
            job.delete().await?;
            tracing::debug!(job_id = job.job_id().unwrap_or_default(), "job processed");
            Ok(WorkOutcome::Processed)
        }
        Err(e) if config.max_attempts > 0 && job.attempts() >= config.max_attempts => {
            tracing::error!(
                job_id = job.job_id().unwrap_or_default(),
                attempts = job.attempts(),
                body = %job.payload().data.command,
                error = %e,
                "job failed on its last attempt, discarding"
            );
            job.delete().await?;
            Ok(WorkOutcome::Discarded)
        }
        Err(e) => {
            tracing::warn!(
                job_id = job.job_id().unwrap_or_default(),
                attempts = job.attempts(),
                error = %e,
                "job failed, releasing"
            );
            if let Err(release_err) = job.release(config.release_delay).await {
                tracing::error!(error = %release_err, "failed to release job");
            }
            Ok(WorkOutcome::Failed)
        }
    }
}

/// Runs `handler` against the default queue of `queue` until the process exits.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use raw_sqs_connector::{client::create_sqs_client_from_env, queue::RawSqsQueue, worker::start_worker};
///
/// #[tokio::main]
/// async fn main() {
///     let client = create_sqs_client_from_env(None).await;
///     let mut queue = RawSqsQueue::new(client, "imports", "https://sqs.eu-west-1.amazonaws.com/123456789012");
///     queue.set_job_class("ImportJob").set_rate_limit(60u32);
///
///     start_worker(Arc::new(queue), "shared state".to_string(), |command, shared| async move {
///         println!("{} {:?} with {}", command.class, command.data, shared);
///         Ok(())
///     })
///     .await;
/// }
/// ```
pub async fn start_worker<Q, F, Fut, TShared>(queue: Arc<Q>, shared_resources: TShared, handler: F)
where
    Q: Queue + 'static,
    F: Fn(JobCommand, TShared) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = Result<(), RawSqsError>> + Send + 'static,
    TShared: Send + Sync + Clone + 'static,
{
    let mut worker = Worker::new(queue);
    worker.add_handler_fn(None, handler, shared_resources, None);
    worker.start_all_handlers().await;
}
