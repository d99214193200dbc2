use crate::errors::RawSqsError;
use crate::job::JobCommand;
use async_trait::async_trait;
use std::future::Future;

/// Trait for handing popped jobs to application code.
///
/// The worker calls `dispatch` once per job; `Ok` deletes the job from the
/// queue and `Err` releases it for another attempt.
#[async_trait]
pub trait JobDispatcher: Send + Sync {
    /// Runs the job described by `command`.
    ///
    /// # Arguments
    ///
    /// * `command` - The job class and the decoded message body
    async fn dispatch(&self, command: JobCommand) -> Result<(), RawSqsError>;
}

#[async_trait]
impl<F, Fut, TShared> JobDispatcher for JobHandlerFn<F, Fut, TShared>
where
    F: Fn(JobCommand, TShared) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = Result<(), RawSqsError>> + Send + 'static,
    TShared: Send + Sync + Clone + 'static,
{
    async fn dispatch(&self, command: JobCommand) -> Result<(), RawSqsError> {
        (self.handler_fn)(command, self.shared_resources.clone()).await
    }
}

/// [`JobDispatcher`] backed by a plain async function.
///
/// # Type Parameters
///
/// * `HFn` - The job handler function type
/// * `Fut` - The future returned by the handler function
/// * `TShared` - The type of shared resources passed to the handler
pub struct JobHandlerFn<HFn, Fut, TShared>
where
    HFn: Fn(JobCommand, TShared) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = Result<(), RawSqsError>> + Send + 'static,
    TShared: Send + Sync + Clone + 'static,
{
    handler_fn: HFn,
    shared_resources: TShared,
}

impl<HFn, Fut, TShared> JobHandlerFn<HFn, Fut, TShared>
where
    HFn: Fn(JobCommand, TShared) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = Result<(), RawSqsError>> + Send + 'static,
    TShared: Send + Sync + Clone + 'static,
{
    /// Creates a dispatcher calling `handler_fn` with a clone of
    /// `shared_resources` for every job.
    pub fn new(handler_fn: HFn, shared_resources: TShared) -> Self {
        JobHandlerFn {
            handler_fn,
            shared_resources,
        }
    }
}
