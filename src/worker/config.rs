use std::time::Duration;

/// Configuration for a worker loop.
///
/// # Fields
/// - `sleep_when_empty`: How long to wait before polling again after an empty, rate-limited or failed poll.
/// - `release_delay`: How long a failed job stays invisible before it can be received again.
/// - `max_attempts`: Deliveries after which a failing job is deleted instead of released.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Pause after a poll that returned no job, or whose job failed.
    pub sleep_when_empty: Duration,

    /// Visibility delay applied when releasing a failed job.
    pub release_delay: Duration,

    /// A job that fails on its `max_attempts`-th delivery is logged and
    /// deleted. `0` never discards.
    pub max_attempts: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        WorkerConfig {
            sleep_when_empty: Duration::from_secs(3),
            release_delay: Duration::from_secs(30),
            max_attempts: 5,
        }
    }
}
