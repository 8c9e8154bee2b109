//! Status polling until a job reaches a terminal state.
//!
//! ComfyUI offers no push notification for this client, so completion
//! is detected by time-driven polling: one warm-up delay before the
//! first query (the server may not have indexed the job yet), then a
//! fixed interval between queries, bounded by an attempt budget of one
//! query per second for the configured number of minutes.
//!
//! The transition rule lives in [`evaluate`], a pure function over one
//! history lookup, so the state machine is testable without a server.

use std::time::Duration;

use crate::api::ComfyUiApi;
use crate::error::GenerationError;
use crate::history::HistoryEntry;

/// Status queries per minute of configured timeout (one per second).
pub const QUERIES_PER_MINUTE: u64 = 60;

/// Tunable delays for the poll loop.
pub struct PollConfig {
    /// Delay before the first status query.
    pub initial_delay: Duration,
    /// Delay between subsequent queries.
    pub poll_interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Total number of status queries allowed for the given timeout.
pub fn attempt_budget(timeout_minutes: u64) -> u64 {
    timeout_minutes.saturating_mul(QUERIES_PER_MINUTE)
}

/// Outcome of evaluating one status lookup.
#[derive(Debug)]
pub enum PollDecision {
    /// No terminal state yet; keep polling.
    Wait,
    /// The job completed with an error status.
    Failed(String),
    /// The job completed; here is its record.
    Complete(Box<HistoryEntry>),
}

/// The poll transition rule.
///
/// - no record for the id yet: wait (transient; the server may not
///   have indexed the job)
/// - record without a status block: wait
/// - `completed == false`: wait
/// - `completed == true` with label `error`: failed
/// - `completed == true` with any other label: complete
pub fn evaluate(entry: Option<HistoryEntry>) -> PollDecision {
    let Some(entry) = entry else {
        return PollDecision::Wait;
    };
    let Some(status) = &entry.status else {
        return PollDecision::Wait;
    };
    if !status.completed {
        return PollDecision::Wait;
    }
    if status.status_str.as_deref() == Some("error") {
        let label = status.status_str.clone().unwrap_or_default();
        return PollDecision::Failed(format!("job finished with status '{label}'"));
    }
    PollDecision::Complete(Box::new(entry))
}

/// Poll `/history/{job_id}` until the job completes, fails, or the
/// attempt budget runs out.
///
/// Transient HTTP errors during a query are logged and consume the
/// attempt; this loop waits for completion, it does not retry errors.
pub async fn wait_for_completion(
    api: &ComfyUiApi,
    job_id: &str,
    timeout_minutes: u64,
    config: &PollConfig,
) -> Result<HistoryEntry, GenerationError> {
    let budget = attempt_budget(timeout_minutes);
    tracing::debug!(job_id = %job_id, budget, "Waiting for job completion");

    tokio::time::sleep(config.initial_delay).await;

    for attempt in 0..budget {
        if attempt > 0 {
            tokio::time::sleep(config.poll_interval).await;
        }

        match api.get_history(job_id).await {
            Ok(mut records) => match evaluate(records.remove(job_id)) {
                PollDecision::Wait => {}
                PollDecision::Failed(detail) => {
                    tracing::warn!(job_id = %job_id, attempt, %detail, "Generation failed");
                    return Err(GenerationError::GenerationFailed { detail });
                }
                PollDecision::Complete(entry) => {
                    tracing::info!(job_id = %job_id, attempt, "Generation completed");
                    return Ok(*entry);
                }
            },
            Err(e) => {
                tracing::warn!(job_id = %job_id, attempt, error = %e, "Status query failed");
            }
        }
    }

    Err(GenerationError::GenerationTimeout {
        minutes: timeout_minutes,
    })
}
