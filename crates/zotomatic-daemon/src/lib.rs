mod engine;
mod error;
mod processor;
mod queue;
mod workflow;

pub use engine::{Engine, EngineConfig, RunMode, RunSummary};
pub use error::{DaemonError, WorkflowError};
pub use processor::{PendingProcessor, ResolvedHandler, TickOutcome};
pub use queue::PendingQueue;
pub use workflow::{NoteWorkflow, WorkflowConfig, WorkflowOutcome};

/// Current unix timestamp in seconds, the clock the pending queue's
/// `next_attempt_at`/`enqueued_at` columns and the LLM usage ledger are
/// keyed against.
pub(crate) fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
