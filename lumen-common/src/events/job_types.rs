//! Embedding job type definitions
//!
//! Supporting types for embedding progress tracking, shared between the
//! tracker and anything that renders its events.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a tracked embedding job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JobStatus {
    /// No job has been started yet
    #[default]
    Idle,
    /// Job started, status endpoint being polled
    Running,
    /// Job reported done (or forced done by the guard timeout)
    Completed,
    /// Caller gave up on the job
    Failed,
}

impl JobStatus {
    /// Completed and Failed end a tracking cycle
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Why a job was reported as completed
///
/// The tracker state is `Completed` in all three cases; only events carry
/// the distinction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionReason {
    /// Status endpoint reported materialized chunks
    Signal,
    /// Maximum duration elapsed without a signal
    GuardTimeout,
    /// Caller invoked `complete()` directly
    Manual,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(!JobStatus::Idle.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_default_status_is_idle() {
        assert_eq!(JobStatus::default(), JobStatus::Idle);
    }
}
