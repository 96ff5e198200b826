//! Observable tracker state and the progress heuristic

use lumen_common::events::JobStatus;
use serde::{Deserialize, Serialize};

/// Highest progress reachable by polling alone
pub const PROGRESS_CEILING: f64 = 90.0;

/// Snapshot of the tracked job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobProgressState {
    pub status: JobStatus,
    /// Estimated percentage, 0-100. Exactly 100 only when Completed.
    pub progress: f64,
    /// Set only while Running
    pub job_id: Option<String>,
}

impl JobProgressState {
    pub fn idle() -> Self {
        Self {
            status: JobStatus::Idle,
            progress: 0.0,
            job_id: None,
        }
    }

    pub(crate) fn running(job_id: String) -> Self {
        Self {
            status: JobStatus::Running,
            progress: 0.0,
            job_id: Some(job_id),
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == JobStatus::Running
    }
}

impl Default for JobProgressState {
    fn default() -> Self {
        Self::idle()
    }
}

/// Next progress estimate after a poll that saw no result
///
/// Time-based, not tied to real work: fast early, slowing down, and
/// flat from [`PROGRESS_CEILING`] on.
pub fn advance_progress(progress: f64) -> f64 {
    if progress < 50.0 {
        progress + 5.0
    } else if progress < 80.0 {
        progress + 2.0
    } else if progress < PROGRESS_CEILING {
        progress + 0.5
    } else {
        progress
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_by_band() {
        assert_eq!(advance_progress(0.0), 5.0);
        assert_eq!(advance_progress(45.0), 50.0);
        assert_eq!(advance_progress(50.0), 52.0);
        assert_eq!(advance_progress(78.0), 80.0);
        assert_eq!(advance_progress(80.0), 80.5);
        assert_eq!(advance_progress(89.5), 90.0);
        assert_eq!(advance_progress(90.0), 90.0);
    }

    #[test]
    fn test_polling_alone_never_reaches_100() {
        let mut progress = 0.0;
        for _ in 0..1_000 {
            progress = advance_progress(progress);
        }
        assert_eq!(progress, PROGRESS_CEILING);
    }

    #[test]
    fn test_ceiling_reached_after_45_polls() {
        // 10 polls to 50, 15 to 80, 20 to 90
        let mut progress = 0.0;
        for _ in 0..44 {
            progress = advance_progress(progress);
        }
        assert!(progress < PROGRESS_CEILING);
        assert_eq!(advance_progress(progress), PROGRESS_CEILING);
    }

    #[test]
    fn test_idle_state() {
        let state = JobProgressState::default();
        assert_eq!(state.status, JobStatus::Idle);
        assert_eq!(state.progress, 0.0);
        assert!(state.job_id.is_none());
        assert!(!state.is_running());
    }
}
