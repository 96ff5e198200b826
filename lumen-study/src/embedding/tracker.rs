//! Embedding job tracker
//!
//! One job at a time. `start` arms two background tasks for the job: a
//! poll loop that queries the [`StatusSource`] every `poll_interval`, and
//! a guard that forces completion after `max_duration`. Every transition
//! out of Running (`complete`, `fail`, a fresh `start`) cancels both tasks
//! first, and each task carries the generation it was spawned for, so a
//! status query that resolves after its job ended is discarded.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use lumen_common::config::EmbeddingConfig;
use lumen_common::events::{CompletionReason, EventBus, JobStatus, LumenEvent};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::progress::{advance_progress, JobProgressState};
use super::status_client::StatusSource;

/// Shortest accepted poll interval
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Tracker timing
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// Delay between status polls; the first poll happens one interval after start.
    /// Raised to [`MIN_POLL_INTERVAL`] when shorter.
    pub poll_interval: Duration,
    /// A job still running after this long is forced to Completed
    pub max_duration: Duration,
    /// Upper bound on a single status query
    pub query_timeout: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            max_duration: Duration::from_secs(10 * 60),
            query_timeout: Duration::from_secs(2),
        }
    }
}

impl From<&EmbeddingConfig> for TrackerConfig {
    fn from(config: &EmbeddingConfig) -> Self {
        let poll_interval = config.poll_interval();
        Self {
            poll_interval,
            max_duration: config.max_duration(),
            // A query must never outlive the tick it belongs to
            query_timeout: config.request_timeout().min(poll_interval),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Completed(CompletionReason),
    Failed,
}

struct ActiveJob {
    generation: u64,
    job_id: String,
    poll_task: JoinHandle<()>,
    guard_task: JoinHandle<()>,
}

impl ActiveJob {
    fn cancel(self) {
        self.poll_task.abort();
        self.guard_task.abort();
    }
}

struct TrackerInner {
    source: Arc<dyn StatusSource>,
    config: TrackerConfig,
    state_tx: watch::Sender<JobProgressState>,
    active: Mutex<Option<ActiveJob>>,
    next_generation: AtomicU64,
    query_in_flight: AtomicBool,
    event_bus: Option<EventBus>,
}

/// Clears the in-flight flag when a status query finishes or is aborted
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl TrackerInner {
    fn emit(&self, event: LumenEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit_lossy(event);
        }
    }

    fn current_job(&self, generation: u64) -> Option<String> {
        self.active
            .lock()
            .as_ref()
            .filter(|job| job.generation == generation)
            .map(|job| job.job_id.clone())
    }

    fn current_generation(&self) -> Option<u64> {
        self.active.lock().as_ref().map(|job| job.generation)
    }

    /// One poll for `generation`; returns false once that job is over
    async fn poll_generation(&self, generation: u64) -> bool {
        let Some(job_id) = self.current_job(generation) else {
            return false;
        };

        if self.query_in_flight.swap(true, Ordering::AcqRel) {
            debug!(job_id = %job_id, "Previous status query still in flight, skipping tick");
            return true;
        }
        let chunks = {
            let _in_flight = InFlight(&self.query_in_flight);
            tokio::time::timeout(self.config.query_timeout, self.source.total_chunks(&job_id)).await
        };

        let ready = match chunks {
            Ok(Ok(total_chunks)) if total_chunks > 0 => {
                info!(job_id = %job_id, total_chunks, "Embedding chunks materialized");
                true
            }
            Ok(Ok(_)) => {
                debug!(job_id = %job_id, "No embedding chunks yet");
                false
            }
            Ok(Err(e)) => {
                warn!(job_id = %job_id, "Embedding status query failed: {}", e);
                false
            }
            Err(_) => {
                warn!(
                    job_id = %job_id,
                    "Embedding status query timed out after {:?}",
                    self.config.query_timeout
                );
                false
            }
        };

        if ready {
            self.finish(Some(generation), Outcome::Completed(CompletionReason::Signal));
            return false;
        }

        self.advance(generation, &job_id)
    }

    fn advance(&self, generation: u64, job_id: &str) -> bool {
        let active = self.active.lock();
        if active.as_ref().map(|job| job.generation) != Some(generation) {
            return false;
        }

        let mut changed = None;
        self.state_tx.send_if_modified(|state| {
            let next = advance_progress(state.progress);
            if next == state.progress {
                return false;
            }
            state.progress = next;
            changed = Some(next);
            true
        });
        drop(active);

        if let Some(progress) = changed {
            debug!(job_id, progress, "Embedding progress estimate advanced");
            self.emit(LumenEvent::EmbeddingProgress {
                job_id: job_id.to_string(),
                progress,
                timestamp: lumen_common::time::now(),
            });
        }
        true
    }

    /// Leave Running for `outcome`
    ///
    /// Only a running job can finish. With `expected` set, only acts if that
    /// generation is still the active job. Returns whether the transition
    /// happened.
    fn finish(&self, expected: Option<u64>, outcome: Outcome) -> bool {
        let mut active = self.active.lock();
        let is_target = match (active.as_ref(), expected) {
            (None, _) => false,
            (Some(job), Some(generation)) => job.generation == generation,
            (Some(_), None) => true,
        };
        if !is_target {
            debug!(?outcome, "Embedding tracker not running this job, ignoring transition");
            return false;
        }
        let Some(job) = active.take() else {
            return false;
        };

        let job_id = job.job_id.clone();
        job.cancel();

        let mut final_progress = 0.0;
        self.state_tx.send_modify(|state| {
            state.job_id = None;
            match outcome {
                Outcome::Completed(_) => {
                    state.status = JobStatus::Completed;
                    state.progress = 100.0;
                }
                Outcome::Failed => state.status = JobStatus::Failed,
            }
            final_progress = state.progress;
        });
        drop(active);

        let timestamp = lumen_common::time::now();
        match outcome {
            Outcome::Completed(reason) => {
                info!(job_id = %job_id, ?reason, "Embedding job completed");
                self.emit(LumenEvent::EmbeddingCompleted {
                    job_id,
                    reason,
                    timestamp,
                });
            }
            Outcome::Failed => {
                info!(job_id = %job_id, progress = final_progress, "Embedding job failed");
                self.emit(LumenEvent::EmbeddingFailed {
                    job_id,
                    progress: final_progress,
                    timestamp,
                });
            }
        }
        true
    }
}

impl Drop for TrackerInner {
    fn drop(&mut self) {
        if let Some(job) = self.active.get_mut().take() {
            job.cancel();
        }
    }
}

async fn poll_loop(inner: Weak<TrackerInner>, generation: u64, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        if !inner.poll_generation(generation).await {
            break;
        }
    }
}

async fn guard_timeout(inner: Weak<TrackerInner>, generation: u64, max_duration: Duration) {
    tokio::time::sleep(max_duration).await;
    let Some(inner) = inner.upgrade() else {
        return;
    };
    if let Some(job_id) = inner.current_job(generation) {
        warn!(
            job_id = %job_id,
            "No embedding result after {:?}, forcing completion",
            max_duration
        );
        inner.finish(Some(generation), Outcome::Completed(CompletionReason::GuardTimeout));
    }
}

/// Tracks one server-side embedding job at a time
///
/// State is observable through [`subscribe`](Self::subscribe) (latest value
/// semantics) and, when built with an [`EventBus`], as [`LumenEvent`]s.
/// Cloning yields another handle to the same tracker; background tasks stop
/// when the last handle is dropped.
///
/// `start` spawns Tokio tasks and must be called inside a Tokio runtime.
#[derive(Clone)]
pub struct EmbeddingTracker {
    inner: Arc<TrackerInner>,
}

impl EmbeddingTracker {
    pub fn new(source: Arc<dyn StatusSource>, config: TrackerConfig) -> Self {
        Self::build(source, config, None)
    }

    /// Tracker that also publishes lifecycle events on `event_bus`
    pub fn with_event_bus(
        source: Arc<dyn StatusSource>,
        config: TrackerConfig,
        event_bus: EventBus,
    ) -> Self {
        Self::build(source, config, Some(event_bus))
    }

    fn build(
        source: Arc<dyn StatusSource>,
        mut config: TrackerConfig,
        event_bus: Option<EventBus>,
    ) -> Self {
        if config.poll_interval < MIN_POLL_INTERVAL {
            warn!(
                "Poll interval {:?} too short, using {:?}",
                config.poll_interval, MIN_POLL_INTERVAL
            );
            config.poll_interval = MIN_POLL_INTERVAL;
        }

        let (state_tx, _) = watch::channel(JobProgressState::idle());
        Self {
            inner: Arc::new(TrackerInner {
                source,
                config,
                state_tx,
                active: Mutex::new(None),
                next_generation: AtomicU64::new(0),
                query_in_flight: AtomicBool::new(false),
                event_bus,
            }),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.inner.config
    }

    /// Begin tracking `job_id`, replacing whatever was tracked before
    pub fn start(&self, job_id: impl Into<String>) {
        let job_id = job_id.into();
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed) + 1;

        let mut active = self.inner.active.lock();
        if let Some(previous) = active.take() {
            debug!(previous = %previous.job_id, "Cancelling previous embedding poll loop");
            previous.cancel();
        }

        self.inner
            .state_tx
            .send_replace(JobProgressState::running(job_id.clone()));

        let weak = Arc::downgrade(&self.inner);
        let config = &self.inner.config;
        let poll_task = tokio::spawn(poll_loop(weak.clone(), generation, config.poll_interval));
        let guard_task = tokio::spawn(guard_timeout(weak, generation, config.max_duration));
        *active = Some(ActiveJob {
            generation,
            job_id: job_id.clone(),
            poll_task,
            guard_task,
        });
        drop(active);

        info!(
            job_id = %job_id,
            "Tracking embedding job (poll every {:?}, give up after {:?})",
            self.inner.config.poll_interval,
            self.inner.config.max_duration
        );
        self.inner.emit(LumenEvent::EmbeddingStarted {
            job_id,
            timestamp: lumen_common::time::now(),
        });
    }

    /// Run one poll for the running job now
    ///
    /// The background loop calls this on every tick; calling it by hand is
    /// harmless. Does nothing when no job is running or when another
    /// status query is still in flight.
    pub async fn poll(&self) {
        match self.inner.current_generation() {
            Some(generation) => {
                self.inner.poll_generation(generation).await;
            }
            None => debug!("Embedding poll ignored, no job running"),
        }
    }

    /// Stop polling and report the running job as done
    ///
    /// Ignored unless a job is running.
    pub fn complete(&self) {
        self.inner
            .finish(None, Outcome::Completed(CompletionReason::Manual));
    }

    /// Stop polling and report the running job as failed; progress is kept
    ///
    /// Ignored unless a job is running.
    pub fn fail(&self) {
        self.inner.finish(None, Outcome::Failed);
    }

    /// Current state snapshot
    pub fn state(&self) -> JobProgressState {
        self.inner.state_tx.borrow().clone()
    }

    pub fn status(&self) -> JobStatus {
        self.inner.state_tx.borrow().status
    }

    pub fn progress(&self) -> f64 {
        self.inner.state_tx.borrow().progress
    }

    pub fn is_running(&self) -> bool {
        self.status() == JobStatus::Running
    }

    /// Receiver that always holds the latest state
    pub fn subscribe(&self) -> watch::Receiver<JobProgressState> {
        self.inner.state_tx.subscribe()
    }
}
