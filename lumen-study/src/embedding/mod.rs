//! Embedding progress tracking
//!
//! Uploading a document kicks off a server-side embedding job that can run
//! for minutes. The server exposes no progress, only the number of chunks
//! materialized so far. [`EmbeddingTracker`] polls that count through a
//! [`StatusSource`], estimates progress from elapsed polls, and reports
//! completion once chunks appear or a guard timeout expires.

mod progress;
mod status_client;
mod tracker;

pub use lumen_common::events::{CompletionReason, JobStatus};
pub use progress::{advance_progress, JobProgressState, PROGRESS_CEILING};
pub use status_client::{EmbeddingStatusClient, EmbeddingStatusResponse, StatusError, StatusSource};
pub use tracker::{EmbeddingTracker, TrackerConfig, MIN_POLL_INTERVAL};
