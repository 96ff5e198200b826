//! Test Helper Utilities
//!
//! Shared fakes for testing lumen-study

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lumen_study::embedding::{StatusError, StatusSource};
use parking_lot::Mutex;

/// Status source whose answers are controlled by the test
#[derive(Default)]
pub struct FakeStatusSource {
    chunks: AtomicI64,
    failing: AtomicBool,
    calls: AtomicUsize,
    delay: Mutex<Option<Duration>>,
    queried: Mutex<Vec<String>>,
}

impl FakeStatusSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Chunk count reported from now on
    pub fn set_chunks(&self, chunks: i64) {
        self.chunks.store(chunks, Ordering::SeqCst);
    }

    /// Answer every query with a network error
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Sleep this long before answering
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queried(&self) -> Vec<String> {
        self.queried.lock().clone()
    }
}

#[async_trait]
impl StatusSource for FakeStatusSource {
    async fn total_chunks(&self, job_id: &str) -> Result<i64, StatusError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queried.lock().push(job_id.to_string());

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(StatusError::NetworkError("connection refused".to_string()));
        }
        Ok(self.chunks.load(Ordering::SeqCst))
    }
}
