//! Spaced-repetition scheduling for flashcards
//!
//! SM-2 family scheduler: a recall-quality score (0 = blackout,
//! 5 = perfect recall) moves a card's review interval and ease factor.
//! [`schedule`] is pure; persisting the returned [`ReviewRecord`] is the
//! caller's job.

mod queue;

pub use queue::{due_cards, CardSchedule};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Ease factor assigned to a card on its first review
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

/// Lower bound for the ease factor
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Lowest quality score that counts as a successful recall
pub const PASSING_QUALITY: i32 = 3;

/// Scheduling state of one flashcard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRecord {
    /// Multiplicative difficulty factor, never below [`MIN_EASE_FACTOR`]
    pub ease_factor: f64,
    /// Days until the next review
    pub interval: u32,
    /// Consecutive successful recalls
    pub correct_streak: u32,
    /// Total reviews performed
    pub review_count: u32,
    pub last_reviewed: DateTime<Utc>,
    /// `last_reviewed + interval` days
    pub due_date: DateTime<Utc>,
}

impl ReviewRecord {
    /// State of a card that has never been reviewed
    pub fn new_card(now: DateTime<Utc>) -> Self {
        Self {
            ease_factor: DEFAULT_EASE_FACTOR,
            interval: 1,
            correct_streak: 0,
            review_count: 0,
            last_reviewed: now,
            due_date: now,
        }
    }

    /// True once the due date has been reached
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due_date <= now
    }
}

/// Compute the next review state for a card
///
/// `quality` is not validated. Scores outside 0..=5 produce degenerate but
/// well-defined records; callers clamp if they need to.
pub fn schedule(existing: Option<&ReviewRecord>, quality: i32, now: DateTime<Utc>) -> ReviewRecord {
    let mut record = existing
        .cloned()
        .unwrap_or_else(|| ReviewRecord::new_card(now));

    if quality < PASSING_QUALITY {
        record.interval = 1;
        record.correct_streak = 0;
    } else {
        record.correct_streak = record.correct_streak.saturating_add(1);
        // Interval grows by the ease factor in effect before this review
        let grown = (f64::from(record.interval) * record.ease_factor).round();
        record.interval = (grown as u32).max(1);
        record.ease_factor = next_ease_factor(record.ease_factor, quality);
    }

    record.review_count = record.review_count.saturating_add(1);
    record.last_reviewed = now;
    record.due_date = due_after(now, record.interval);
    record
}

/// SM-2 ease adjustment, floored at [`MIN_EASE_FACTOR`]
pub fn next_ease_factor(ease_factor: f64, quality: i32) -> f64 {
    let miss = f64::from(5 - quality);
    let delta = 0.1 - miss * (0.08 + miss * 0.02);
    (ease_factor + delta).max(MIN_EASE_FACTOR)
}

fn due_after(now: DateTime<Utc>, interval_days: u32) -> DateTime<Utc> {
    now.checked_add_signed(Duration::days(i64::from(interval_days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
