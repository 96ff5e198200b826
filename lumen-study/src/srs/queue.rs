//! Review queue: which cards of a deck are due

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ReviewRecord;

/// A card together with its scheduling state, if it has one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardSchedule {
    pub card_id: String,
    #[serde(default)]
    pub review: Option<ReviewRecord>,
}

/// Cards due for review at `now`
///
/// Reviewed cards whose due date has passed come first, most overdue
/// first. Never-reviewed cards follow in deck order. The result is cut to
/// `limit` entries when one is given.
pub fn due_cards(
    cards: &[CardSchedule],
    now: DateTime<Utc>,
    limit: Option<usize>,
) -> Vec<&CardSchedule> {
    let mut overdue: Vec<&CardSchedule> = cards
        .iter()
        .filter(|card| card.review.as_ref().is_some_and(|r| r.is_due(now)))
        .collect();
    // Stable sort keeps deck order between cards due at the same instant
    overdue.sort_by_key(|card| card.review.as_ref().map(|r| r.due_date));

    let fresh = cards.iter().filter(|card| card.review.is_none());

    overdue
        .into_iter()
        .chain(fresh)
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}
