//! Mindmap reuse across a sequence of document selections

use lumen_common::time::{Clock, SystemClock};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::key::needs_refresh;
use super::result_cache::ResultCache;

/// One change of the user's document selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionStep {
    pub document_ids: Vec<String>,
    /// Mindmap generated for this selection, if the caller built one
    #[serde(default)]
    pub generated: Option<String>,
    /// Documents edited since the previous step
    #[serde(default)]
    pub changed: Vec<String>,
}

/// Where the mindmap for a step came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Selection unchanged, the mindmap on screen stays
    Reused(String),
    /// Found in the result cache
    Cached(String),
    /// Generated by the caller and stored
    Stored,
    /// Nothing cached and nothing generated
    Missing,
}

/// Tracks the mindmap currently shown and consults a shared cache when
/// the selection changes
pub struct MindmapSession<'a, C = SystemClock> {
    cache: &'a ResultCache<C>,
    previous: Vec<String>,
    current: Option<String>,
}

impl<'a, C: Clock> MindmapSession<'a, C> {
    pub fn new(cache: &'a ResultCache<C>) -> Self {
        Self {
            cache,
            previous: Vec::new(),
            current: None,
        }
    }

    /// Mindmap for the latest selection, if any
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn apply(&mut self, step: &SelectionStep) -> StepOutcome {
        for document_id in &step.changed {
            self.cache.invalidate_document(document_id);
        }
        let shown_is_stale = step.changed.iter().any(|id| self.previous.contains(id));

        if !shown_is_stale && !needs_refresh(&self.previous, &step.document_ids) {
            if let Some(current) = &self.current {
                debug!("Selection unchanged, keeping mindmap");
                return StepOutcome::Reused(current.clone());
            }
        }

        self.previous = step.document_ids.clone();

        if let Some(payload) = self.cache.get(&step.document_ids) {
            self.current = Some(payload.clone());
            return StepOutcome::Cached(payload);
        }

        match step.generated.as_deref() {
            Some(payload) if !payload.is_empty() && !step.document_ids.is_empty() => {
                self.cache.put(&step.document_ids, payload);
                self.current = Some(payload.to_string());
                StepOutcome::Stored
            }
            _ => {
                self.current = None;
                StepOutcome::Missing
            }
        }
    }
}
