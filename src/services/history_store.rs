// Analysis History
// Bounded, newest-first list of past results kept in the local store

use std::sync::Arc;
use tracing::{info, warn};

use super::config_store::DEFAULT_HISTORY_LIMIT;
use super::local_store::{LocalStore, StoreError};
use crate::models::{AnalysisRequest, DetectionResult, HistoryItem};

const HISTORY_KEY: &str = "analysis_history";
const SNIPPET_CHARS: usize = 100;
const IMAGE_SNIPPET: &str = "Image Analysis Scan";

/// First 100 characters of the text with `...` when cut, or a fixed label
/// for image-only input.
pub fn make_snippet(text: Option<&str>) -> String {
    match text {
        Some(t) if !t.is_empty() => {
            let mut out: String = t.chars().take(SNIPPET_CHARS).collect();
            if t.chars().count() > SNIPPET_CHARS {
                out.push_str("...");
            }
            out
        }
        _ => IMAGE_SNIPPET.to_string(),
    }
}

pub struct HistoryStore {
    store: Arc<LocalStore>,
    limit: usize,
}

impl HistoryStore {
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self::with_limit(store, DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_limit(store: Arc<LocalStore>, limit: usize) -> Self {
        Self {
            store,
            limit: limit.max(1),
        }
    }

    /// Newest first. Unreadable history is logged and treated as empty.
    pub fn list(&self) -> Result<Vec<HistoryItem>, StoreError> {
        match self.store.get::<Vec<HistoryItem>>(HISTORY_KEY) {
            Ok(items) => Ok(items.unwrap_or_default()),
            Err(StoreError::Parse(e)) => {
                warn!("[HISTORY] failed to load history, starting empty: {}", e);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    pub fn get(&self, id: &str) -> Result<Option<HistoryItem>, StoreError> {
        Ok(self.list()?.into_iter().find(|item| item.id == id))
    }

    /// Prepend a new entry for a successful analysis, evicting the oldest
    /// beyond the limit.
    pub fn record(
        &self,
        result: &DetectionResult,
        request: &AnalysisRequest,
    ) -> Result<HistoryItem, StoreError> {
        let item = HistoryItem {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            result: result.clone(),
            input_snippet: make_snippet(request.text()),
            input_type: request.input_type(),
        };

        let limit = self.limit;
        let total = self.store.update(HISTORY_KEY, |items: &mut Option<Vec<HistoryItem>>| {
            let items = items.get_or_insert_with(Vec::new);
            items.insert(0, item.clone());
            items.truncate(limit);
            items.len()
        })?;

        info!("[HISTORY] recorded id={} total={}", item.id, total);
        Ok(item)
    }

    /// Returns whether an entry was removed.
    pub fn delete(&self, id: &str) -> Result<bool, StoreError> {
        self.store.update(HISTORY_KEY, |items: &mut Option<Vec<HistoryItem>>| {
            let Some(items) = items.as_mut() else {
                return false;
            };
            let before = items.len();
            items.retain(|item| item.id != id);
            items.len() != before
        })
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(HISTORY_KEY)?;
        info!("[HISTORY] cleared");
        Ok(())
    }
}
